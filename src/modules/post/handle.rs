use actix_web::{delete, get, post, put, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        connection::{model::PaginationQuery, repository_pg::ConnectionRepositoryPg},
        post::{
            model::{
                CommentListResponse, CommentResponse, CreateCommentModel, CreatePostModel,
                FeedResponse, LikeToggleResponse, PostLikeListResponse, PostListResponse,
                PostResponse, UpdateCommentModel, UpdatePostModel,
            },
            repository_pg::PostRepositoryPg,
            service::PostService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub type PostSvc = PostService<PostRepositoryPg, ConnectionRepositoryPg, UserRepositoryPg>;

#[post("")]
pub async fn create_post(
    post_service: web::Data<PostSvc>,
    body: ValidatedJson<CreatePostModel>,
    req: HttpRequest,
) -> Result<success::Success<PostResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let post = post_service.create_post(caller, body.0).await?;
    Ok(success::Success::created(post).message("Post created successfully"))
}

#[get("/feed")]
pub async fn feed(
    post_service: web::Data<PostSvc>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<FeedResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let feed = post_service.feed(caller, page.0).await?;
    Ok(success::Success::ok(feed).message("Feed retrieved successfully"))
}

#[get("/user/{user_id}")]
pub async fn user_posts(
    post_service: web::Data<PostSvc>,
    user_id: web::Path<Uuid>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<PostListResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let posts = post_service.user_posts(caller, *user_id, page.0).await?;
    Ok(success::Success::ok(posts).message("Posts retrieved successfully"))
}

#[put("/comments/{comment_id}")]
pub async fn update_comment(
    post_service: web::Data<PostSvc>,
    comment_id: web::Path<Uuid>,
    body: ValidatedJson<UpdateCommentModel>,
    req: HttpRequest,
) -> Result<success::Success<CommentResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let comment = post_service.update_comment(caller, *comment_id, body.0).await?;
    Ok(success::Success::ok(comment).message("Comment updated successfully"))
}

#[delete("/comments/{comment_id}")]
pub async fn delete_comment(
    post_service: web::Data<PostSvc>,
    comment_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let caller = get_claims(&req)?.sub;
    post_service.delete_comment(caller, *comment_id).await?;
    Ok(success::Success::no_content())
}

#[get("/{post_id}")]
pub async fn get_post(
    post_service: web::Data<PostSvc>,
    post_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<PostResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let post = post_service.get_post(caller, *post_id).await?;
    Ok(success::Success::ok(post))
}

#[put("/{post_id}")]
pub async fn update_post(
    post_service: web::Data<PostSvc>,
    post_id: web::Path<Uuid>,
    body: ValidatedJson<UpdatePostModel>,
    req: HttpRequest,
) -> Result<success::Success<PostResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let post = post_service.update_post(caller, *post_id, body.0).await?;
    Ok(success::Success::ok(post).message("Post updated successfully"))
}

#[delete("/{post_id}")]
pub async fn delete_post(
    post_service: web::Data<PostSvc>,
    post_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let caller = get_claims(&req)?.sub;
    post_service.delete_post(caller, *post_id).await?;
    Ok(success::Success::no_content())
}

#[post("/{post_id}/like")]
pub async fn toggle_like(
    post_service: web::Data<PostSvc>,
    post_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<LikeToggleResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let like = post_service.toggle_like(caller, *post_id).await?;
    let message = if like.liked { "Post liked" } else { "Post unliked" };
    Ok(success::Success::ok(like).message(message))
}

#[get("/{post_id}/likes")]
pub async fn post_likes(
    post_service: web::Data<PostSvc>,
    post_id: web::Path<Uuid>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<PostLikeListResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let likes = post_service.likes(caller, *post_id, page.0).await?;
    Ok(success::Success::ok(likes))
}

#[post("/{post_id}/comments")]
pub async fn add_comment(
    post_service: web::Data<PostSvc>,
    post_id: web::Path<Uuid>,
    body: ValidatedJson<CreateCommentModel>,
    req: HttpRequest,
) -> Result<success::Success<CommentResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let comment = post_service.add_comment(caller, *post_id, body.0).await?;
    Ok(success::Success::created(comment).message("Comment added successfully"))
}

#[get("/{post_id}/comments")]
pub async fn post_comments(
    post_service: web::Data<PostSvc>,
    post_id: web::Path<Uuid>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<CommentListResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let comments = post_service.comments(caller, *post_id, page.0).await?;
    Ok(success::Success::ok(comments))
}
