use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::{
    post::schema::{CommentEntity, PostEntity, PostPrivacy},
    user::model::UserSummary,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostModel {
    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: String,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 media URLs are allowed"))]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub privacy: PostPrivacy,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostModel {
    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: Option<String>,
    #[validate(length(max = 10, message = "At most 10 media URLs are allowed"))]
    pub media_urls: Option<Vec<String>>,
    pub privacy: Option<PostPrivacy>,
}

impl UpdatePostModel {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.media_urls.is_none() && self.privacy.is_none()
    }
}

pub struct InsertPost {
    pub user_id: Uuid,
    pub content: String,
    pub media_urls: Vec<String>,
    pub privacy: PostPrivacy,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentModel {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentModel {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub content: String,
}

pub struct InsertComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub media_urls: Vec<String>,
    pub privacy: PostPrivacy,
    pub likes_count: i32,
    pub comments_count: i32,
    pub is_liked: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl PostResponse {
    pub fn new(post: PostEntity, author: UserSummary, is_liked: bool) -> Self {
        PostResponse {
            id: post.id,
            author,
            content: post.content,
            media_urls: post.media_urls,
            privacy: post.privacy,
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            is_liked,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedResponse {
    pub posts: Vec<PostResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggleResponse {
    pub liked: bool,
    pub likes_count: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostLikeResponse {
    pub user: UserSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostLikeListResponse {
    pub likes: Vec<PostLikeResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
    pub replies: Vec<CommentResponse>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl CommentResponse {
    pub fn new(comment: CommentEntity, author: UserSummary) -> Self {
        CommentResponse {
            id: comment.id,
            post_id: comment.post_id,
            author,
            content: comment.content,
            parent_comment_id: comment.parent_comment_id,
            replies: Vec::new(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
