use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        connection::{
            model::PaginationQuery,
            repository::ConnectionRepository,
            schema::ConnectionStatus,
        },
        post::{
            model::{
                CommentListResponse, CommentResponse, CreateCommentModel, CreatePostModel,
                FeedResponse, InsertComment, InsertPost, LikeToggleResponse, PostLikeListResponse,
                PostLikeResponse, PostListResponse, PostResponse, UpdateCommentModel,
                UpdatePostModel,
            },
            repository::PostRepository,
            schema::{CommentEntity, PostEntity, PostPrivacy},
        },
        user::{model::UserSummary, repository::UserRepository, schema::UserEntity},
    },
};

/// Replies loaded under each top-level comment of a comment page.
const REPLIES_PER_COMMENT: i64 = 10;

/// How a viewer stands towards an author, as far as reading posts goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Author,
    Connected,
    Blocked,
    Stranger,
}

#[derive(Clone)]
pub struct PostService<P, C, U>
where
    P: PostRepository + Send + Sync,
    C: ConnectionRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    post_repo: Arc<P>,
    connection_repo: Arc<C>,
    user_repo: Arc<U>,
}

fn clean_content(content: &str) -> Result<String, error::SystemError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(error::SystemError::bad_request("Content cannot be blank"));
    }
    Ok(content.to_string())
}

fn clean_media_urls(urls: Vec<String>) -> Result<Vec<String>, error::SystemError> {
    urls.into_iter()
        .map(|url| {
            let url = url.trim();
            if url.is_empty() {
                Err(error::SystemError::bad_request("Media URL cannot be blank"))
            } else {
                Ok(url.to_string())
            }
        })
        .collect()
}

impl<P, C, U> PostService<P, C, U>
where
    P: PostRepository + Send + Sync,
    C: ConnectionRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(
        post_repo: Arc<P>,
        connection_repo: Arc<C>,
        user_repo: Arc<U>,
    ) -> Self {
        info!("PostService initialized with dependencies");
        PostService { post_repo, connection_repo, user_repo }
    }

    async fn require_user(&self, user_id: Uuid) -> Result<UserEntity, error::SystemError> {
        self.user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }

    async fn relation(&self, viewer: Uuid, author: Uuid) -> Result<Relation, error::SystemError> {
        if viewer == author {
            return Ok(Relation::Author);
        }
        let edge = self.connection_repo.find_between(&viewer, &author).await?;
        Ok(match edge.map(|e| e.status) {
            Some(ConnectionStatus::Accepted) => Relation::Connected,
            Some(ConnectionStatus::Blocked) => Relation::Blocked,
            _ => Relation::Stranger,
        })
    }

    /// The post if `viewer` may read it; hidden posts look missing.
    async fn load_visible(
        &self,
        viewer: Uuid,
        post_id: Uuid,
    ) -> Result<PostEntity, error::SystemError> {
        let post = self
            .post_repo
            .find_by_id(&post_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Post not found"))?;

        let visible = match self.relation(viewer, post.user_id).await? {
            Relation::Blocked => false,
            relation => post.visible_to(viewer, relation == Relation::Connected),
        };
        if !visible {
            debug!("Post {} hidden from {}", post_id, viewer);
            return Err(error::SystemError::not_found("Post not found"));
        }
        Ok(post)
    }

    async fn load_own(
        &self,
        caller: Uuid,
        post_id: Uuid,
    ) -> Result<PostEntity, error::SystemError> {
        let post = self
            .post_repo
            .find_by_id(&post_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Post not found"))?;
        if post.user_id != caller {
            return Err(error::SystemError::forbidden("You can only modify your own posts"));
        }
        Ok(post)
    }

    async fn load_own_comment(
        &self,
        caller: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentEntity, error::SystemError> {
        let comment = self
            .post_repo
            .find_comment(&comment_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Comment not found"))?;
        if comment.user_id != caller {
            return Err(error::SystemError::forbidden("You can only modify your own comments"));
        }
        Ok(comment)
    }

    async fn authors(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, UserSummary>, error::SystemError> {
        let ids: Vec<Uuid> = ids.into_iter().collect::<HashSet<_>>().into_iter().collect();
        Ok(self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect())
    }

    /// Attaches authors and the viewer's like flag, keeping post order.
    async fn hydrate(
        &self,
        viewer: Uuid,
        posts: Vec<PostEntity>,
    ) -> Result<Vec<PostResponse>, error::SystemError> {
        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let (authors, liked) = tokio::try_join!(
            self.authors(posts.iter().map(|p| p.user_id).collect()),
            self.post_repo.liked_post_ids(&viewer, &post_ids),
        )?;
        let liked: HashSet<Uuid> = liked.into_iter().collect();

        Ok(posts
            .into_iter()
            .filter_map(|p| match authors.get(&p.user_id) {
                Some(author) => {
                    let is_liked = liked.contains(&p.id);
                    Some(PostResponse::new(p, author.clone(), is_liked))
                }
                None => {
                    warn!("Post {} references an inactive user, skipped", p.id);
                    None
                }
            })
            .collect())
    }

    async fn hydrate_one(
        &self,
        viewer: Uuid,
        post: PostEntity,
    ) -> Result<PostResponse, error::SystemError> {
        self.hydrate(viewer, vec![post])
            .await?
            .pop()
            .ok_or_else(|| error::SystemError::not_found("Post not found"))
    }

    pub async fn create_post(
        &self,
        caller: Uuid,
        model: CreatePostModel,
    ) -> Result<PostResponse, error::SystemError> {
        let author = self.require_user(caller).await?;
        let insert = InsertPost {
            user_id: caller,
            content: clean_content(&model.content)?,
            media_urls: clean_media_urls(model.media_urls)?,
            privacy: model.privacy,
        };

        let post = self.post_repo.create(&insert).await?;
        info!("User {} created post {}", caller, post.id);
        Ok(PostResponse::new(post, UserSummary::from(author), false))
    }

    pub async fn get_post(
        &self,
        caller: Uuid,
        post_id: Uuid,
    ) -> Result<PostResponse, error::SystemError> {
        let post = self.load_visible(caller, post_id).await?;
        self.hydrate_one(caller, post).await
    }

    pub async fn update_post(
        &self,
        caller: Uuid,
        post_id: Uuid,
        mut changes: UpdatePostModel,
    ) -> Result<PostResponse, error::SystemError> {
        if changes.is_empty() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }
        changes.content = changes.content.as_deref().map(clean_content).transpose()?;
        changes.media_urls = changes.media_urls.map(clean_media_urls).transpose()?;

        self.load_own(caller, post_id).await?;
        let post = self
            .post_repo
            .update(&post_id, &changes)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Post not found"))?;
        self.hydrate_one(caller, post).await
    }

    pub async fn delete_post(&self, caller: Uuid, post_id: Uuid) -> Result<(), error::SystemError> {
        self.load_own(caller, post_id).await?;
        if !self.post_repo.soft_delete(&post_id).await? {
            return Err(error::SystemError::not_found("Post not found"));
        }
        info!("User {} deleted post {}", caller, post_id);
        Ok(())
    }

    /// Posts of one author, limited to what the caller may read.
    pub async fn user_posts(
        &self,
        caller: Uuid,
        author_id: Uuid,
        page: PaginationQuery,
    ) -> Result<PostListResponse, error::SystemError> {
        self.require_user(author_id).await?;

        let privacies: &[PostPrivacy] = match self.relation(caller, author_id).await? {
            Relation::Author => PostPrivacy::readable(true, false),
            Relation::Connected => PostPrivacy::readable(false, true),
            Relation::Stranger => PostPrivacy::readable(false, false),
            Relation::Blocked => &[],
        };

        let authors = [author_id];
        let (posts, total) = tokio::try_join!(
            self.post_repo.find_by_authors(&authors, privacies, &page),
            self.post_repo.count_by_authors(&authors, privacies),
        )?;

        Ok(PostListResponse {
            posts: self.hydrate(caller, posts).await?,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Newest posts from the caller and their accepted connections.
    pub async fn feed(
        &self,
        caller: Uuid,
        page: PaginationQuery,
    ) -> Result<FeedResponse, error::SystemError> {
        let mut authors = self.connection_repo.find_connected_ids(&caller).await?;
        authors.push(caller);
        let privacies = PostPrivacy::readable(false, true);

        let (posts, total) = tokio::try_join!(
            self.post_repo.find_by_authors(&authors, privacies, &page),
            self.post_repo.count_by_authors(&authors, privacies),
        )?;
        let has_more = page.offset + (posts.len() as i64) < total;

        Ok(FeedResponse {
            posts: self.hydrate(caller, posts).await?,
            total,
            limit: page.limit,
            offset: page.offset,
            has_more,
        })
    }

    pub async fn toggle_like(
        &self,
        caller: Uuid,
        post_id: Uuid,
    ) -> Result<LikeToggleResponse, error::SystemError> {
        self.load_visible(caller, post_id).await?;
        let (liked, likes_count) = self
            .post_repo
            .toggle_like(&post_id, &caller)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Post not found"))?;
        debug!("User {} set like on {} to {}", caller, post_id, liked);
        Ok(LikeToggleResponse { liked, likes_count })
    }

    pub async fn likes(
        &self,
        caller: Uuid,
        post_id: Uuid,
        page: PaginationQuery,
    ) -> Result<PostLikeListResponse, error::SystemError> {
        self.load_visible(caller, post_id).await?;

        let (likes, total) = tokio::try_join!(
            self.post_repo.find_likes(&post_id, &page),
            self.post_repo.count_likes(&post_id),
        )?;
        let users = self.authors(likes.iter().map(|l| l.user_id).collect()).await?;

        Ok(PostLikeListResponse {
            likes: likes
                .into_iter()
                .filter_map(|l| {
                    let user = users.get(&l.user_id)?.clone();
                    Some(PostLikeResponse { user, created_at: l.created_at })
                })
                .collect(),
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn add_comment(
        &self,
        caller: Uuid,
        post_id: Uuid,
        model: CreateCommentModel,
    ) -> Result<CommentResponse, error::SystemError> {
        let content = clean_content(&model.content)?;
        let author = self.require_user(caller).await?;
        self.load_visible(caller, post_id).await?;

        if let Some(parent_id) = model.parent_comment_id {
            let parent = self
                .post_repo
                .find_comment(&parent_id)
                .await?
                .filter(|c| c.post_id == post_id)
                .ok_or_else(|| {
                    error::SystemError::bad_request("Parent comment not found on this post")
                })?;
            if parent.parent_comment_id.is_some() {
                return Err(error::SystemError::bad_request("Replies cannot be nested"));
            }
        }

        let insert = InsertComment {
            post_id,
            user_id: caller,
            parent_comment_id: model.parent_comment_id,
            content,
        };
        let comment = self
            .post_repo
            .create_comment(&insert)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Post not found"))?;
        Ok(CommentResponse::new(comment, UserSummary::from(author)))
    }

    /// Top-level comments with their first replies nested under them.
    pub async fn comments(
        &self,
        caller: Uuid,
        post_id: Uuid,
        page: PaginationQuery,
    ) -> Result<CommentListResponse, error::SystemError> {
        self.load_visible(caller, post_id).await?;

        let (top, total) = tokio::try_join!(
            self.post_repo.find_comments(&post_id, &page),
            self.post_repo.count_comments(&post_id),
        )?;
        let parent_ids: Vec<Uuid> = top.iter().map(|c| c.id).collect();
        let replies = self.post_repo.find_replies(&parent_ids, REPLIES_PER_COMMENT).await?;

        let authors = self
            .authors(top.iter().chain(replies.iter()).map(|c| c.user_id).collect())
            .await?;
        let view = |c: CommentEntity| {
            let author = authors.get(&c.user_id)?.clone();
            Some(CommentResponse::new(c, author))
        };

        let mut nested: HashMap<Uuid, Vec<CommentResponse>> = HashMap::new();
        for reply in replies {
            if let Some(parent_id) = reply.parent_comment_id {
                if let Some(reply) = view(reply) {
                    nested.entry(parent_id).or_default().push(reply);
                }
            }
        }

        let comments = top
            .into_iter()
            .filter_map(view)
            .map(|mut c| {
                c.replies = nested.remove(&c.id).unwrap_or_default();
                c
            })
            .collect();

        Ok(CommentListResponse { comments, total, limit: page.limit, offset: page.offset })
    }

    pub async fn update_comment(
        &self,
        caller: Uuid,
        comment_id: Uuid,
        model: UpdateCommentModel,
    ) -> Result<CommentResponse, error::SystemError> {
        let content = clean_content(&model.content)?;
        self.load_own_comment(caller, comment_id).await?;
        let author = self.require_user(caller).await?;

        let comment = self
            .post_repo
            .update_comment(&comment_id, &content)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Comment not found"))?;
        Ok(CommentResponse::new(comment, UserSummary::from(author)))
    }

    pub async fn delete_comment(
        &self,
        caller: Uuid,
        comment_id: Uuid,
    ) -> Result<(), error::SystemError> {
        self.load_own_comment(caller, comment_id).await?;
        let removed = self.post_repo.delete_comment(&comment_id).await?;
        if removed == 0 {
            return Err(error::SystemError::not_found("Comment not found"));
        }
        info!("User {} deleted comment {} ({} removed)", caller, comment_id, removed);
        Ok(())
    }
}
