use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        connection::model::PaginationQuery,
        post::{
            model::{InsertComment, InsertPost, UpdatePostModel},
            schema::{CommentEntity, PostEntity, PostLikeEntity, PostPrivacy},
        },
    },
};

/// Posts and comments are soft-deleted; every lookup here ignores deleted rows
/// and content whose author is no longer an active user.
#[async_trait::async_trait]
pub trait PostRepository {
    async fn create(&self, post: &InsertPost) -> Result<PostEntity, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<PostEntity>, error::SystemError>;

    /// Applies the provided fields; `None` when the post is gone.
    async fn update(
        &self,
        id: &Uuid,
        changes: &UpdatePostModel,
    ) -> Result<Option<PostEntity>, error::SystemError>;

    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError>;

    /// Posts of any of `author_ids` with one of `privacies`, newest first.
    async fn find_by_authors(
        &self,
        author_ids: &[Uuid],
        privacies: &[PostPrivacy],
        page: &PaginationQuery,
    ) -> Result<Vec<PostEntity>, error::SystemError>;

    async fn count_by_authors(
        &self,
        author_ids: &[Uuid],
        privacies: &[PostPrivacy],
    ) -> Result<i64, error::SystemError>;

    /// Likes the post for `user_id`, or removes the like if it exists.
    /// Returns whether the post is now liked and its like count, `None` when
    /// the post is gone.
    async fn toggle_like(
        &self,
        post_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<(bool, i32)>, error::SystemError>;

    /// Which of `post_ids` `user_id` has liked.
    async fn liked_post_ids(
        &self,
        user_id: &Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, error::SystemError>;

    /// Newest first.
    async fn find_likes(
        &self,
        post_id: &Uuid,
        page: &PaginationQuery,
    ) -> Result<Vec<PostLikeEntity>, error::SystemError>;

    async fn count_likes(&self, post_id: &Uuid) -> Result<i64, error::SystemError>;

    /// Inserts the comment and bumps the post's counter atomically; `None`
    /// when the post is gone.
    async fn create_comment(
        &self,
        comment: &InsertComment,
    ) -> Result<Option<CommentEntity>, error::SystemError>;

    async fn find_comment(&self, id: &Uuid) -> Result<Option<CommentEntity>, error::SystemError>;

    async fn update_comment(
        &self,
        id: &Uuid,
        content: &str,
    ) -> Result<Option<CommentEntity>, error::SystemError>;

    /// Removes the comment together with its replies and lowers the post's
    /// counter by the number removed. Returns that number.
    async fn delete_comment(&self, id: &Uuid) -> Result<i64, error::SystemError>;

    /// Top-level comments, oldest first.
    async fn find_comments(
        &self,
        post_id: &Uuid,
        page: &PaginationQuery,
    ) -> Result<Vec<CommentEntity>, error::SystemError>;

    async fn count_comments(&self, post_id: &Uuid) -> Result<i64, error::SystemError>;

    /// Replies to any of `parent_ids`, oldest first, at most `per_parent` each.
    async fn find_replies(
        &self,
        parent_ids: &[Uuid],
        per_parent: i64,
    ) -> Result<Vec<CommentEntity>, error::SystemError>;
}
