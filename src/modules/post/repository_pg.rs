use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        connection::model::PaginationQuery,
        post::{
            model::{InsertComment, InsertPost, UpdatePostModel},
            repository::PostRepository,
            schema::{CommentEntity, PostEntity, PostLikeEntity, PostPrivacy},
        },
    },
};

#[derive(Clone)]
pub struct PostRepositoryPg {
    pool: sqlx::PgPool,
}

impl PostRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

/// Restricts `p` to live posts written by active users.
const LIVE_POST: &str = r#"
    JOIN users u ON u.id = p.user_id AND u.is_active AND u.deleted_at IS NULL
"#;

#[async_trait::async_trait]
impl PostRepository for PostRepositoryPg {
    async fn create(&self, post: &InsertPost) -> Result<PostEntity, error::SystemError> {
        let created = sqlx::query_as::<_, PostEntity>(
            r#"
            INSERT INTO posts (id, user_id, content, media_urls, privacy)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
        .bind(post.user_id)
        .bind(&post.content)
        .bind(&post.media_urls)
        .bind(post.privacy)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<PostEntity>, error::SystemError> {
        let sql = format!(
            "SELECT p.* FROM posts p {} WHERE p.id = $1 AND p.deleted_at IS NULL",
            LIVE_POST
        );
        let post = sqlx::query_as::<_, PostEntity>(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(post)
    }

    async fn update(
        &self,
        id: &Uuid,
        changes: &UpdatePostModel,
    ) -> Result<Option<PostEntity>, error::SystemError> {
        let post = sqlx::query_as::<_, PostEntity>(
            r#"
            UPDATE posts
            SET
                content    = COALESCE($2, content),
                media_urls = COALESCE($3, media_urls),
                privacy    = COALESCE($4, privacy),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.content)
        .bind(&changes.media_urls)
        .bind(changes.privacy)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_authors(
        &self,
        author_ids: &[Uuid],
        privacies: &[PostPrivacy],
        page: &PaginationQuery,
    ) -> Result<Vec<PostEntity>, error::SystemError> {
        if author_ids.is_empty() || privacies.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT p.*
            FROM posts p
            {}
            WHERE p.user_id = ANY($1)
              AND p.privacy = ANY($2)
              AND p.deleted_at IS NULL
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $3 OFFSET $4
            "#,
            LIVE_POST
        );
        let posts = sqlx::query_as::<_, PostEntity>(&sql)
            .bind(author_ids)
            .bind(privacies)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn count_by_authors(
        &self,
        author_ids: &[Uuid],
        privacies: &[PostPrivacy],
    ) -> Result<i64, error::SystemError> {
        if author_ids.is_empty() || privacies.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            r#"
            SELECT COUNT(*)
            FROM posts p
            {}
            WHERE p.user_id = ANY($1)
              AND p.privacy = ANY($2)
              AND p.deleted_at IS NULL
            "#,
            LIVE_POST
        );
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(author_ids)
            .bind(privacies)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn toggle_like(
        &self,
        post_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<(bool, i32)>, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM posts WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let liked = removed == 0;
        if liked {
            sqlx::query("INSERT INTO post_likes (id, post_id, user_id) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let likes_count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE posts
            SET likes_count = GREATEST(likes_count + $2, 0)
            WHERE id = $1
            RETURNING likes_count
            "#,
        )
        .bind(post_id)
        .bind(if liked { 1 } else { -1 })
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some((liked, likes_count)))
    }

    async fn liked_post_ids(
        &self,
        user_id: &Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, error::SystemError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT post_id FROM post_likes WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn find_likes(
        &self,
        post_id: &Uuid,
        page: &PaginationQuery,
    ) -> Result<Vec<PostLikeEntity>, error::SystemError> {
        let likes = sqlx::query_as::<_, PostLikeEntity>(
            r#"
            SELECT l.*
            FROM post_likes l
            JOIN users u ON u.id = l.user_id AND u.is_active AND u.deleted_at IS NULL
            WHERE l.post_id = $1
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(likes)
    }

    async fn count_likes(&self, post_id: &Uuid) -> Result<i64, error::SystemError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM post_likes l
            JOIN users u ON u.id = l.user_id AND u.is_active AND u.deleted_at IS NULL
            WHERE l.post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn create_comment(
        &self,
        comment: &InsertComment,
    ) -> Result<Option<CommentEntity>, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM posts WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(comment.post_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let created = sqlx::query_as::<_, CommentEntity>(
            r#"
            INSERT INTO post_comments (id, post_id, user_id, parent_comment_id, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.parent_comment_id)
        .bind(&comment.content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(comment.post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(created))
    }

    async fn find_comment(&self, id: &Uuid) -> Result<Option<CommentEntity>, error::SystemError> {
        let comment = sqlx::query_as::<_, CommentEntity>(
            r#"
            SELECT c.*
            FROM post_comments c
            JOIN users u ON u.id = c.user_id AND u.is_active AND u.deleted_at IS NULL
            WHERE c.id = $1 AND c.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_comment(
        &self,
        id: &Uuid,
        content: &str,
    ) -> Result<Option<CommentEntity>, error::SystemError> {
        let comment = sqlx::query_as::<_, CommentEntity>(
            r#"
            UPDATE post_comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: &Uuid) -> Result<i64, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let post_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE post_comments
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE deleted_at IS NULL AND (id = $1 OR parent_comment_id = $1)
            RETURNING post_id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let removed = post_ids.len() as i64;
        if let Some(post_id) = post_ids.first() {
            sqlx::query(
                r#"
                UPDATE posts
                SET comments_count = GREATEST(comments_count - $2, 0)
                WHERE id = $1
                "#,
            )
            .bind(post_id)
            .bind(removed as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(removed)
    }

    async fn find_comments(
        &self,
        post_id: &Uuid,
        page: &PaginationQuery,
    ) -> Result<Vec<CommentEntity>, error::SystemError> {
        let comments = sqlx::query_as::<_, CommentEntity>(
            r#"
            SELECT c.*
            FROM post_comments c
            JOIN users u ON u.id = c.user_id AND u.is_active AND u.deleted_at IS NULL
            WHERE c.post_id = $1
              AND c.parent_comment_id IS NULL
              AND c.deleted_at IS NULL
            ORDER BY c.created_at, c.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn count_comments(&self, post_id: &Uuid) -> Result<i64, error::SystemError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM post_comments c
            JOIN users u ON u.id = c.user_id AND u.is_active AND u.deleted_at IS NULL
            WHERE c.post_id = $1
              AND c.parent_comment_id IS NULL
              AND c.deleted_at IS NULL
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_replies(
        &self,
        parent_ids: &[Uuid],
        per_parent: i64,
    ) -> Result<Vec<CommentEntity>, error::SystemError> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let replies = sqlx::query_as::<_, CommentEntity>(
            r#"
            SELECT id, post_id, user_id, parent_comment_id, content, deleted_at, created_at, updated_at
            FROM (
                SELECT c.*,
                       ROW_NUMBER() OVER (
                           PARTITION BY c.parent_comment_id ORDER BY c.created_at, c.id
                       ) AS rn
                FROM post_comments c
                JOIN users u ON u.id = c.user_id AND u.is_active AND u.deleted_at IS NULL
                WHERE c.parent_comment_id = ANY($1) AND c.deleted_at IS NULL
            ) ranked
            WHERE rn <= $2
            ORDER BY created_at, id
            "#,
        )
        .bind(parent_ids)
        .bind(per_parent)
        .fetch_all(&self.pool)
        .await?;
        Ok(replies)
    }
}
