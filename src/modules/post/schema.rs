use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "post_privacy", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostPrivacy {
    #[default]
    Public,
    Connections,
    Private,
}

impl PostPrivacy {
    /// Privacy levels a viewer may read, given how they relate to the author.
    pub fn readable(is_author: bool, connected: bool) -> &'static [PostPrivacy] {
        if is_author {
            &[PostPrivacy::Public, PostPrivacy::Connections, PostPrivacy::Private]
        } else if connected {
            &[PostPrivacy::Public, PostPrivacy::Connections]
        } else {
            &[PostPrivacy::Public]
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PostEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub media_urls: Vec<String>,
    pub privacy: PostPrivacy,
    pub likes_count: i32,
    pub comments_count: i32,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl PostEntity {
    pub fn visible_to(&self, viewer: Uuid, connected: bool) -> bool {
        PostPrivacy::readable(self.user_id == viewer, connected).contains(&self.privacy)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PostLikeEntity {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CommentEntity {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
