use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::DEFAULT_PAGE_LIMIT,
    modules::{connection::model::PaginationQuery, user::schema::UserEntity},
    utils::{double_option, fold_case},
};

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Deserialize, Validate)]
pub struct SignUpModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(length(min = 1, message = "Full name cannot be empty"))]
    pub full_name: String,
    pub university: Option<String>,
    pub major: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50, message = "At most 50 interests are allowed"))]
    pub interests: Vec<String>,
}

#[derive(Deserialize, Validate)]
pub struct SignInModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateProfileModel {
    #[validate(length(min = 1, message = "Full name cannot be empty"))]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub university: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub major: Option<Option<String>>,
    #[validate(length(max = 50, message = "At most 50 interests are allowed"))]
    pub interests: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

impl UpdateProfileModel {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.university.is_none()
            && self.major.is_none()
            && self.interests.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
    }
}

pub struct InsertUser {
    pub username: String,
    pub email: String,
    pub hash_password: String,
    pub full_name: String,
    pub university: Option<String>,
    pub major: Option<String>,
    pub interests: Vec<String>,
}

/// Attributes a suggestion candidate must share with the caller, at least one of them.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub exclude_ids: Vec<Uuid>,
    pub mutual_ids: Vec<Uuid>,
    pub university: Option<String>,
    pub major: Option<String>,
    pub interests: Vec<String>,
    pub limit: i64,
}

/// Profile search filters; every given filter must match.
#[derive(Debug, Deserialize, Validate)]
pub struct SearchProfilesQuery {
    #[validate(length(max = 255, message = "University filter is too long"))]
    pub university: Option<String>,
    #[validate(length(max = 255, message = "Major filter is too long"))]
    pub major: Option<String>,
    /// Comma separated; a profile matches when it lists any of them.
    pub interests: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: i64,
}

impl SearchProfilesQuery {
    pub fn page(&self) -> PaginationQuery {
        PaginationQuery { limit: self.limit, offset: self.offset }
    }

    /// Blank filters are dropped, interests are split and case-folded.
    pub fn criteria(&self) -> ProfileSearch {
        let text = |v: &Option<String>| {
            v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
        };
        ProfileSearch {
            university: text(&self.university),
            major: text(&self.major),
            interests: self
                .interests
                .as_deref()
                .map(|list| list.split(',').map(fold_case).filter(|i| !i.is_empty()).collect())
                .unwrap_or_default(),
        }
    }
}

/// University and major are case-insensitive substring filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSearch {
    pub university: Option<String>,
    pub major: Option<String>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSearchResponse {
    pub users: Vec<UserSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub university: Option<String>,
    pub major: Option<String>,
    pub interests: Vec<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        UserResponse {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            full_name: entity.full_name,
            university: entity.university,
            major: entity.major,
            interests: entity.interests,
            bio: entity.bio,
            avatar_url: entity.avatar_url,
        }
    }
}

/// Public view of a user; never carries the email.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub university: Option<String>,
    pub major: Option<String>,
}

impl From<UserEntity> for UserSummary {
    fn from(user: UserEntity) -> Self {
        UserSummary {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            university: user.university,
            major: user.major,
        }
    }
}
