use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        connection::model::PaginationQuery,
        user::{
            model::{CandidateFilter, InsertUser, ProfileSearch, UpdateProfileModel},
            schema::UserEntity,
        },
    },
};

#[async_trait::async_trait]
pub trait UserRepository {
    /// Active, non-deleted user by id.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError>;

    /// Active users among `ids`, in no particular order.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError>;

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError>;

    async fn update_profile(
        &self,
        id: &Uuid,
        profile: &UpdateProfileModel,
    ) -> Result<UserEntity, error::SystemError>;

    async fn find_suggestion_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<UserEntity>, error::SystemError>;

    /// Active users matching every filter of `search`, ordered by username.
    async fn search(
        &self,
        search: &ProfileSearch,
        page: &PaginationQuery,
    ) -> Result<Vec<UserEntity>, error::SystemError>;

    async fn count_search(&self, search: &ProfileSearch) -> Result<i64, error::SystemError>;

    /// Soft-deletes the account and drops every connection it is part of.
    /// Returns `false` when the account was already gone.
    async fn deactivate(&self, id: &Uuid) -> Result<bool, error::SystemError>;
}
