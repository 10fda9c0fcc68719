use uuid::Uuid;

use crate::{
    api::error,
    modules::connection::{
        model::PaginationQuery,
        rules::Transition,
        schema::{ConnectionEntity, ConnectionStatus},
    },
};

/// Decides the write for the edge read under lock (`None` when no edge exists).
pub type Decide =
    dyn for<'e> Fn(Option<&'e ConnectionEntity>) -> Result<Transition, error::SystemError>
        + Send
        + Sync;

/// Which end of an edge the user must occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Either,
    Requester,
    Addressee,
}

#[async_trait::async_trait]
pub trait ConnectionRepository {
    /// The edge between two users regardless of direction.
    async fn find_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError>;

    /// Newest `updated_at` first. Edges whose other party is no longer an
    /// active user are skipped, here and in the count.
    async fn find_by_status(
        &self,
        user_id: &Uuid,
        side: Side,
        status: ConnectionStatus,
        page: &PaginationQuery,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError>;

    async fn count_by_status(
        &self,
        user_id: &Uuid,
        side: Side,
        status: ConnectionStatus,
    ) -> Result<i64, error::SystemError>;

    /// Ids of active users with an accepted edge to `user_id`.
    async fn find_connected_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError>;

    /// Ids of users with an edge of any status to `user_id`.
    async fn find_related_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError>;

    /// For every user accepted-connected to at least one of `user_ids`, how many of
    /// `user_ids` they are connected to.
    async fn count_connections_among(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, i64)>, error::SystemError>;

    /// Locks the edge `id`, decides and applies the transition atomically.
    /// Returns the edge after the write, `None` when it was deleted.
    async fn transition_by_id(
        &self,
        id: &Uuid,
        decide: &Decide,
    ) -> Result<Option<ConnectionEntity>, error::SystemError>;

    /// Same as [`ConnectionRepository::transition_by_id`] for the edge between two users.
    async fn transition_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        decide: &Decide,
    ) -> Result<Option<ConnectionEntity>, error::SystemError>;
}
