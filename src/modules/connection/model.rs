use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::DEFAULT_PAGE_LIMIT,
    modules::{
        connection::{
            schema::{ConnectionEntity, ConnectionStatus},
            suggestion::ScoredCandidate,
        },
        user::model::UserSummary,
    },
};

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: i64,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self { limit: DEFAULT_PAGE_LIMIT, offset: 0 }
    }
}

impl PaginationQuery {
    /// Applies the window to an in-memory list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset.max(0) as usize)
            .take(self.limit.max(0) as usize)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionResponse {
    pub id: Uuid,
    pub requester: UserSummary,
    pub addressee: UserSummary,
    pub status: ConnectionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub responded_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ConnectionResponse {
    pub fn new(entity: ConnectionEntity, requester: UserSummary, addressee: UserSummary) -> Self {
        ConnectionResponse {
            id: entity.id,
            requester,
            addressee,
            status: entity.status,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            responded_at: entity.responded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionListResponse {
    pub connections: Vec<ConnectionResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MutualConnectionResponse {
    pub mutual_connections: Vec<UserSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Edge state as seen from one side, `none` when no edge exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    None,
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl From<Option<ConnectionStatus>> for ConnectionState {
    fn from(status: Option<ConnectionStatus>) -> Self {
        match status {
            None => ConnectionState::None,
            Some(ConnectionStatus::Pending) => ConnectionState::Pending,
            Some(ConnectionStatus::Accepted) => ConnectionState::Accepted,
            Some(ConnectionStatus::Rejected) => ConnectionState::Rejected,
            Some(ConnectionStatus::Blocked) => ConnectionState::Blocked,
        }
    }
}

/// Whether the caller initiated the edge (`sent`) or is its target (`received`).
/// For a blocked edge the initiator is the blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatusResponse {
    pub user_id: Uuid,
    pub status: ConnectionState,
    pub connection_id: Option<Uuid>,
    pub direction: Option<Direction>,
    pub connected_since: Option<chrono::DateTime<chrono::Utc>>,
}

impl ConnectionStatusResponse {
    pub fn from_edge(caller: Uuid, other: Uuid, edge: Option<ConnectionEntity>) -> Self {
        let Some(edge) = edge else {
            return ConnectionStatusResponse {
                user_id: other,
                status: ConnectionState::None,
                connection_id: None,
                direction: None,
                connected_since: None,
            };
        };

        let direction =
            if edge.requester_id == caller { Direction::Sent } else { Direction::Received };
        let connected_since = match edge.status {
            ConnectionStatus::Accepted => edge.responded_at.or(Some(edge.created_at)),
            _ => None,
        };

        ConnectionStatusResponse {
            user_id: other,
            status: ConnectionState::from(Some(edge.status)),
            connection_id: Some(edge.id),
            direction: Some(direction),
            connected_since,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatsResponse {
    pub total_connections: i64,
    pub pending_received: i64,
    pub pending_sent: i64,
    pub blocked_users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResponse {
    pub user: UserSummary,
    pub mutual_connections_count: usize,
    pub common_university: bool,
    pub common_major: bool,
    pub common_interests: Vec<String>,
    pub suggestion_score: u32,
}

impl From<ScoredCandidate> for SuggestionResponse {
    fn from(scored: ScoredCandidate) -> Self {
        SuggestionResponse {
            user: UserSummary::from(scored.user),
            mutual_connections_count: scored.mutual_connections_count,
            common_university: scored.common_university,
            common_major: scored.common_major,
            common_interests: scored.common_interests,
            suggestion_score: scored.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionListResponse {
    pub suggestions: Vec<SuggestionResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
