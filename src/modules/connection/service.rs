use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        connection::{
            model::{
                ConnectionListResponse, ConnectionResponse, ConnectionStatsResponse,
                ConnectionStatusResponse, MutualConnectionResponse, PaginationQuery,
                SuggestionListResponse, SuggestionResponse, UserListResponse,
            },
            repository::{ConnectionRepository, Side},
            rules::{self, Action},
            schema::{ConnectionEntity, ConnectionStatus},
            suggestion::{self, SuggestionSettings},
        },
        user::{
            model::{CandidateFilter, UserSummary},
            repository::UserRepository,
            schema::UserEntity,
        },
    },
};

#[derive(Clone)]
pub struct ConnectionService<R, U>
where
    R: ConnectionRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    connection_repo: Arc<R>,
    user_repo: Arc<U>,
    settings: SuggestionSettings,
}

fn log_rejected<T>(
    op: &str,
    caller: Uuid,
    result: Result<T, error::SystemError>,
) -> Result<T, error::SystemError> {
    if let Err(e) = &result {
        debug!("{op} by {caller} rejected: {e}");
    }
    result
}

impl<R, U> ConnectionService<R, U>
where
    R: ConnectionRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(
        connection_repo: Arc<R>,
        user_repo: Arc<U>,
        settings: SuggestionSettings,
    ) -> Self {
        info!("ConnectionService initialized with dependencies");
        ConnectionService { connection_repo, user_repo, settings }
    }

    async fn require_user(&self, user_id: Uuid) -> Result<UserEntity, error::SystemError> {
        self.user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }

    /// Loads the users of every edge and builds the response views, keeping edge order.
    async fn hydrate(
        &self,
        connections: Vec<ConnectionEntity>,
    ) -> Result<Vec<ConnectionResponse>, error::SystemError> {
        let ids: Vec<Uuid> = connections
            .iter()
            .flat_map(|c| [c.requester_id, c.addressee_id])
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let users: HashMap<Uuid, UserSummary> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        Ok(connections
            .into_iter()
            .filter_map(|c| {
                match (users.get(&c.requester_id), users.get(&c.addressee_id)) {
                    (Some(requester), Some(addressee)) => {
                        let (requester, addressee) = (requester.clone(), addressee.clone());
                        Some(ConnectionResponse::new(c, requester, addressee))
                    }
                    _ => {
                        warn!("Connection {} references an inactive user, skipped", c.id);
                        None
                    }
                }
            })
            .collect())
    }

    async fn hydrate_one(
        &self,
        connection: Option<ConnectionEntity>,
    ) -> Result<ConnectionResponse, error::SystemError> {
        let connection = connection
            .ok_or_else(|| error::SystemError::not_found("Connection not found"))?;
        self.hydrate(vec![connection])
            .await?
            .pop()
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }

    /// Users in `ids` order; ids without an active user are dropped.
    async fn summaries(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, error::SystemError> {
        let mut users: HashMap<Uuid, UserEntity> =
            self.user_repo.find_by_ids(ids).await?.into_iter().map(|u| (u.id, u)).collect();

        Ok(ids.iter().filter_map(|id| users.remove(id)).map(UserSummary::from).collect())
    }

    pub async fn send_request(
        &self,
        caller: Uuid,
        target: Uuid,
    ) -> Result<ConnectionResponse, error::SystemError> {
        if caller == target {
            return Err(error::SystemError::bad_request(
                "Cannot send connection request to yourself",
            ));
        }
        self.require_user(target).await?;

        let decide = move |edge: Option<&ConnectionEntity>| {
            rules::decide(Action::Request { target }, caller, edge)
        };
        let created = log_rejected(
            "request",
            caller,
            self.connection_repo.transition_between(&caller, &target, &decide).await,
        )?;

        info!("User {} sent a connection request to {}", caller, target);
        self.hydrate_one(created).await
    }

    async fn respond(
        &self,
        caller: Uuid,
        connection_id: Uuid,
        action: Action,
    ) -> Result<ConnectionResponse, error::SystemError> {
        let decide = move |edge: Option<&ConnectionEntity>| rules::decide(action, caller, edge);
        let updated = log_rejected(
            "respond",
            caller,
            self.connection_repo.transition_by_id(&connection_id, &decide).await,
        )?;

        info!("User {} answered connection {} with {:?}", caller, connection_id, action);
        self.hydrate_one(updated).await
    }

    pub async fn accept(
        &self,
        caller: Uuid,
        connection_id: Uuid,
    ) -> Result<ConnectionResponse, error::SystemError> {
        self.respond(caller, connection_id, Action::Accept).await
    }

    pub async fn reject(
        &self,
        caller: Uuid,
        connection_id: Uuid,
    ) -> Result<ConnectionResponse, error::SystemError> {
        self.respond(caller, connection_id, Action::Reject).await
    }

    pub async fn cancel(&self, caller: Uuid, connection_id: Uuid) -> Result<(), error::SystemError> {
        let decide =
            move |edge: Option<&ConnectionEntity>| rules::decide(Action::Cancel, caller, edge);
        log_rejected(
            "cancel",
            caller,
            self.connection_repo.transition_by_id(&connection_id, &decide).await,
        )?;

        info!("User {} cancelled connection request {}", caller, connection_id);
        Ok(())
    }

    pub async fn remove(&self, caller: Uuid, target: Uuid) -> Result<(), error::SystemError> {
        let decide =
            move |edge: Option<&ConnectionEntity>| rules::decide(Action::Remove, caller, edge);
        log_rejected(
            "remove",
            caller,
            self.connection_repo.transition_between(&caller, &target, &decide).await,
        )?;

        info!("User {} removed connection with {}", caller, target);
        Ok(())
    }

    /// Blocks `target`; only the edge between the two users is affected.
    pub async fn block(
        &self,
        caller: Uuid,
        target: Uuid,
    ) -> Result<ConnectionResponse, error::SystemError> {
        if caller == target {
            return Err(error::SystemError::bad_request("Cannot block yourself"));
        }
        self.require_user(target).await?;

        let decide = move |edge: Option<&ConnectionEntity>| {
            rules::decide(Action::Block { target }, caller, edge)
        };
        let blocked = log_rejected(
            "block",
            caller,
            self.connection_repo.transition_between(&caller, &target, &decide).await,
        )?;

        info!("User {} blocked {}", caller, target);
        self.hydrate_one(blocked).await
    }

    pub async fn unblock(&self, caller: Uuid, target: Uuid) -> Result<(), error::SystemError> {
        let decide =
            move |edge: Option<&ConnectionEntity>| rules::decide(Action::Unblock, caller, edge);
        log_rejected(
            "unblock",
            caller,
            self.connection_repo.transition_between(&caller, &target, &decide).await,
        )?;

        info!("User {} unblocked {}", caller, target);
        Ok(())
    }

    pub async fn get_status(
        &self,
        caller: Uuid,
        other: Uuid,
    ) -> Result<ConnectionStatusResponse, error::SystemError> {
        let edge = if caller == other {
            None
        } else {
            self.connection_repo.find_between(&caller, &other).await?
        };
        Ok(ConnectionStatusResponse::from_edge(caller, other, edge))
    }

    async fn list(
        &self,
        user_id: Uuid,
        side: Side,
        status: ConnectionStatus,
        page: PaginationQuery,
    ) -> Result<ConnectionListResponse, error::SystemError> {
        let (connections, total) = tokio::try_join!(
            self.connection_repo.find_by_status(&user_id, side, status, &page),
            self.connection_repo.count_by_status(&user_id, side, status),
        )?;

        Ok(ConnectionListResponse {
            connections: self.hydrate(connections).await?,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn my_connections(
        &self,
        caller: Uuid,
        page: PaginationQuery,
    ) -> Result<ConnectionListResponse, error::SystemError> {
        self.list(caller, Side::Either, ConnectionStatus::Accepted, page).await
    }

    pub async fn pending_received(
        &self,
        caller: Uuid,
        page: PaginationQuery,
    ) -> Result<ConnectionListResponse, error::SystemError> {
        self.list(caller, Side::Addressee, ConnectionStatus::Pending, page).await
    }

    pub async fn pending_sent(
        &self,
        caller: Uuid,
        page: PaginationQuery,
    ) -> Result<ConnectionListResponse, error::SystemError> {
        self.list(caller, Side::Requester, ConnectionStatus::Pending, page).await
    }

    pub async fn public_connections(
        &self,
        user_id: Uuid,
        page: PaginationQuery,
    ) -> Result<UserListResponse, error::SystemError> {
        self.require_user(user_id).await?;

        let (connections, total) = tokio::try_join!(
            self.connection_repo.find_by_status(
                &user_id,
                Side::Either,
                ConnectionStatus::Accepted,
                &page
            ),
            self.connection_repo.count_by_status(&user_id, Side::Either, ConnectionStatus::Accepted),
        )?;

        let ids: Vec<Uuid> = connections.iter().filter_map(|c| c.other_party(user_id)).collect();

        Ok(UserListResponse {
            users: self.summaries(&ids).await?,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn mutual_connections(
        &self,
        caller: Uuid,
        other: Uuid,
        page: PaginationQuery,
    ) -> Result<MutualConnectionResponse, error::SystemError> {
        if caller == other {
            return Err(error::SystemError::bad_request(
                "Mutual connections require another user",
            ));
        }
        self.require_user(other).await?;

        let (mine, theirs) = tokio::try_join!(
            self.connection_repo.find_connected_ids(&caller),
            self.connection_repo.find_connected_ids(&other),
        )?;

        let mine: BTreeSet<Uuid> = mine.into_iter().collect();
        let theirs: BTreeSet<Uuid> = theirs.into_iter().collect();
        let mutual: Vec<Uuid> = mine.intersection(&theirs).copied().collect();
        let total = mutual.len() as i64;

        let window = page.slice(mutual);

        Ok(MutualConnectionResponse {
            mutual_connections: self.summaries(&window).await?,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn suggestions(
        &self,
        caller: Uuid,
        page: PaginationQuery,
    ) -> Result<SuggestionListResponse, error::SystemError> {
        let me = self.require_user(caller).await?;

        let (related, connected) = tokio::try_join!(
            self.connection_repo.find_related_ids(&caller),
            self.connection_repo.find_connected_ids(&caller),
        )?;

        let mut exclude: HashSet<Uuid> = related.into_iter().collect();
        exclude.insert(caller);

        let mutual_counts: HashMap<Uuid, usize> = self
            .connection_repo
            .count_connections_among(&connected)
            .await?
            .into_iter()
            .filter(|(id, _)| !exclude.contains(id))
            .map(|(id, count)| (id, count.max(0) as usize))
            .collect();

        let filter = CandidateFilter {
            exclude_ids: exclude.iter().copied().collect(),
            mutual_ids: mutual_counts.keys().copied().collect(),
            university: me.university.clone(),
            major: me.major.clone(),
            interests: me.interests.clone(),
            limit: self.settings.pool_size,
        };
        let candidates = self.user_repo.find_suggestion_candidates(&filter).await?;

        let ranked =
            suggestion::rank(&me, candidates, &mutual_counts, &exclude, &self.settings.weights);
        let total = ranked.len() as i64;
        debug!("Scored {} suggestion candidates for {}", total, caller);

        Ok(SuggestionListResponse {
            suggestions: page.slice(ranked).into_iter().map(SuggestionResponse::from).collect(),
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn stats(&self, caller: Uuid) -> Result<ConnectionStatsResponse, error::SystemError> {
        let repo = &self.connection_repo;
        let (total_connections, pending_received, pending_sent, blocked_users) = tokio::try_join!(
            repo.count_by_status(&caller, Side::Either, ConnectionStatus::Accepted),
            repo.count_by_status(&caller, Side::Addressee, ConnectionStatus::Pending),
            repo.count_by_status(&caller, Side::Requester, ConnectionStatus::Pending),
            repo.count_by_status(&caller, Side::Requester, ConnectionStatus::Blocked),
        )?;

        Ok(ConnectionStatsResponse {
            total_connections,
            pending_received,
            pending_sent,
            blocked_users,
        })
    }
}
