use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    api::error,
    modules::connection::{
        model::PaginationQuery,
        repository::{ConnectionRepository, Decide, Side},
        rules::Transition,
        schema::{ConnectionEntity, ConnectionStatus},
    },
};

#[derive(Clone)]
pub struct ConnectionRepositoryPg {
    pool: sqlx::PgPool,
}

impl ConnectionRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

/// Keeps only edges whose other party (relative to `$1`) is an active user.
const VISIBLE_OTHER_PARTY: &str = r#"
    JOIN users u
      ON u.id = CASE WHEN c.requester_id = $1 THEN c.addressee_id ELSE c.requester_id END
     AND u.is_active
     AND u.deleted_at IS NULL
"#;

fn side_filter(side: Side) -> &'static str {
    match side {
        Side::Either => "(c.requester_id = $1 OR c.addressee_id = $1)",
        Side::Requester => "c.requester_id = $1",
        Side::Addressee => "c.addressee_id = $1",
    }
}

async fn decide_and_apply(
    mut tx: Transaction<'_, Postgres>,
    existing: Option<ConnectionEntity>,
    decide: &Decide,
) -> Result<Option<ConnectionEntity>, error::SystemError> {
    let transition = match decide(existing.as_ref()) {
        Ok(t) => t,
        Err(e) => {
            tx.rollback().await?;
            return Err(e);
        }
    };

    let now = Utc::now();

    let after = match transition {
        Transition::Insert { requester_id, addressee_id, status } => {
            let responded_at = (status != ConnectionStatus::Pending).then_some(now);
            let created = sqlx::query_as::<_, ConnectionEntity>(
                r#"
                INSERT INTO connections
                    (id, requester_id, addressee_id, status, created_at, updated_at, responded_at)
                VALUES ($1, $2, $3, $4, $5, $5, $6)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
            .bind(requester_id)
            .bind(addressee_id)
            .bind(status)
            .bind(now)
            .bind(responded_at)
            .fetch_one(&mut *tx)
            .await?;
            Some(created)
        }
        Transition::Update { id, requester_id, addressee_id, status } => {
            let responded_at = (status != ConnectionStatus::Pending).then_some(now);
            let updated = sqlx::query_as::<_, ConnectionEntity>(
                r#"
                UPDATE connections
                SET requester_id = $2,
                    addressee_id = $3,
                    status       = $4,
                    updated_at   = $5,
                    responded_at = $6
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(requester_id)
            .bind(addressee_id)
            .bind(status)
            .bind(now)
            .bind(responded_at)
            .fetch_one(&mut *tx)
            .await?;
            Some(updated)
        }
        Transition::Delete { id } => {
            sqlx::query("DELETE FROM connections WHERE id = $1").bind(id).execute(&mut *tx).await?;
            None
        }
        Transition::Keep(edge) => Some(edge),
    };

    tx.commit().await?;

    Ok(after)
}

#[async_trait::async_trait]
impl ConnectionRepository for ConnectionRepositoryPg {
    async fn find_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let connection = sqlx::query_as::<_, ConnectionEntity>(
            r#"
            SELECT *
            FROM connections
            WHERE
                (requester_id = $1 AND addressee_id = $2)
            OR (requester_id = $2 AND addressee_id = $1)
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(connection)
    }

    async fn find_by_status(
        &self,
        user_id: &Uuid,
        side: Side,
        status: ConnectionStatus,
        page: &PaginationQuery,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError> {
        let sql = format!(
            r#"
            SELECT c.*
            FROM connections c
            {}
            WHERE {} AND c.status = $2
            ORDER BY c.updated_at DESC, c.id DESC
            LIMIT $3 OFFSET $4
            "#,
            VISIBLE_OTHER_PARTY,
            side_filter(side)
        );

        let connections = sqlx::query_as::<_, ConnectionEntity>(&sql)
            .bind(user_id)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(connections)
    }

    async fn count_by_status(
        &self,
        user_id: &Uuid,
        side: Side,
        status: ConnectionStatus,
    ) -> Result<i64, error::SystemError> {
        let sql = format!(
            "SELECT COUNT(*) FROM connections c {} WHERE {} AND c.status = $2",
            VISIBLE_OTHER_PARTY,
            side_filter(side)
        );

        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(user_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn find_connected_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        let sql = format!(
            r#"
            SELECT u.id
            FROM connections c
            {}
            WHERE (c.requester_id = $1 OR c.addressee_id = $1) AND c.status = $2
            "#,
            VISIBLE_OTHER_PARTY
        );

        let ids = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(user_id)
            .bind(ConnectionStatus::Accepted)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn find_related_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT CASE WHEN requester_id = $1 THEN addressee_id ELSE requester_id END
            FROM connections
            WHERE requester_id = $1 OR addressee_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn count_connections_among(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, i64)>, error::SystemError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let counts = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT other_id, COUNT(*)
            FROM (
                SELECT requester_id AS other_id FROM connections
                WHERE status = $2 AND addressee_id = ANY($1)
                UNION ALL
                SELECT addressee_id AS other_id FROM connections
                WHERE status = $2 AND requester_id = ANY($1)
            ) edges
            GROUP BY other_id
            "#,
        )
        .bind(user_ids)
        .bind(ConnectionStatus::Accepted)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn transition_by_id(
        &self,
        id: &Uuid,
        decide: &Decide,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, ConnectionEntity>(
            "SELECT * FROM connections WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        decide_and_apply(tx, existing, decide).await
    }

    async fn transition_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        decide: &Decide,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        // matches the unordered-pair unique index
        let existing = sqlx::query_as::<_, ConnectionEntity>(
            r#"
            SELECT *
            FROM connections
            WHERE LEAST(requester_id, addressee_id) = LEAST($1::uuid, $2::uuid)
              AND GREATEST(requester_id, addressee_id) = GREATEST($1::uuid, $2::uuid)
            FOR UPDATE
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .fetch_optional(&mut *tx)
        .await?;

        decide_and_apply(tx, existing, decide).await
    }
}
