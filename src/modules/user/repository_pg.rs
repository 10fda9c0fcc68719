use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        connection::model::PaginationQuery,
        user::{
            model::{CandidateFilter, InsertUser, ProfileSearch, UpdateProfileModel},
            repository::UserRepository,
            schema::UserEntity,
        },
    },
    utils::fold_case,
};

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

/// Active users matching `$1` university, `$2` major (both `ILIKE` patterns,
/// NULL to skip) and any of the folded interests in `$3` (empty to skip).
const SEARCH_FILTER: &str = r#"
    WHERE u.is_active
      AND u.deleted_at IS NULL
      AND ($1::text IS NULL OR u.university ILIKE $1 ESCAPE '\')
      AND ($2::text IS NULL OR u.major ILIKE $2 ESCAPE '\')
      AND (
            cardinality($3::text[]) = 0
         OR EXISTS (SELECT 1 FROM unnest(u.interests) i WHERE lower(btrim(i)) = ANY($3))
      )
"#;

/// `%term%` with LIKE wildcards in `term` escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE id = $1 AND is_active AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE lower(username) = lower($1) AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE id = ANY($1) AND is_active AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, hash_password, full_name, university, major, interests)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hash_password)
        .bind(&user.full_name)
        .bind(&user.university)
        .bind(&user.major)
        .bind(&user.interests)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_profile(
        &self,
        id: &Uuid,
        profile: &UpdateProfileModel,
    ) -> Result<UserEntity, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            r#"
        UPDATE users
        SET
            full_name  = COALESCE($2, full_name),
            university = CASE WHEN $3::boolean THEN $4 ELSE university END,
            major      = CASE WHEN $5::boolean THEN $6 ELSE major END,
            interests  = COALESCE($7, interests),
            bio        = CASE WHEN $8::boolean THEN $9 ELSE bio END,
            avatar_url = CASE WHEN $10::boolean THEN $11 ELSE avatar_url END,
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING *
        "#,
        )
        .bind(id)
        .bind(&profile.full_name) // $2: Option<String>
        .bind(profile.university.is_some()) // $3: was university provided?
        .bind(profile.university.as_ref().and_then(|v| v.as_ref())) // $4
        .bind(profile.major.is_some()) // $5
        .bind(profile.major.as_ref().and_then(|v| v.as_ref())) // $6
        .bind(&profile.interests) // $7: Option<Vec<String>>
        .bind(profile.bio.is_some()) // $8
        .bind(profile.bio.as_ref().and_then(|v| v.as_ref())) // $9
        .bind(profile.avatar_url.is_some()) // $10
        .bind(profile.avatar_url.as_ref().and_then(|v| v.as_ref())) // $11
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        Ok(user)
    }

    async fn find_suggestion_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let interests: Vec<String> = filter.interests.iter().map(|i| fold_case(i)).collect();

        // only users sharing at least one scoring attribute can score above zero
        let users = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT * FROM users u
            WHERE u.is_active
              AND u.deleted_at IS NULL
              AND u.id <> ALL($1)
              AND (
                    u.id = ANY($2)
                 OR ($3::text IS NOT NULL AND lower(btrim(u.university)) = lower(btrim($3)))
                 OR ($4::text IS NOT NULL AND lower(btrim(u.major)) = lower(btrim($4)))
                 OR EXISTS (SELECT 1 FROM unnest(u.interests) i WHERE lower(btrim(i)) = ANY($5))
              )
            ORDER BY (u.id = ANY($2)) DESC, u.id
            LIMIT $6
            "#,
        )
        .bind(&filter.exclude_ids)
        .bind(&filter.mutual_ids)
        .bind(&filter.university)
        .bind(&filter.major)
        .bind(&interests)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn search(
        &self,
        search: &ProfileSearch,
        page: &PaginationQuery,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let sql = format!(
            "SELECT u.* FROM users u {} ORDER BY lower(u.username), u.id LIMIT $4 OFFSET $5",
            SEARCH_FILTER
        );
        let users = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(search.university.as_deref().map(contains_pattern))
            .bind(search.major.as_deref().map(contains_pattern))
            .bind(&search.interests)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn count_search(&self, search: &ProfileSearch) -> Result<i64, error::SystemError> {
        let sql = format!("SELECT COUNT(*) FROM users u {}", SEARCH_FILTER);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(search.university.as_deref().map(contains_pattern))
            .bind(search.major.as_deref().map(contains_pattern))
            .bind(&search.interests)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn deactivate(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM connections WHERE requester_id = $1 OR addressee_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }
}
