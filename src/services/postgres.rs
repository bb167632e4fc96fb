use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{Decision, PhotoId, SearchCriteria, UserId};
use crate::services::store::{CandidateStore, StoreError, StoreResult};

/// Stored `photo_id` for candidate-level decisions
const CANDIDATE_LEVEL: i64 = 0;

/// Database representation of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "decision", rename_all = "lowercase")]
pub enum DecisionKind {
    Liked,
    Unliked,
    Skipped,
}

impl From<Decision> for DecisionKind {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Liked => DecisionKind::Liked,
            Decision::Unliked => DecisionKind::Unliked,
            Decision::Skipped => DecisionKind::Skipped,
        }
    }
}

impl From<DecisionKind> for Decision {
    fn from(value: DecisionKind) -> Self {
        match value {
            DecisionKind::Liked => Decision::Liked,
            DecisionKind::Unliked => Decision::Unliked,
            DecisionKind::Skipped => Decision::Skipped,
        }
    }
}

fn photo_key(photo: Option<PhotoId>) -> i64 {
    photo.unwrap_or(CANDIDATE_LEVEL)
}

fn offset_to_db(offset: u32) -> StoreResult<i32> {
    i32::try_from(offset)
        .map_err(|_| StoreError::InvalidValue(format!("cursor offset {} out of range", offset)))
}

/// PostgreSQL candidate store
///
/// Every operation is a single statement keyed by requester, except
/// `reset_seen` which clears seen rows and cursors in one transaction.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run pending migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Connect using optional settings with defaults
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> StoreResult<Self> {
        tracing::info!("Connecting to PostgreSQL candidate store");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

#[async_trait]
impl CandidateStore for PostgresStore {
    async fn add_seen(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let query = r#"
            INSERT INTO seen_candidates (requester_id, candidate_id, inserted_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (requester_id, candidate_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Marked candidate {} as seen for requester {}", candidate, requester);

        Ok(result.rows_affected() > 0)
    }

    async fn is_seen(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM seen_candidates
                WHERE requester_id = $1 AND candidate_id = $2
            ) AS seen
        "#;

        let row = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("seen"))
    }

    async fn seen(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        let query = r#"
            SELECT candidate_id
            FROM seen_candidates
            WHERE requester_id = $1
            ORDER BY inserted_at, candidate_id
        "#;

        let rows = sqlx::query(query).bind(requester).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(|row| row.get("candidate_id")).collect())
    }

    async fn reset_seen(&self, requester: UserId) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        let cleared = sqlx::query("DELETE FROM seen_candidates WHERE requester_id = $1")
            .bind(requester)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM search_cursors WHERE requester_id = $1")
            .bind(requester)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Cleared {} seen candidates for requester {}", cleared, requester);

        Ok(cleared)
    }

    async fn get_cursor(&self, requester: UserId, criteria_hash: &str) -> StoreResult<u32> {
        let query = r#"
            SELECT cursor_offset
            FROM search_cursors
            WHERE requester_id = $1 AND criteria_hash = $2
        "#;

        let row = sqlx::query(query)
            .bind(requester)
            .bind(criteria_hash)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let offset: i32 = row.get("cursor_offset");
                u32::try_from(offset).map_err(|_| {
                    StoreError::InvalidValue(format!("negative cursor offset {}", offset))
                })
            }
            None => Ok(0),
        }
    }

    async fn set_cursor(
        &self,
        requester: UserId,
        criteria_hash: &str,
        offset: u32,
    ) -> StoreResult<()> {
        let query = r#"
            INSERT INTO search_cursors (requester_id, criteria_hash, cursor_offset, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (requester_id, criteria_hash)
            DO UPDATE SET
                cursor_offset = EXCLUDED.cursor_offset,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(requester)
            .bind(criteria_hash)
            .bind(offset_to_db(offset)?)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn record_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
        decision: Decision,
    ) -> StoreResult<()> {
        let query = r#"
            INSERT INTO decisions (requester_id, candidate_id, photo_id, decision, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (requester_id, candidate_id, photo_id)
            DO UPDATE SET
                decision = EXCLUDED.decision,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .bind(photo_key(photo))
            .bind(DecisionKind::from(decision))
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded decision: {} -> {} / {:?} ({:?})",
            requester,
            candidate,
            photo,
            decision
        );

        Ok(())
    }

    async fn get_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
    ) -> StoreResult<Option<Decision>> {
        let query = r#"
            SELECT decision
            FROM decisions
            WHERE requester_id = $1 AND candidate_id = $2 AND photo_id = $3
        "#;

        let row = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .bind(photo_key(photo))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<DecisionKind, _>("decision").into()))
    }

    async fn clear_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
    ) -> StoreResult<bool> {
        let query = r#"
            DELETE FROM decisions
            WHERE requester_id = $1 AND candidate_id = $2 AND photo_id = $3
        "#;

        let result = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .bind(photo_key(photo))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn candidate_decisions(
        &self,
        requester: UserId,
        candidate: UserId,
    ) -> StoreResult<Vec<Decision>> {
        let query = r#"
            SELECT decision
            FROM decisions
            WHERE requester_id = $1 AND candidate_id = $2
        "#;

        let rows = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| row.get::<DecisionKind, _>("decision").into())
            .collect())
    }

    async fn liked_candidates(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        let query = r#"
            SELECT DISTINCT candidate_id
            FROM decisions
            WHERE requester_id = $1 AND decision = 'liked'
            ORDER BY candidate_id
        "#;

        let rows = sqlx::query(query).bind(requester).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(|row| row.get("candidate_id")).collect())
    }

    async fn block(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let query = r#"
            INSERT INTO blocked_candidates (requester_id, candidate_id, blocked_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (requester_id, candidate_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_blocked(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM blocked_candidates
                WHERE requester_id = $1 AND candidate_id = $2
            ) AS blocked
        "#;

        let row = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("blocked"))
    }

    async fn unblock(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let query = r#"
            DELETE FROM blocked_candidates
            WHERE requester_id = $1 AND candidate_id = $2
        "#;

        let result = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn blocked(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        let query = r#"
            SELECT candidate_id
            FROM blocked_candidates
            WHERE requester_id = $1
            ORDER BY candidate_id
        "#;

        let rows = sqlx::query(query).bind(requester).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(|row| row.get("candidate_id")).collect())
    }

    async fn add_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let query = r#"
            INSERT INTO favorite_candidates (requester_id, candidate_id, added_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (requester_id, candidate_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let query = r#"
            DELETE FROM favorite_candidates
            WHERE requester_id = $1 AND candidate_id = $2
        "#;

        let result = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM favorite_candidates
                WHERE requester_id = $1 AND candidate_id = $2
            ) AS favorite
        "#;

        let row = sqlx::query(query)
            .bind(requester)
            .bind(candidate)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("favorite"))
    }

    async fn favorites(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        let query = r#"
            SELECT candidate_id
            FROM favorite_candidates
            WHERE requester_id = $1
            ORDER BY added_at, candidate_id
        "#;

        let rows = sqlx::query(query).bind(requester).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(|row| row.get("candidate_id")).collect())
    }

    async fn set_preferences(
        &self,
        requester: UserId,
        criteria: &SearchCriteria,
    ) -> StoreResult<()> {
        let query = r#"
            INSERT INTO search_preferences (requester_id, criteria, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (requester_id)
            DO UPDATE SET
                criteria = EXCLUDED.criteria,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(requester)
            .bind(Json(criteria.clone()))
            .execute(&self.pool)
            .await?;

        tracing::debug!("Saved preferences for requester {}: {}", requester, criteria.fingerprint());

        Ok(())
    }

    async fn get_preferences(&self, requester: UserId) -> StoreResult<Option<SearchCriteria>> {
        let query = r#"
            SELECT criteria
            FROM search_preferences
            WHERE requester_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(requester)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<Json<SearchCriteria>, _>("criteria").0))
    }

    async fn health_check(&self) -> StoreResult<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
