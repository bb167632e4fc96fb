use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Decision, PhotoId, SearchCriteria, UserId};

/// Errors raised by candidate store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable per-requester discovery state
///
/// Every operation is atomic for its requester. Requesters are independent
/// partitions; no operation touches more than one of them.
///
/// `photo = None` addresses the candidate as a whole (skips). Blocks,
/// favourites, decisions and preferences survive `reset_seen`.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Insert into the seen set; returns `false` when it was already present
    async fn add_seen(&self, requester: UserId, candidate: UserId) -> StoreResult<bool>;

    async fn is_seen(&self, requester: UserId, candidate: UserId) -> StoreResult<bool>;

    /// Seen candidates in insertion order
    async fn seen(&self, requester: UserId) -> StoreResult<Vec<UserId>>;

    /// Clear the seen set and every search cursor of the requester
    async fn reset_seen(&self, requester: UserId) -> StoreResult<u64>;

    /// Cursor for a criteria hash; 0 when none is stored
    async fn get_cursor(&self, requester: UserId, criteria_hash: &str) -> StoreResult<u32>;

    async fn set_cursor(&self, requester: UserId, criteria_hash: &str, offset: u32)
        -> StoreResult<()>;

    async fn record_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
        decision: Decision,
    ) -> StoreResult<()>;

    async fn get_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
    ) -> StoreResult<Option<Decision>>;

    /// Remove a decision; returns whether one existed
    async fn clear_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
    ) -> StoreResult<bool>;

    /// Every current decision about a candidate, photo-level and candidate-level
    async fn candidate_decisions(
        &self,
        requester: UserId,
        candidate: UserId,
    ) -> StoreResult<Vec<Decision>>;

    /// Candidates with at least one liked photo
    async fn liked_candidates(&self, requester: UserId) -> StoreResult<Vec<UserId>>;

    /// Add to the block list; returns `false` when already blocked
    async fn block(&self, requester: UserId, candidate: UserId) -> StoreResult<bool>;

    async fn is_blocked(&self, requester: UserId, candidate: UserId) -> StoreResult<bool>;

    /// Remove from the block list; returns whether it was blocked
    async fn unblock(&self, requester: UserId, candidate: UserId) -> StoreResult<bool>;

    /// Blocked candidates in ascending id order
    async fn blocked(&self, requester: UserId) -> StoreResult<Vec<UserId>>;

    /// Add to the favourites list; returns `false` when already present
    async fn add_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool>;

    /// Returns whether the candidate was a favourite
    async fn remove_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool>;

    async fn is_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool>;

    /// Favourites in the order they were added
    async fn favorites(&self, requester: UserId) -> StoreResult<Vec<UserId>>;

    /// Replace the requester's saved search preferences
    async fn set_preferences(&self, requester: UserId, criteria: &SearchCriteria)
        -> StoreResult<()>;

    async fn get_preferences(&self, requester: UserId) -> StoreResult<Option<SearchCriteria>>;

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}
