use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::models::{Decision, PhotoId, SearchCriteria, UserId};
use crate::services::store::{CandidateStore, StoreResult};

/// State of a single requester partition
#[derive(Debug, Default)]
struct Partition {
    seen: HashSet<UserId>,
    seen_order: Vec<UserId>,
    cursors: HashMap<String, u32>,
    decisions: HashMap<(UserId, Option<PhotoId>), Decision>,
    blocked: HashSet<UserId>,
    favorites: Vec<UserId>,
    preferences: Option<SearchCriteria>,
}

/// In-process candidate store
///
/// Each requester owns its own lock; the outer map lock is only held long
/// enough to look up or create a partition.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    partitions: RwLock<HashMap<UserId, Arc<Mutex<Partition>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn partition(&self, requester: UserId) -> Arc<Mutex<Partition>> {
        if let Some(partition) = self.partitions.read().await.get(&requester) {
            return Arc::clone(partition);
        }

        let mut partitions = self.partitions.write().await;
        Arc::clone(partitions.entry(requester).or_default())
    }
}

#[async_trait]
impl CandidateStore for InMemoryStore {
    async fn add_seen(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        if !state.seen.insert(candidate) {
            return Ok(false);
        }
        state.seen_order.push(candidate);
        Ok(true)
    }

    async fn is_seen(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state.seen.contains(&candidate))
    }

    async fn seen(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state.seen_order.clone())
    }

    async fn reset_seen(&self, requester: UserId) -> StoreResult<u64> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        let cleared = state.seen.len() as u64;
        state.seen.clear();
        state.seen_order.clear();
        state.cursors.clear();
        tracing::info!("Cleared {} seen candidates for requester {}", cleared, requester);
        Ok(cleared)
    }

    async fn get_cursor(&self, requester: UserId, criteria_hash: &str) -> StoreResult<u32> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state.cursors.get(criteria_hash).copied().unwrap_or(0))
    }

    async fn set_cursor(
        &self,
        requester: UserId,
        criteria_hash: &str,
        offset: u32,
    ) -> StoreResult<()> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        state.cursors.insert(criteria_hash.to_string(), offset);
        Ok(())
    }

    async fn record_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
        decision: Decision,
    ) -> StoreResult<()> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        state.decisions.insert((candidate, photo), decision);
        Ok(())
    }

    async fn get_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
    ) -> StoreResult<Option<Decision>> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state.decisions.get(&(candidate, photo)).copied())
    }

    async fn clear_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: Option<PhotoId>,
    ) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        Ok(state.decisions.remove(&(candidate, photo)).is_some())
    }

    async fn candidate_decisions(
        &self,
        requester: UserId,
        candidate: UserId,
    ) -> StoreResult<Vec<Decision>> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state
            .decisions
            .iter()
            .filter(|((c, _), _)| *c == candidate)
            .map(|(_, d)| *d)
            .collect())
    }

    async fn liked_candidates(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        let mut liked: Vec<UserId> = state
            .decisions
            .iter()
            .filter(|(_, d)| **d == Decision::Liked)
            .map(|((c, _), _)| *c)
            .collect();
        liked.sort_unstable();
        liked.dedup();
        Ok(liked)
    }

    async fn block(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        Ok(state.blocked.insert(candidate))
    }

    async fn is_blocked(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state.blocked.contains(&candidate))
    }

    async fn unblock(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        Ok(state.blocked.remove(&candidate))
    }

    async fn blocked(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        let mut blocked: Vec<UserId> = state.blocked.iter().copied().collect();
        blocked.sort_unstable();
        Ok(blocked)
    }

    async fn add_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        if state.favorites.contains(&candidate) {
            return Ok(false);
        }
        state.favorites.push(candidate);
        Ok(true)
    }

    async fn remove_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        let before = state.favorites.len();
        state.favorites.retain(|c| *c != candidate);
        Ok(state.favorites.len() < before)
    }

    async fn is_favorite(&self, requester: UserId, candidate: UserId) -> StoreResult<bool> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state.favorites.contains(&candidate))
    }

    async fn favorites(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state.favorites.clone())
    }

    async fn set_preferences(
        &self,
        requester: UserId,
        criteria: &SearchCriteria,
    ) -> StoreResult<()> {
        let partition = self.partition(requester).await;
        let mut state = partition.lock().await;
        state.preferences = Some(criteria.clone());
        Ok(())
    }

    async fn get_preferences(&self, requester: UserId) -> StoreResult<Option<SearchCriteria>> {
        let partition = self.partition(requester).await;
        let state = partition.lock().await;
        Ok(state.preferences.clone())
    }
}
