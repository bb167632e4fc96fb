use serde::Serialize;
use std::sync::Arc;

use crate::core::error::DiscoveryError;
use crate::models::{Action, Decision, PhotoId, UserId};
use crate::services::{CandidateStore, Transport, TransportError};

/// Acknowledgement of an applied (or already satisfied) decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Ack {
    /// The remote like state changed; carries the new like count
    Applied { likes: u64 },
    /// Nothing to do, the decision was already in effect
    Unchanged,
    /// Stored locally only, no remote call was involved
    Recorded,
    /// The photo no longer exists remotely; its decision was pruned
    PhotoGone,
}

/// Applies requester decisions to the remote platform and the decision log
///
/// Decisions are only accepted for candidates the requester has been shown.
/// The decision log is written after the remote call succeeds, never before.
pub struct InteractionCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CandidateStore>,
}

impl InteractionCoordinator {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CandidateStore>) -> Self {
        Self { transport, store }
    }

    async fn ensure_surfaced(
        &self,
        requester: UserId,
        candidate: UserId,
    ) -> Result<(), DiscoveryError> {
        if self.store.is_seen(requester, candidate).await? {
            Ok(())
        } else {
            tracing::warn!(
                "Rejected decision on candidate {} not shown to requester {}",
                candidate,
                requester
            );
            Err(DiscoveryError::NotSurfaced {
                requester,
                candidate,
            })
        }
    }

    /// Like or unlike one of a surfaced candidate's photos
    pub async fn apply_decision(
        &self,
        requester: UserId,
        candidate: UserId,
        photo: PhotoId,
        action: Action,
    ) -> Result<Ack, DiscoveryError> {
        self.ensure_surfaced(requester, candidate).await?;

        let current = self
            .store
            .get_decision(requester, candidate, Some(photo))
            .await?;

        let already_applied = match action {
            Action::Like => current == Some(Decision::Liked),
            Action::Unlike => current != Some(Decision::Liked),
        };
        if already_applied {
            tracing::debug!(
                "{:?} on photo {}_{} is already in effect for requester {}",
                action,
                candidate,
                photo,
                requester
            );
            return Ok(Ack::Unchanged);
        }

        let result = match action {
            Action::Like => self.transport.like_photo(candidate, photo).await,
            Action::Unlike => self.transport.unlike_photo(candidate, photo).await,
        };

        match result {
            Ok(likes) => {
                self.store
                    .record_decision(requester, candidate, Some(photo), action.decision())
                    .await?;

                tracing::info!(
                    "Requester {} {:?} photo {}_{} ({} likes)",
                    requester,
                    action.decision(),
                    candidate,
                    photo,
                    likes
                );

                Ok(Ack::Applied { likes })
            }
            Err(TransportError::NotFound { message, .. }) => {
                self.store
                    .clear_decision(requester, candidate, Some(photo))
                    .await?;

                tracing::info!(
                    "Photo {}_{} is gone ({}), pruned decision for requester {}",
                    candidate,
                    photo,
                    message,
                    requester
                );

                Ok(Ack::PhotoGone)
            }
            Err(e) => {
                tracing::error!(
                    "{:?} on photo {}_{} failed: {}",
                    action,
                    candidate,
                    photo,
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Record that the requester passed on a surfaced candidate
    pub async fn skip(&self, requester: UserId, candidate: UserId) -> Result<Ack, DiscoveryError> {
        self.ensure_surfaced(requester, candidate).await?;

        if self.store.get_decision(requester, candidate, None).await? == Some(Decision::Skipped) {
            return Ok(Ack::Unchanged);
        }

        self.store
            .record_decision(requester, candidate, None, Decision::Skipped)
            .await?;

        tracing::info!("Requester {} skipped candidate {}", requester, candidate);

        Ok(Ack::Recorded)
    }

    /// Never surface this candidate to the requester again
    ///
    /// Returns `false` when the candidate was already blocked.
    pub async fn block(&self, requester: UserId, candidate: UserId) -> Result<bool, DiscoveryError> {
        self.ensure_surfaced(requester, candidate).await?;

        let newly_blocked = self.store.block(requester, candidate).await?;
        if newly_blocked {
            tracing::info!("Requester {} blocked candidate {}", requester, candidate);
        }

        Ok(newly_blocked)
    }

    /// Lift a block; returns `false` when the candidate was not blocked
    pub async fn unblock(
        &self,
        requester: UserId,
        candidate: UserId,
    ) -> Result<bool, DiscoveryError> {
        let unblocked = self.store.unblock(requester, candidate).await?;
        if unblocked {
            tracing::info!("Requester {} unblocked candidate {}", requester, candidate);
        }

        Ok(unblocked)
    }

    pub async fn blocked(&self, requester: UserId) -> Result<Vec<UserId>, DiscoveryError> {
        Ok(self.store.blocked(requester).await?)
    }

    /// Save a surfaced candidate to the favourites list
    ///
    /// Favourites are never surfaced again. Returns `false` when the
    /// candidate was already a favourite.
    pub async fn add_favorite(
        &self,
        requester: UserId,
        candidate: UserId,
    ) -> Result<bool, DiscoveryError> {
        self.ensure_surfaced(requester, candidate).await?;

        let added = self.store.add_favorite(requester, candidate).await?;
        if added {
            tracing::info!("Requester {} saved candidate {} to favourites", requester, candidate);
        }

        Ok(added)
    }

    pub async fn remove_favorite(
        &self,
        requester: UserId,
        candidate: UserId,
    ) -> Result<bool, DiscoveryError> {
        let removed = self.store.remove_favorite(requester, candidate).await?;
        if removed {
            tracing::info!("Requester {} removed candidate {} from favourites", requester, candidate);
        }

        Ok(removed)
    }

    /// Favourites in the order they were saved
    pub async fn favorites(&self, requester: UserId) -> Result<Vec<UserId>, DiscoveryError> {
        Ok(self.store.favorites(requester).await?)
    }

    /// Candidates with at least one liked photo
    pub async fn liked(&self, requester: UserId) -> Result<Vec<UserId>, DiscoveryError> {
        Ok(self.store.liked_candidates(requester).await?)
    }

    /// Candidates surfaced since the last reset, oldest first
    pub async fn seen(&self, requester: UserId) -> Result<Vec<UserId>, DiscoveryError> {
        Ok(self.store.seen(requester).await?)
    }
}
