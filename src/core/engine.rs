use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::error::DiscoveryError;
use crate::core::filters::{screen_candidate, SkipReason};
use crate::core::params::{validate_criteria, Lang, SearchParams, SEARCH_WINDOW};
use crate::models::{
    parse, Candidate, Decision, ExclusionPolicy, Photo, PhotoId, PhotoRecord, Requester,
    SearchCriteria, UserId, UserRecord,
};
use crate::services::{CandidateStore, RawRecord, Transport, TransportError};

/// Tunables for candidate discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Records requested per search page
    pub page_size: u32,
    /// Consecutive pages without a survivor scanned per call
    pub max_empty_pages: u32,
    /// Photos attached to each returned candidate
    pub photo_count: u32,
    pub lang: Lang,
    pub exclusion: ExclusionPolicy,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_empty_pages: 5,
            photo_count: 3,
            lang: Lang::default(),
            exclusion: ExclusionPolicy::default(),
        }
    }
}

/// Outcome of a discovery call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "candidate", rename_all = "lowercase")]
pub enum NextCandidate {
    Found(Candidate),
    /// No further candidates for these criteria; not an error
    Exhausted,
}

impl NextCandidate {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            NextCandidate::Found(candidate) => Some(candidate),
            NextCandidate::Exhausted => None,
        }
    }
}

/// Pages through the remote search and returns one unseen candidate per call
///
/// # Pipeline Stages
/// 1. Record parsing (malformed records are skipped)
/// 2. Local screening: self, deactivated, hidden photos, criteria
/// 3. Store screening: seen set, block list, favourites, exclusion policy
/// 4. Photo loading (candidates without accessible photos are skipped)
///
/// The search position is persisted per requester and criteria, so a call
/// resumes right after the previously returned candidate.
pub struct DiscoveryEngine {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CandidateStore>,
    settings: DiscoverySettings,
}

impl DiscoveryEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CandidateStore>,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            transport,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Return the next candidate for the requester under the given criteria
    ///
    /// The returned candidate is added to the requester's seen set before
    /// this returns. Transport failures leave the cursor where the failing
    /// page started.
    pub async fn next_candidate(
        &self,
        requester: &Requester,
        criteria: &SearchCriteria,
    ) -> Result<NextCandidate, DiscoveryError> {
        validate_criteria(criteria)?;

        let criteria_hash = criteria.fingerprint();
        let mut offset = self.store.get_cursor(requester.id, &criteria_hash).await?;
        let today = Utc::now().date_naive();

        for _ in 0..self.settings.max_empty_pages.max(1) {
            if offset >= SEARCH_WINDOW {
                tracing::info!(
                    "Search window exhausted for requester {} ({})",
                    requester.id,
                    criteria_hash
                );
                return Ok(NextCandidate::Exhausted);
            }

            let params = SearchParams::new(
                criteria,
                offset,
                self.settings.page_size,
                self.settings.lang,
            )?;
            let page = self.transport.search_candidates(&params).await.map_err(|e| {
                tracing::error!("Search page at offset {} failed: {}", offset, e);
                DiscoveryError::from(e)
            })?;

            for (position, raw) in page.iter().enumerate() {
                let Some(candidate) = self
                    .screen(requester, criteria, raw, today)
                    .await?
                else {
                    continue;
                };

                if !self.store.add_seen(requester.id, candidate.id).await? {
                    tracing::debug!("Candidate {} was surfaced concurrently", candidate.id);
                    continue;
                }

                let resume_at = offset + position as u32 + 1;
                self.store
                    .set_cursor(requester.id, &criteria_hash, resume_at)
                    .await?;

                tracing::info!(
                    "Surfaced candidate {} to requester {} ({} photos)",
                    candidate.id,
                    requester.id,
                    candidate.photos.len()
                );

                return Ok(NextCandidate::Found(candidate));
            }

            offset += page.len() as u32;
            self.store
                .set_cursor(requester.id, &criteria_hash, offset)
                .await?;

            if (page.len() as u32) < params.count() {
                tracing::info!(
                    "Search results exhausted for requester {} at offset {}",
                    requester.id,
                    offset
                );
                return Ok(NextCandidate::Exhausted);
            }

            tracing::debug!("Page ending at offset {} had no survivors", offset);
        }

        tracing::info!(
            "No candidate within {} pages for requester {}, resuming at offset {} next time",
            self.settings.max_empty_pages,
            requester.id,
            offset
        );

        Ok(NextCandidate::Exhausted)
    }

    /// Clear the requester's seen set and search cursors
    pub async fn reset_seen(&self, requester: UserId) -> Result<u64, DiscoveryError> {
        let cleared = self.store.reset_seen(requester).await?;
        tracing::info!("Reset discovery state for requester {}", requester);
        Ok(cleared)
    }

    /// Criteria used when a request carries none: the requester's saved
    /// preferences, otherwise the defaults derived from their profile
    pub async fn criteria_for(
        &self,
        requester: &Requester,
    ) -> Result<SearchCriteria, DiscoveryError> {
        match self.store.get_preferences(requester.id).await? {
            Some(saved) => Ok(saved),
            None => Ok(SearchCriteria::for_requester(requester)),
        }
    }

    /// Validate and store the requester's search preferences
    pub async fn save_preferences(
        &self,
        requester: UserId,
        criteria: &SearchCriteria,
    ) -> Result<(), DiscoveryError> {
        validate_criteria(criteria)?;
        self.store.set_preferences(requester, criteria).await?;
        tracing::info!(
            "Saved search preferences for requester {} ({})",
            requester,
            criteria.fingerprint()
        );
        Ok(())
    }

    pub async fn preferences(
        &self,
        requester: UserId,
    ) -> Result<Option<SearchCriteria>, DiscoveryError> {
        Ok(self.store.get_preferences(requester).await?)
    }

    /// Build the requester from their remote profile
    pub async fn resolve_requester(
        &self,
        requester_id: UserId,
        age_radius: u8,
    ) -> Result<Requester, DiscoveryError> {
        let records = match self.transport.fetch_profiles(&[requester_id]).await {
            Ok(records) => records,
            Err(TransportError::NotFound { .. }) => {
                return Err(DiscoveryError::RequesterNotFound(requester_id))
            }
            Err(e) => return Err(e.into()),
        };

        let record = records
            .iter()
            .filter_map(|raw| parse::<UserRecord>(raw).ok())
            .find(|record| record.id == requester_id)
            .ok_or(DiscoveryError::RequesterNotFound(requester_id))?;

        if record.deactivated.is_some() {
            return Err(DiscoveryError::RequesterNotFound(requester_id));
        }

        Ok(Requester::from_record(
            &record,
            age_radius,
            Utc::now().date_naive(),
        ))
    }

    /// Run one raw record through every screening stage
    ///
    /// Returns the candidate with photos attached, or `None` when skipped.
    async fn screen(
        &self,
        requester: &Requester,
        criteria: &SearchCriteria,
        raw: &RawRecord,
        today: NaiveDate,
    ) -> Result<Option<Candidate>, DiscoveryError> {
        let record = match parse::<UserRecord>(raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping malformed search record: {}", e);
                return Ok(None);
            }
        };

        let mut candidate = Candidate::from_record(record, today);

        if let Some(reason) = screen_candidate(&candidate, requester, criteria) {
            return Ok(skipped(candidate.id, reason));
        }

        if self.store.is_seen(requester.id, candidate.id).await? {
            return Ok(skipped(candidate.id, SkipReason::AlreadySeen));
        }

        if self.store.is_blocked(requester.id, candidate.id).await? {
            return Ok(skipped(candidate.id, SkipReason::Blocked));
        }

        if self.store.is_favorite(requester.id, candidate.id).await? {
            return Ok(skipped(candidate.id, SkipReason::Favorite));
        }

        if self.settings.exclusion.is_active() {
            let decisions = self
                .store
                .candidate_decisions(requester.id, candidate.id)
                .await?;
            if let Some(decision) = self.settings.exclusion.excluding(&decisions) {
                return Ok(skipped(candidate.id, SkipReason::Excluded(decision)));
            }
        }

        candidate.photos = self.load_photos(requester.id, candidate.id).await?;
        if candidate.photos.is_empty() {
            return Ok(skipped(candidate.id, SkipReason::NoVisiblePhoto));
        }

        Ok(Some(candidate))
    }

    /// Fetch a candidate's newest profile photos, annotated with like state
    ///
    /// Private or vanished albums yield no photos.
    pub async fn load_photos(
        &self,
        requester: UserId,
        owner: UserId,
    ) -> Result<Vec<Photo>, DiscoveryError> {
        let raw = match self
            .transport
            .fetch_photos(owner, self.settings.photo_count)
            .await
        {
            Ok(raw) => raw,
            Err(e @ (TransportError::AccessDenied { .. } | TransportError::NotFound { .. })) => {
                tracing::debug!("Photos of {} are not accessible: {}", owner, e);
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::error!("Fetching photos of {} failed: {}", owner, e);
                return Err(e.into());
            }
        };

        let mut records: Vec<PhotoRecord> = raw
            .iter()
            .filter_map(|raw| match parse::<PhotoRecord>(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed photo of {}: {}", owner, e);
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| b.date.cmp(&a.date));
        records.truncate(self.settings.photo_count as usize);

        let mut photos = Vec::with_capacity(records.len());
        for record in records {
            let logged = self
                .store
                .get_decision(requester, owner, Some(record.id))
                .await?;
            let liked = match record.user_liked() {
                Some(liked) => {
                    self.sync_like_state(requester, owner, record.id, logged, liked)
                        .await?;
                    liked
                }
                None => logged == Some(Decision::Liked),
            };
            photos.push(Photo::from_record(record, liked));
        }

        Ok(photos)
    }

    /// Mirror the platform's like flag into the decision log
    ///
    /// Only a disagreement with a confirmed remote state is written; a photo
    /// the requester never liked anywhere keeps no log entry.
    async fn sync_like_state(
        &self,
        requester: UserId,
        owner: UserId,
        photo: PhotoId,
        logged: Option<Decision>,
        liked_remotely: bool,
    ) -> Result<(), DiscoveryError> {
        let synced = match (liked_remotely, logged) {
            (true, Some(Decision::Liked)) | (false, None) => None,
            (true, _) => Some(Decision::Liked),
            (false, Some(Decision::Liked)) => Some(Decision::Unliked),
            (false, Some(_)) => None,
        };

        if let Some(decision) = synced {
            self.store
                .record_decision(requester, owner, Some(photo), decision)
                .await?;
            tracing::debug!(
                "Synced photo {}_{} to {:?} for requester {} from the platform",
                owner,
                photo,
                decision,
                requester
            );
        }

        Ok(())
    }
}

fn skipped(candidate: UserId, reason: SkipReason) -> Option<Candidate> {
    tracing::debug!("Skipping candidate {}: {:?}", candidate, reason);
    None
}
