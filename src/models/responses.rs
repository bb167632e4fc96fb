use serde::{Deserialize, Serialize};

use crate::core::Ack;
use crate::models::domain::{PhotoId, SearchCriteria, UserId};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache_entries: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    pub retryable: bool,
}

/// Outcome of a like/unlike/skip
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub requester_id: UserId,
    pub candidate_id: UserId,
    pub photo_id: Option<PhotoId>,
    pub ack: Ack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub requester_id: UserId,
    pub cleared: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    pub requester_id: UserId,
    pub candidate_id: UserId,
    pub newly_blocked: bool,
}

/// Candidate id listing (seen set, favourites, liked, blocked)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateListResponse {
    pub requester_id: UserId,
    pub candidates: Vec<UserId>,
    pub count: usize,
}

/// Outcome of adding to or removing from a per-requester list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUpdateResponse {
    pub requester_id: UserId,
    pub candidate_id: UserId,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub requester_id: UserId,
    pub criteria: Option<SearchCriteria>,
}
