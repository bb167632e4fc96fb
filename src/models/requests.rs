use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{Action, PhotoId, SearchCriteria, UserId};

/// Request for the next candidate
///
/// `criteria` defaults to the requester-derived criteria when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NextCandidateRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "requester_id", rename = "requesterId")]
    pub requester_id: UserId,
    #[serde(default)]
    pub criteria: Option<SearchCriteria>,
}

/// Request to like or unlike a surfaced candidate's photo
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DecisionRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "requester_id", rename = "requesterId")]
    pub requester_id: UserId,
    #[validate(range(min = 1))]
    #[serde(alias = "candidate_id", rename = "candidateId")]
    pub candidate_id: UserId,
    #[validate(range(min = 1))]
    #[serde(alias = "photo_id", rename = "photoId")]
    pub photo_id: PhotoId,
    pub action: Action,
}

/// Request targeting a whole candidate (skip, block, favourites)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CandidateRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "requester_id", rename = "requesterId")]
    pub requester_id: UserId,
    #[validate(range(min = 1))]
    #[serde(alias = "candidate_id", rename = "candidateId")]
    pub candidate_id: UserId,
}

/// Request or query addressing a requester only
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequesterRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "requester_id", rename = "requesterId")]
    pub requester_id: UserId,
}

/// Request to save search preferences
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PreferencesRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "requester_id", rename = "requesterId")]
    pub requester_id: UserId,
    pub criteria: SearchCriteria,
}
