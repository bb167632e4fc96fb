use thiserror::Error;

use crate::core::params::InvalidCriteria;
use crate::models::UserId;
use crate::services::{StoreError, TransportError};

/// Failures surfaced by the discovery engine and interaction coordinator
///
/// Running out of candidates is not an error; see `NextCandidate::Exhausted`.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid search criteria: {0}")]
    InvalidCriteria(#[from] InvalidCriteria),

    #[error("remote platform is unavailable, retry later: {0}")]
    TransportUnavailable(String),

    #[error("remote platform rejected the request: {message}")]
    RemoteRejected { code: Option<i64>, message: String },

    #[error("candidate {candidate} was never shown to requester {requester}")]
    NotSurfaced { requester: UserId, candidate: UserId },

    #[error("requester {0} does not exist on the remote platform")]
    RequesterNotFound(UserId),

    #[error("candidate store failure: {0}")]
    Store(#[from] StoreError),
}

impl DiscoveryError {
    /// Whether the caller may retry the same call with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiscoveryError::TransportUnavailable(_))
    }

    /// Stable machine-readable code for the front-end
    pub fn code(&self) -> &'static str {
        match self {
            DiscoveryError::InvalidCriteria(_) => "invalid_criteria",
            DiscoveryError::TransportUnavailable(_) => "transport_unavailable",
            DiscoveryError::RemoteRejected { .. } => "remote_rejected",
            DiscoveryError::NotSurfaced { .. } => "candidate_not_surfaced",
            DiscoveryError::RequesterNotFound(_) => "requester_not_found",
            DiscoveryError::Store(_) => "store_failure",
        }
    }
}

impl From<TransportError> for DiscoveryError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable(message) => DiscoveryError::TransportUnavailable(message),
            TransportError::Rejected { code, message }
            | TransportError::AccessDenied { code, message }
            | TransportError::NotFound { code, message } => DiscoveryError::RemoteRejected {
                code: Some(code),
                message,
            },
            TransportError::InvalidResponse(message) => DiscoveryError::RemoteRejected {
                code: None,
                message,
            },
        }
    }
}
