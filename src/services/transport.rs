use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::params::SearchParams;
use crate::models::{PhotoId, UserId};

/// A raw, untyped record as returned by the remote platform
pub type RawRecord = Value;

/// Classified failures of the remote platform
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Timeouts, connection failures, throttling, remote server errors
    #[error("remote platform unavailable: {0}")]
    Unavailable(String),

    #[error("remote platform rejected the call ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("access denied ({code}): {message}")]
    AccessDenied { code: i64, message: String },

    #[error("object not found ({code}): {message}")]
    NotFound { code: i64, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Classify a VK API error code
    ///
    /// See https://dev.vk.com/en/reference/errors
    pub fn from_api_error(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            // unknown error, too many requests, flood control, internal error, rate limit
            1 | 6 | 9 | 10 | 29 => TransportError::Unavailable(format!("({code}) {message}")),
            // access denied, private profile, private album
            15 | 30 | 200 | 201 | 203 => TransportError::AccessDenied { code, message },
            // deleted/banned page, object not found, invalid user id
            18 | 104 | 113 => TransportError::NotFound { code, message },
            _ => TransportError::Rejected { code, message },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Unavailable(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::InvalidResponse(err.to_string())
        } else {
            TransportError::Unavailable(err.to_string())
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Authenticated access to the remote social network
///
/// Implementations return raw records; validation belongs to the typed
/// record layer so one malformed item never fails a whole page.
#[async_trait]
pub trait Transport: Send + Sync {
    /// One page of `users.search` results in remote order
    async fn search_candidates(&self, params: &SearchParams) -> TransportResult<Vec<RawRecord>>;

    /// Profile photos of `owner_id`, newest first
    async fn fetch_photos(&self, owner_id: UserId, count: u32) -> TransportResult<Vec<RawRecord>>;

    /// Like a photo; returns the photo's new like count
    async fn like_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64>;

    /// Remove a like; returns the photo's new like count
    async fn unlike_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64>;

    async fn fetch_profiles(&self, ids: &[UserId]) -> TransportResult<Vec<RawRecord>>;
}
