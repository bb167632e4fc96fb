use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::core::params::{like_query, Lang, PhotoParams, SearchParams};
use crate::models::{PhotoId, UserId};
use crate::services::transport::{RawRecord, Transport, TransportError, TransportResult};

pub const DEFAULT_API_VERSION: &str = "5.199";

const PROFILE_FIELDS: &str = "bdate,city,sex,relation,has_photo,online";

/// VK API client
///
/// Issues `method` calls against the VK API with a service access token and
/// unwraps the `{"response": ...}` / `{"error": ...}` envelope.
pub struct VkClient {
    base_url: String,
    access_token: String,
    api_version: String,
    lang: Lang,
    client: Client,
}

impl VkClient {
    pub fn new(
        base_url: String,
        access_token: String,
        api_version: String,
        lang: Lang,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            access_token,
            api_version,
            lang,
            client,
        })
    }

    fn method_url(&self, method: &str, params: &[(&'static str, String)]) -> String {
        let mut query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();

        if !params.iter().any(|(k, _)| *k == "lang") {
            query.push(format!("lang={}", self.lang.as_str()));
        }
        query.push(format!("v={}", urlencoding::encode(&self.api_version)));
        query.push(format!("access_token={}", urlencoding::encode(&self.access_token)));

        format!(
            "{}/method/{}?{}",
            self.base_url.trim_end_matches('/'),
            method,
            query.join("&")
        )
    }

    /// Call an API method and return its `response` payload
    async fn call(&self, method: &str, params: &[(&'static str, String)]) -> TransportResult<Value> {
        // The URL carries the access token; log the method only.
        tracing::debug!("Calling VK method {}", method);

        let response = self.client.get(self.method_url(method, params)).send().await?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::Unavailable(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }
        if !status.is_success() {
            return Err(TransportError::Rejected {
                code: i64::from(status.as_u16()),
                message: format!("{} returned HTTP {}", method, status),
            });
        }

        let mut json: Value = response.json().await?;

        if let Some(error) = json.get("error") {
            let code = error.get("error_code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            tracing::warn!("VK method {} failed with error {}: {}", method, code, message);
            return Err(TransportError::from_api_error(code, message));
        }

        json.get_mut("response")
            .map(Value::take)
            .ok_or_else(|| TransportError::InvalidResponse(format!("{}: missing response", method)))
    }

    /// Extract the `items` array of a list response
    fn items(method: &str, mut response: Value) -> TransportResult<Vec<RawRecord>> {
        match response.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(TransportError::InvalidResponse(format!(
                "{}: missing items array",
                method
            ))),
        }
    }

    fn like_count(method: &str, response: &Value) -> TransportResult<u64> {
        response
            .get("likes")
            .and_then(Value::as_u64)
            .ok_or_else(|| TransportError::InvalidResponse(format!("{}: missing likes", method)))
    }
}

#[async_trait]
impl Transport for VkClient {
    async fn search_candidates(&self, params: &SearchParams) -> TransportResult<Vec<RawRecord>> {
        let response = self.call("users.search", &params.to_query()).await?;
        let items = Self::items("users.search", response)?;

        tracing::debug!(
            "users.search returned {} records at offset {}",
            items.len(),
            params.offset()
        );

        Ok(items)
    }

    async fn fetch_photos(&self, owner_id: UserId, count: u32) -> TransportResult<Vec<RawRecord>> {
        let params = PhotoParams::new(owner_id, count)
            .map_err(|e| TransportError::Rejected {
                code: 100,
                message: e.to_string(),
            })?;
        let response = self.call("photos.get", &params.to_query()).await?;
        Self::items("photos.get", response)
    }

    async fn like_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64> {
        let response = self.call("likes.add", &like_query(owner_id, photo_id)).await?;
        Self::like_count("likes.add", &response)
    }

    async fn unlike_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64> {
        let response = self.call("likes.delete", &like_query(owner_id, photo_id)).await?;
        Self::like_count("likes.delete", &response)
    }

    async fn fetch_profiles(&self, ids: &[UserId]) -> TransportResult<Vec<RawRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        let params = [
            ("user_ids", user_ids),
            ("fields", PROFILE_FIELDS.to_string()),
        ];

        match self.call("users.get", &params).await? {
            Value::Array(users) => Ok(users),
            _ => Err(TransportError::InvalidResponse(
                "users.get: expected an array".to_string(),
            )),
        }
    }
}
