//! Typed records parsed from raw VK API JSON.
//!
//! Unknown fields are ignored. A missing required field rejects the whole
//! record instead of defaulting it, so a half-populated profile can never
//! reach the discovery engine.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised for a single malformed record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// A record type the typed record layer knows how to validate
pub trait Record: DeserializeOwned {
    /// Fields that must be present and non-null
    const REQUIRED: &'static [&'static str];

    /// Extra validation run after deserialization
    fn check(&self) -> Result<(), ParseError> {
        Ok(())
    }
}

/// Parse and validate a raw API value into a typed record
pub fn parse<T: Record>(raw: &Value) -> Result<T, ParseError> {
    let object = raw.as_object().ok_or(ParseError::NotAnObject)?;

    for field in T::REQUIRED {
        match object.get(*field) {
            None | Some(Value::Null) => return Err(ParseError::MissingField(*field)),
            Some(_) => {}
        }
    }

    let record: T =
        serde_json::from_value(raw.clone()).map_err(|e| ParseError::Malformed(e.to_string()))?;
    record.check()?;

    Ok(record)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceRecord {
    pub id: i64,
    pub title: String,
}

/// Profile as returned by `users.get` and `users.search`
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub sex: Option<u8>,
    #[serde(default)]
    pub bdate: Option<String>,
    #[serde(default)]
    pub city: Option<PlaceRecord>,
    #[serde(default)]
    pub relation: Option<u8>,
    #[serde(default)]
    pub has_photo: Option<u8>,
    #[serde(default)]
    pub online: Option<u8>,
    #[serde(default)]
    pub is_closed: Option<bool>,
    #[serde(default)]
    pub can_access_closed: Option<bool>,
    /// Present ("deleted" / "banned") only for deactivated profiles
    #[serde(default)]
    pub deactivated: Option<String>,
}

impl Record for UserRecord {
    const REQUIRED: &'static [&'static str] = &["id", "first_name", "last_name"];

    fn check(&self) -> Result<(), ParseError> {
        if self.id <= 0 {
            return Err(ParseError::InvalidField {
                field: "id",
                reason: format!("user ids are positive, got {}", self.id),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSizeRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterRecord {
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikesRecord {
    pub count: u64,
    #[serde(default)]
    pub user_likes: Option<u8>,
}

/// Photo as returned by `photos.get` with `extended=1`
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoRecord {
    pub id: i64,
    pub owner_id: i64,
    /// Unix timestamp of the upload
    pub date: i64,
    #[serde(default)]
    pub sizes: Vec<PhotoSizeRecord>,
    #[serde(default)]
    pub likes: Option<LikesRecord>,
    #[serde(default)]
    pub comments: Option<CounterRecord>,
    #[serde(default)]
    pub reposts: Option<CounterRecord>,
}

impl PhotoRecord {
    /// Whether the token owner liked this photo, when the platform says so
    pub fn user_liked(&self) -> Option<bool> {
        self.likes
            .as_ref()
            .and_then(|l| l.user_likes)
            .map(|flag| flag == 1)
    }
}

impl Record for PhotoRecord {
    const REQUIRED: &'static [&'static str] = &["id", "owner_id", "date", "sizes"];

    fn check(&self) -> Result<(), ParseError> {
        if self.sizes.is_empty() {
            return Err(ParseError::InvalidField {
                field: "sizes",
                reason: "photo has no size variants".to_string(),
            });
        }
        Ok(())
    }
}
