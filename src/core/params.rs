use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::domain::{PhotoId, SearchCriteria, UserId, MAX_SEARCH_AGE, MIN_SEARCH_AGE};

/// Largest page `users.search` and `photos.get` return
pub const MAX_PAGE_SIZE: u32 = 1000;

/// `users.search` never returns results past this offset
pub const SEARCH_WINDOW: u32 = 1000;

/// Profile fields requested with every search
pub const SEARCH_FIELDS: &str = "bdate,city,sex,relation,has_photo,online";

/// Criteria or parameters the remote platform would reject
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCriteria {
    #[error("age range {from}-{to} is inverted: the lower bound must not exceed the upper bound")]
    InvertedAgeRange { from: u8, to: u8 },

    #[error("age {0} is outside the supported range {min}-{max}", min = MIN_SEARCH_AGE, max = MAX_SEARCH_AGE)]
    AgeOutOfRange(u8),

    #[error("city id must be positive, got {0}")]
    InvalidCity(i64),

    #[error("count must be between 1 and {max}, got {0}", max = MAX_PAGE_SIZE)]
    InvalidCount(u32),

    #[error("offset {0} is past the {window}-result search window", window = SEARCH_WINDOW)]
    OffsetBeyondWindow(u32),
}

/// Interface language for returned titles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Ru,
    Uk,
    Be,
    En,
    Es,
    Fi,
    De,
    It,
}

impl Lang {
    pub fn as_str(self) -> &'static str {
        match self {
            Lang::Ru => "ru",
            Lang::Uk => "uk",
            Lang::Be => "be",
            Lang::En => "en",
            Lang::Es => "es",
            Lang::Fi => "fi",
            Lang::De => "de",
            Lang::It => "it",
        }
    }
}

/// Validate criteria against the platform's accepted ranges
pub fn validate_criteria(criteria: &SearchCriteria) -> Result<(), InvalidCriteria> {
    for age in [criteria.age_from, criteria.age_to] {
        if !(MIN_SEARCH_AGE..=MAX_SEARCH_AGE).contains(&age) {
            return Err(InvalidCriteria::AgeOutOfRange(age));
        }
    }

    if criteria.age_from > criteria.age_to {
        return Err(InvalidCriteria::InvertedAgeRange {
            from: criteria.age_from,
            to: criteria.age_to,
        });
    }

    if let Some(city) = criteria.city {
        if city <= 0 {
            return Err(InvalidCriteria::InvalidCity(city));
        }
    }

    Ok(())
}

fn validate_count(count: u32) -> Result<(), InvalidCriteria> {
    if count == 0 || count > MAX_PAGE_SIZE {
        return Err(InvalidCriteria::InvalidCount(count));
    }
    Ok(())
}

/// Validated `users.search` parameters for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    criteria: SearchCriteria,
    offset: u32,
    count: u32,
    lang: Lang,
}

impl SearchParams {
    /// Build parameters for the page at `offset`.
    ///
    /// `count` is trimmed so the page never extends past the search window.
    pub fn new(
        criteria: &SearchCriteria,
        offset: u32,
        count: u32,
        lang: Lang,
    ) -> Result<Self, InvalidCriteria> {
        validate_criteria(criteria)?;
        validate_count(count)?;
        if offset >= SEARCH_WINDOW {
            return Err(InvalidCriteria::OffsetBeyondWindow(offset));
        }

        Ok(Self {
            criteria: criteria.clone(),
            offset,
            count: count.min(SEARCH_WINDOW - offset),
            lang,
        })
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// Serialize into `users.search` query pairs
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("sex", self.criteria.sex.code().to_string()),
            ("age_from", self.criteria.age_from.to_string()),
            ("age_to", self.criteria.age_to.to_string()),
            ("has_photo", "1".to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
            ("offset", self.offset.to_string()),
            ("count", self.count.to_string()),
            ("lang", self.lang.as_str().to_string()),
        ];

        if let Some(city) = self.criteria.city {
            query.push(("city", city.to_string()));
        }
        if let Some(status) = self.criteria.status {
            query.push(("status", status.code().to_string()));
        }

        query
    }
}

/// Validated `photos.get` parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoParams {
    owner_id: UserId,
    count: u32,
}

impl PhotoParams {
    pub fn new(owner_id: UserId, count: u32) -> Result<Self, InvalidCriteria> {
        validate_count(count)?;
        Ok(Self { owner_id, count })
    }

    /// Profile album, newest first, with like counters
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("owner_id", self.owner_id.to_string()),
            ("album_id", "profile".to_string()),
            ("rev", "1".to_string()),
            ("extended", "1".to_string()),
            ("photo_sizes", "1".to_string()),
            ("count", self.count.to_string()),
        ]
    }
}

/// `likes.add` / `likes.delete` parameters for a photo
pub fn like_query(owner_id: UserId, photo_id: PhotoId) -> Vec<(&'static str, String)> {
    vec![
        ("type", "photo".to_string()),
        ("owner_id", owner_id.to_string()),
        ("item_id", photo_id.to_string()),
    ]
}
