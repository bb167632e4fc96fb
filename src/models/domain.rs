use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::records::{PhotoRecord, UserRecord};

/// VK user identifier
pub type UserId = i64;

/// VK photo identifier (unique per owner)
pub type PhotoId = i64;

/// Youngest age the service searches for
pub const MIN_SEARCH_AGE: u8 = 18;

/// Oldest age the remote search accepts
pub const MAX_SEARCH_AGE: u8 = 99;

/// Age assumed for requesters who hide their birth year
pub const FALLBACK_REQUESTER_AGE: u8 = 25;

/// Sex filter, encoded on the wire as 0 (any), 1 (female), 2 (male)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Any,
    Female,
    Male,
}

impl Sex {
    pub fn code(self) -> u8 {
        match self {
            Sex::Any => 0,
            Sex::Female => 1,
            Sex::Male => 2,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Sex::Female,
            2 => Sex::Male,
            _ => Sex::Any,
        }
    }

    /// The sex a requester of this sex is matched with by default
    pub fn opposite(self) -> Self {
        match self {
            Sex::Female => Sex::Male,
            Sex::Male => Sex::Female,
            Sex::Any => Sex::Any,
        }
    }
}

/// Relationship status as enumerated by the remote platform (codes 1..=8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationStatus {
    Single,
    Dating,
    Engaged,
    Married,
    Complicated,
    ActivelySearching,
    InLove,
    CivilUnion,
}

impl RelationStatus {
    pub fn code(self) -> u8 {
        match self {
            RelationStatus::Single => 1,
            RelationStatus::Dating => 2,
            RelationStatus::Engaged => 3,
            RelationStatus::Married => 4,
            RelationStatus::Complicated => 5,
            RelationStatus::ActivelySearching => 6,
            RelationStatus::InLove => 7,
            RelationStatus::CivilUnion => 8,
        }
    }

    /// Code 0 means "not specified" and maps to `None`
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(RelationStatus::Single),
            2 => Some(RelationStatus::Dating),
            3 => Some(RelationStatus::Engaged),
            4 => Some(RelationStatus::Married),
            5 => Some(RelationStatus::Complicated),
            6 => Some(RelationStatus::ActivelySearching),
            7 => Some(RelationStatus::InLove),
            8 => Some(RelationStatus::CivilUnion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub title: String,
}

/// The end user on whose behalf discovery runs
///
/// Built from the remote profile. Single-profile lookups go through the
/// transport cache, so a profile change shows up once its entry expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub id: UserId,
    pub sex: Sex,
    pub age: Option<u8>,
    pub city: Option<City>,
    /// Years either side of the requester's age that are acceptable
    pub age_radius: u8,
    pub status: Option<RelationStatus>,
}

impl Requester {
    pub fn from_record(record: &UserRecord, age_radius: u8, today: NaiveDate) -> Self {
        Self {
            id: record.id,
            sex: Sex::from_code(record.sex.unwrap_or(0)),
            age: record.bdate.as_deref().and_then(|b| age_from_birth_date(b, today)),
            city: record.city.as_ref().map(|c| City {
                id: c.id,
                title: c.title.clone(),
            }),
            age_radius,
            status: record.relation.and_then(RelationStatus::from_code),
        }
    }
}

/// Search criteria for one discovery stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default)]
    pub sex: Sex,
    pub age_from: u8,
    pub age_to: u8,
    #[serde(default)]
    pub city: Option<i64>,
    #[serde(default)]
    pub status: Option<RelationStatus>,
}

impl SearchCriteria {
    /// Default criteria for a requester: the opposite sex, within the
    /// requester's age radius, in the requester's city, any relationship
    /// status. The requester's own status is not a search preference.
    pub fn for_requester(requester: &Requester) -> Self {
        let age = requester.age.unwrap_or(FALLBACK_REQUESTER_AGE);
        let age_from = age
            .saturating_sub(requester.age_radius)
            .clamp(MIN_SEARCH_AGE, MAX_SEARCH_AGE);
        let age_to = age
            .saturating_add(requester.age_radius)
            .clamp(MIN_SEARCH_AGE, MAX_SEARCH_AGE);

        Self {
            sex: requester.sex.opposite(),
            age_from,
            age_to,
            city: requester.city.as_ref().map(|c| c.id),
            status: None,
        }
    }

    /// Stable key identifying this criteria set. Used to partition search
    /// cursors and cached result pages; equal criteria always produce the
    /// same key across processes.
    pub fn fingerprint(&self) -> String {
        let city = self.city.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
        let status = self
            .status
            .map(|s| s.code().to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "sex={};age={}-{};city={};status={}",
            self.sex.code(),
            self.age_from,
            self.age_to,
            city,
            status
        )
    }
}

/// A single size variant of a photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    #[serde(rename = "type")]
    pub kind: String,
    pub width: u32,
    pub height: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: PhotoId,
    pub owner_id: UserId,
    pub uploaded_at: DateTime<Utc>,
    pub sizes: Vec<PhotoSize>,
    pub likes: u64,
    pub comments: u64,
    pub reposts: u64,
    pub liked_by_requester: bool,
}

impl Photo {
    pub fn from_record(record: PhotoRecord, liked_by_requester: bool) -> Self {
        let uploaded_at = DateTime::from_timestamp(record.date, 0).unwrap_or_default();

        Self {
            id: record.id,
            owner_id: record.owner_id,
            uploaded_at,
            sizes: record
                .sizes
                .into_iter()
                .map(|s| PhotoSize {
                    kind: s.kind,
                    width: s.width,
                    height: s.height,
                    url: s.url,
                })
                .collect(),
            likes: record.likes.map(|l| l.count).unwrap_or(0),
            comments: record.comments.map(|c| c.count).unwrap_or(0),
            reposts: record.reposts.map(|r| r.count).unwrap_or(0),
            liked_by_requester,
        }
    }
}

/// A remote profile proposed as a potential match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    pub age: Option<u8>,
    pub city: Option<City>,
    pub online: bool,
    pub status: Option<RelationStatus>,
    pub photos: Vec<Photo>,
    pub has_visible_photo: bool,
    #[serde(skip)]
    pub active: bool,
}

impl Candidate {
    /// Build a candidate without photos; photos are fetched separately.
    pub fn from_record(record: UserRecord, today: NaiveDate) -> Self {
        let closed = record.is_closed.unwrap_or(false) && !record.can_access_closed.unwrap_or(true);
        let has_visible_photo = record.has_photo != Some(0) && !closed;

        Self {
            id: record.id,
            age: record.bdate.as_deref().and_then(|b| age_from_birth_date(b, today)),
            sex: Sex::from_code(record.sex.unwrap_or(0)),
            city: record.city.map(|c| City {
                id: c.id,
                title: c.title,
            }),
            online: record.online == Some(1),
            status: record.relation.and_then(RelationStatus::from_code),
            photos: Vec::new(),
            has_visible_photo,
            active: record.deactivated.is_none(),
            first_name: record.first_name,
            last_name: record.last_name,
        }
    }
}

/// Last decision a requester made about a candidate or one of its photos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Liked,
    Unliked,
    Skipped,
}

/// Photo action requested by the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Like,
    Unlike,
}

impl Action {
    pub fn decision(self) -> Decision {
        match self {
            Action::Like => Decision::Liked,
            Action::Unlike => Decision::Unliked,
        }
    }
}

/// Which past decisions permanently exclude a candidate from discovery,
/// on top of the per-requester seen set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionPolicy {
    #[serde(default)]
    pub exclude_liked: bool,
    #[serde(default)]
    pub exclude_skipped: bool,
}

impl ExclusionPolicy {
    pub fn is_active(&self) -> bool {
        self.exclude_liked || self.exclude_skipped
    }

    /// Returns the decision that excludes the candidate, if any
    pub fn excluding(&self, decisions: &[Decision]) -> Option<Decision> {
        decisions.iter().copied().find(|d| match d {
            Decision::Liked => self.exclude_liked,
            Decision::Skipped => self.exclude_skipped,
            Decision::Unliked => false,
        })
    }
}

/// Age in whole years from a `D.M.YYYY` birth date.
///
/// Returns `None` when the year is hidden (`D.M`) or the date is invalid.
pub fn age_from_birth_date(bdate: &str, today: NaiveDate) -> Option<u8> {
    let mut parts = bdate.split('.');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let born = NaiveDate::from_ymd_opt(year, month, day)?;
    if born > today {
        return None;
    }

    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }

    u8::try_from(age).ok()
}
