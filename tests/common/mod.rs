// Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vkinder::core::{DiscoveryEngine, DiscoverySettings, InteractionCoordinator, SearchParams};
use vkinder::models::{PhotoId, Requester, Sex, UserId};
use vkinder::services::{
    CandidateStore, InMemoryStore, RawRecord, Transport, TransportError, TransportResult,
};

pub const REQUESTER_ID: UserId = 1;

/// Scripted in-process stand-in for the VK API
///
/// Search results are one ordered list sliced by offset and count, the way
/// the remote search pages through a stable result set.
#[derive(Default)]
pub struct MockTransport {
    results: Mutex<Vec<Value>>,
    photos: Mutex<HashMap<UserId, Vec<Value>>>,
    photo_errors: Mutex<HashMap<UserId, TransportError>>,
    profiles: Mutex<HashMap<UserId, Value>>,
    search_error: Mutex<Option<TransportError>>,
    like_error: Mutex<Option<TransportError>>,
    likes: Mutex<HashMap<(UserId, PhotoId), u64>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(results: Vec<Value>) -> Self {
        let transport = Self::new();
        transport.set_results(results);
        transport
    }

    pub fn set_results(&self, results: Vec<Value>) {
        *self.results.lock().unwrap() = results;
    }

    pub fn set_photos(&self, owner: UserId, photos: Vec<Value>) {
        self.photos.lock().unwrap().insert(owner, photos);
    }

    pub fn fail_photos(&self, owner: UserId, err: TransportError) {
        self.photo_errors.lock().unwrap().insert(owner, err);
    }

    pub fn add_profile(&self, profile: Value) {
        let id = profile["id"].as_i64().unwrap();
        self.profiles.lock().unwrap().insert(id, profile);
    }

    pub fn fail_search(&self, err: Option<TransportError>) {
        *self.search_error.lock().unwrap() = err;
    }

    pub fn fail_likes(&self, err: Option<TransportError>) {
        *self.like_error.lock().unwrap() = err;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn search_candidates(&self, params: &SearchParams) -> TransportResult<Vec<RawRecord>> {
        self.record(format!("search:{}:{}", params.offset(), params.count()));

        if let Some(err) = self.search_error.lock().unwrap().clone() {
            return Err(err);
        }

        let results = self.results.lock().unwrap();
        let start = (params.offset() as usize).min(results.len());
        let end = (start + params.count() as usize).min(results.len());
        Ok(results[start..end].to_vec())
    }

    async fn fetch_photos(&self, owner_id: UserId, count: u32) -> TransportResult<Vec<RawRecord>> {
        self.record(format!("photos:{}", owner_id));

        if let Some(err) = self.photo_errors.lock().unwrap().get(&owner_id) {
            return Err(err.clone());
        }

        let photos = self.photos.lock().unwrap();
        Ok(photos
            .get(&owner_id)
            .map(|p| p.iter().take(count as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn like_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64> {
        self.record(format!("like:{}_{}", owner_id, photo_id));

        if let Some(err) = self.like_error.lock().unwrap().clone() {
            return Err(err);
        }

        let mut likes = self.likes.lock().unwrap();
        let count = likes.entry((owner_id, photo_id)).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn unlike_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64> {
        self.record(format!("unlike:{}_{}", owner_id, photo_id));

        if let Some(err) = self.like_error.lock().unwrap().clone() {
            return Err(err);
        }

        let mut likes = self.likes.lock().unwrap();
        let count = likes.entry((owner_id, photo_id)).or_insert(0);
        *count = count.saturating_sub(1);
        Ok(*count)
    }

    async fn fetch_profiles(&self, ids: &[UserId]) -> TransportResult<Vec<RawRecord>> {
        self.record(format!("profiles:{:?}", ids));

        let profiles = self.profiles.lock().unwrap();
        Ok(ids.iter().filter_map(|id| profiles.get(id).cloned()).collect())
    }
}

/// Shares one `MockTransport` with a decorator that takes ownership of its
/// inner transport, keeping the call log reachable
pub struct SharedTransport(pub Arc<MockTransport>);

#[async_trait]
impl Transport for SharedTransport {
    async fn search_candidates(&self, params: &SearchParams) -> TransportResult<Vec<RawRecord>> {
        self.0.search_candidates(params).await
    }

    async fn fetch_photos(&self, owner_id: UserId, count: u32) -> TransportResult<Vec<RawRecord>> {
        self.0.fetch_photos(owner_id, count).await
    }

    async fn like_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64> {
        self.0.like_photo(owner_id, photo_id).await
    }

    async fn unlike_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64> {
        self.0.unlike_photo(owner_id, photo_id).await
    }

    async fn fetch_profiles(&self, ids: &[UserId]) -> TransportResult<Vec<RawRecord>> {
        self.0.fetch_profiles(ids).await
    }
}

/// Birth date that makes someone exactly `age` years old today
pub fn birth_date_for_age(age: u8) -> String {
    format!("1.1.{}", Utc::now().year() - i32::from(age))
}

/// A `users.search` record with a visible photo
pub fn create_test_user(id: UserId, sex: u8, age: u8) -> Value {
    json!({
        "id": id,
        "first_name": "Anna",
        "last_name": format!("Test{}", id),
        "sex": sex,
        "bdate": birth_date_for_age(age),
        "city": { "id": 2, "title": "Saint Petersburg" },
        "has_photo": 1,
        "online": 0,
        "is_closed": false,
        "can_access_closed": true,
        "track_code": "ignored"
    })
}

/// A `photos.get` record with one size variant
pub fn create_test_photo(owner: UserId, id: PhotoId, date: i64, likes: u64) -> Value {
    json!({
        "id": id,
        "owner_id": owner,
        "album_id": -6,
        "date": date,
        "sizes": [
            { "type": "x", "url": format!("https://sun.userapi.test/{}_{}.jpg", owner, id), "width": 604, "height": 604 }
        ],
        "likes": { "count": likes },
        "comments": { "count": 0 },
        "reposts": { "count": 0 }
    })
}

/// Male requester aged 30 with no city, searching women 25-35 by default
pub fn create_test_requester() -> Requester {
    Requester {
        id: REQUESTER_ID,
        sex: Sex::Male,
        age: Some(30),
        city: None,
        age_radius: 5,
        status: None,
    }
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub store: Arc<InMemoryStore>,
    pub engine: DiscoveryEngine,
    pub coordinator: InteractionCoordinator,
}

pub fn harness(transport: MockTransport, settings: DiscoverySettings) -> Harness {
    let transport = Arc::new(transport);
    let store = Arc::new(InMemoryStore::new());

    let engine = DiscoveryEngine::new(
        transport.clone() as Arc<dyn Transport>,
        store.clone() as Arc<dyn CandidateStore>,
        settings,
    );
    let coordinator = InteractionCoordinator::new(
        transport.clone() as Arc<dyn Transport>,
        store.clone() as Arc<dyn CandidateStore>,
    );

    Harness {
        transport,
        store,
        engine,
        coordinator,
    }
}
