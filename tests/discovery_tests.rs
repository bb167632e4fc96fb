// Integration tests for candidate discovery

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::*;
use vkinder::core::{DiscoveryEngine, DiscoveryError, DiscoverySettings, NextCandidate};
use vkinder::models::{Action, Decision, ExclusionPolicy, SearchCriteria, Sex};
use vkinder::services::{
    CacheManager, CachingTransport, CandidateStore, InMemoryStore, TransportError,
};

fn default_criteria() -> SearchCriteria {
    SearchCriteria::for_requester(&create_test_requester())
}

fn found_id(outcome: &NextCandidate) -> i64 {
    outcome.candidate().map(|c| c.id).expect("expected a candidate")
}

/// A woman aged 28 with `photos` profile photos
fn candidate_with_photos(transport: &MockTransport, id: i64, photos: usize) -> serde_json::Value {
    let records = (0..photos)
        .map(|i| create_test_photo(id, 100 + i as i64, 1_700_000_000 + i as i64, 5))
        .collect();
    transport.set_photos(id, records);
    create_test_user(id, 1, 28)
}

#[tokio::test]
async fn test_photoless_candidates_skipped_and_not_seen() {
    let transport = MockTransport::new();
    let a = candidate_with_photos(&transport, 10, 0);
    let b = candidate_with_photos(&transport, 11, 2);
    let c = candidate_with_photos(&transport, 12, 0);
    transport.set_results(vec![a, b, c]);

    let h = harness(transport, DiscoverySettings::default());
    let requester = create_test_requester();

    let outcome = h.engine.next_candidate(&requester, &default_criteria()).await.unwrap();
    let candidate = outcome.candidate().unwrap();
    assert_eq!(candidate.id, 11);
    assert_eq!(candidate.age, Some(28));
    assert_eq!(candidate.photos.len(), 2);

    assert_eq!(h.store.seen(REQUESTER_ID).await.unwrap(), vec![11]);
}

#[tokio::test]
async fn test_short_page_ends_in_exhausted() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    let d = candidate_with_photos(&transport, 13, 1);
    transport.set_results(vec![b, d]);

    let h = harness(transport, DiscoverySettings::default());
    let requester = create_test_requester();
    let criteria = default_criteria();

    let first = h.engine.next_candidate(&requester, &criteria).await.unwrap();
    let second = h.engine.next_candidate(&requester, &criteria).await.unwrap();
    let third = h.engine.next_candidate(&requester, &criteria).await.unwrap();

    assert_eq!(found_id(&first), 11);
    assert_eq!(found_id(&second), 13);
    assert_eq!(third, NextCandidate::Exhausted);

    // Exhaustion is stable
    let fourth = h.engine.next_candidate(&requester, &criteria).await.unwrap();
    assert_eq!(fourth, NextCandidate::Exhausted);
}

#[tokio::test]
async fn test_candidates_distinct_and_never_self() {
    let transport = MockTransport::new();
    let mut results = Vec::new();
    for id in 20..30 {
        results.push(candidate_with_photos(&transport, id, 1));
        if id == 24 {
            // The requester shows up in their own search results
            results.push(candidate_with_photos(&transport, REQUESTER_ID, 1));
        }
    }
    transport.set_results(results);

    let settings = DiscoverySettings {
        page_size: 3,
        ..DiscoverySettings::default()
    };
    let h = harness(transport, settings);
    let requester = create_test_requester();
    let criteria = default_criteria();

    let mut returned = Vec::new();
    loop {
        match h.engine.next_candidate(&requester, &criteria).await.unwrap() {
            NextCandidate::Found(candidate) => returned.push(candidate.id),
            NextCandidate::Exhausted => break,
        }
        assert!(returned.len() <= 11, "discovery did not terminate");
    }

    let distinct: HashSet<_> = returned.iter().copied().collect();
    assert_eq!(distinct.len(), returned.len());
    assert_eq!(returned, (20..30).collect::<Vec<_>>());
    assert!(!returned.contains(&REQUESTER_ID));
}

#[tokio::test]
async fn test_reset_allows_repeat() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    transport.set_results(vec![b]);

    let h = harness(transport, DiscoverySettings::default());
    let requester = create_test_requester();
    let criteria = default_criteria();

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 11);
    assert_eq!(
        h.engine.next_candidate(&requester, &criteria).await.unwrap(),
        NextCandidate::Exhausted
    );

    assert_eq!(h.engine.reset_seen(REQUESTER_ID).await.unwrap(), 1);

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 11);
}

#[tokio::test]
async fn test_transport_unavailable_leaves_state_untouched() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    transport.set_results(vec![b]);
    transport.fail_search(Some(TransportError::Unavailable("connection reset".to_string())));

    let h = harness(transport, DiscoverySettings::default());
    let requester = create_test_requester();
    let criteria = default_criteria();

    let err = h.engine.next_candidate(&requester, &criteria).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::TransportUnavailable(_)));
    assert!(err.is_retryable());

    assert!(h.store.seen(REQUESTER_ID).await.unwrap().is_empty());
    assert_eq!(
        h.store.get_cursor(REQUESTER_ID, &criteria.fingerprint()).await.unwrap(),
        0
    );

    // Retrying after recovery picks up from the same position
    h.transport.fail_search(None);
    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 11);
}

#[tokio::test]
async fn test_remote_rejection_is_not_retryable() {
    let transport = MockTransport::new();
    transport.fail_search(Some(TransportError::from_api_error(5, "User authorization failed")));

    let h = harness(transport, DiscoverySettings::default());

    let err = h
        .engine
        .next_candidate(&create_test_requester(), &default_criteria())
        .await
        .unwrap_err();

    assert!(matches!(err, DiscoveryError::RemoteRejected { code: Some(5), .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_malformed_record_skipped() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    transport.set_results(vec![
        serde_json::json!({ "id": 10, "sex": 1 }),
        serde_json::json!("not an object"),
        b,
    ]);

    let h = harness(transport, DiscoverySettings::default());

    let outcome = h
        .engine
        .next_candidate(&create_test_requester(), &default_criteria())
        .await
        .unwrap();

    assert_eq!(found_id(&outcome), 11);
}

#[tokio::test]
async fn test_invalid_criteria_rejected_before_remote_call() {
    let h = harness(MockTransport::new(), DiscoverySettings::default());

    let inverted = SearchCriteria {
        sex: Sex::Female,
        age_from: 30,
        age_to: 25,
        city: None,
        status: None,
    };

    let err = h
        .engine
        .next_candidate(&create_test_requester(), &inverted)
        .await
        .unwrap_err();

    assert!(matches!(err, DiscoveryError::InvalidCriteria(_)));
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_private_photos_skipped() {
    let transport = MockTransport::new();
    let private = candidate_with_photos(&transport, 10, 2);
    transport.fail_photos(10, TransportError::from_api_error(30, "This profile is private"));
    let b = candidate_with_photos(&transport, 11, 1);
    transport.set_results(vec![private, b]);

    let h = harness(transport, DiscoverySettings::default());

    let outcome = h
        .engine
        .next_candidate(&create_test_requester(), &default_criteria())
        .await
        .unwrap();

    assert_eq!(found_id(&outcome), 11);
    assert!(!h.store.is_seen(REQUESTER_ID, 10).await.unwrap());
}

#[tokio::test]
async fn test_deactivated_and_mismatched_candidates_skipped() {
    let transport = MockTransport::new();
    let mut deleted = candidate_with_photos(&transport, 10, 1);
    deleted["deactivated"] = serde_json::json!("deleted");
    let man = {
        let mut user = candidate_with_photos(&transport, 11, 1);
        user["sex"] = serde_json::json!(2);
        user
    };
    let too_old = {
        let mut user = candidate_with_photos(&transport, 12, 1);
        user["bdate"] = serde_json::json!(birth_date_for_age(50));
        user
    };
    let hidden = {
        let mut user = candidate_with_photos(&transport, 13, 1);
        user["has_photo"] = serde_json::json!(0);
        user
    };
    let match_ = candidate_with_photos(&transport, 14, 1);
    transport.set_results(vec![deleted, man, too_old, hidden, match_]);

    let h = harness(transport, DiscoverySettings::default());

    let outcome = h
        .engine
        .next_candidate(&create_test_requester(), &default_criteria())
        .await
        .unwrap();

    assert_eq!(found_id(&outcome), 14);
    // Hidden photos are known from the profile, no photo call needed
    assert_eq!(h.transport.count_calls("photos:13"), 0);
}

#[tokio::test]
async fn test_blocked_candidate_survives_reset() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    let d = candidate_with_photos(&transport, 13, 1);
    transport.set_results(vec![b, d]);

    let h = harness(transport, DiscoverySettings::default());
    let requester = create_test_requester();
    let criteria = default_criteria();

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 11);
    assert!(h.coordinator.block(REQUESTER_ID, 11).await.unwrap());

    h.engine.reset_seen(REQUESTER_ID).await.unwrap();

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 13);
    assert_eq!(
        h.engine.next_candidate(&requester, &criteria).await.unwrap(),
        NextCandidate::Exhausted
    );
}

#[tokio::test]
async fn test_exclusion_policy_skips_liked_after_reset() {
    for exclude_liked in [false, true] {
        let transport = MockTransport::new();
        let b = candidate_with_photos(&transport, 11, 1);
        transport.set_results(vec![b]);

        let settings = DiscoverySettings {
            exclusion: ExclusionPolicy {
                exclude_liked,
                exclude_skipped: false,
            },
            ..DiscoverySettings::default()
        };
        let h = harness(transport, settings);
        let requester = create_test_requester();
        let criteria = default_criteria();

        assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 11);
        h.coordinator
            .apply_decision(REQUESTER_ID, 11, 100, Action::Like)
            .await
            .unwrap();
        h.engine.reset_seen(REQUESTER_ID).await.unwrap();

        let again = h.engine.next_candidate(&requester, &criteria).await.unwrap();
        if exclude_liked {
            assert_eq!(again, NextCandidate::Exhausted);
        } else {
            let candidate = again.candidate().unwrap();
            assert_eq!(candidate.id, 11);
            // Like state comes from the decision log when the platform omits it
            assert!(candidate.photos[0].liked_by_requester);
        }
    }
}

#[tokio::test]
async fn test_photos_newest_first_and_capped() {
    let transport = MockTransport::new();
    let user = create_test_user(11, 1, 28);
    transport.set_photos(
        11,
        vec![
            create_test_photo(11, 1, 1_600_000_000, 1),
            create_test_photo(11, 2, 1_700_000_000, 2),
            create_test_photo(11, 3, 1_650_000_000, 3),
        ],
    );
    transport.set_results(vec![user]);

    let settings = DiscoverySettings {
        photo_count: 2,
        ..DiscoverySettings::default()
    };
    let h = harness(transport, settings);

    let outcome = h
        .engine
        .next_candidate(&create_test_requester(), &default_criteria())
        .await
        .unwrap();

    let ids: Vec<_> = outcome.candidate().unwrap().photos.iter().map(|p| p.id).collect();
    // Only `photo_count` photos are requested, then ordered newest first
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_scan_budget_resumes_on_next_call() {
    let transport = MockTransport::new();
    let mut results: Vec<_> = (10..15)
        .map(|id| candidate_with_photos(&transport, id, 0))
        .collect();
    results.push(candidate_with_photos(&transport, 15, 1));
    transport.set_results(results);

    let settings = DiscoverySettings {
        page_size: 2,
        max_empty_pages: 2,
        ..DiscoverySettings::default()
    };
    let h = harness(transport, settings);
    let requester = create_test_requester();
    let criteria = default_criteria();

    assert_eq!(
        h.engine.next_candidate(&requester, &criteria).await.unwrap(),
        NextCandidate::Exhausted
    );
    assert_eq!(
        h.store.get_cursor(REQUESTER_ID, &criteria.fingerprint()).await.unwrap(),
        4
    );

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 15);
}

#[tokio::test]
async fn test_cursors_are_per_criteria() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    let d = candidate_with_photos(&transport, 13, 1);
    transport.set_results(vec![b, d]);

    let h = harness(transport, DiscoverySettings::default());
    let requester = create_test_requester();
    let narrow = default_criteria();
    let wide = SearchCriteria {
        age_from: 18,
        age_to: 40,
        ..default_criteria()
    };

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &narrow).await.unwrap()), 11);
    // The seen set is shared across criteria, cursors are not
    assert_eq!(found_id(&h.engine.next_candidate(&requester, &wide).await.unwrap()), 13);
    assert_eq!(h.transport.count_calls("search:0:"), 2);
}

#[tokio::test]
async fn test_resolve_requester() {
    let transport = MockTransport::new();
    transport.add_profile(serde_json::json!({
        "id": REQUESTER_ID,
        "first_name": "Ivan",
        "last_name": "Petrov",
        "sex": 2,
        "bdate": birth_date_for_age(30),
        "city": { "id": 1, "title": "Moscow" }
    }));

    let h = harness(transport, DiscoverySettings::default());

    let requester = h.engine.resolve_requester(REQUESTER_ID, 3).await.unwrap();
    assert_eq!(requester.sex, Sex::Male);
    assert_eq!(requester.age, Some(30));
    assert_eq!(requester.city.as_ref().map(|c| c.id), Some(1));

    let criteria = SearchCriteria::for_requester(&requester);
    assert_eq!((criteria.age_from, criteria.age_to), (27, 33));
    assert_eq!(criteria.city, Some(1));

    let missing = h.engine.resolve_requester(999, 3).await.unwrap_err();
    assert!(matches!(missing, DiscoveryError::RequesterNotFound(999)));
}

#[tokio::test]
async fn test_skipped_decision_recorded() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    transport.set_results(vec![b]);

    let h = harness(transport, DiscoverySettings::default());

    h.engine
        .next_candidate(&create_test_requester(), &default_criteria())
        .await
        .unwrap();
    h.coordinator.skip(REQUESTER_ID, 11).await.unwrap();

    assert_eq!(
        h.store.get_decision(REQUESTER_ID, 11, None).await.unwrap(),
        Some(Decision::Skipped)
    );
}

#[tokio::test]
async fn test_refetch_after_lost_cursor_write_skips_returned_candidate() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    let d = candidate_with_photos(&transport, 13, 1);
    transport.set_results(vec![b, d]);

    let h = harness(transport, DiscoverySettings::default());
    let requester = create_test_requester();
    let criteria = default_criteria();

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 11);

    // The seen set was written but the cursor advance was lost
    h.store
        .set_cursor(REQUESTER_ID, &criteria.fingerprint(), 0)
        .await
        .unwrap();

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 13);
    assert_eq!(h.transport.count_calls("search:0:"), 2);
    assert_eq!(h.store.seen(REQUESTER_ID).await.unwrap(), vec![11, 13]);
}

#[tokio::test]
async fn test_favorite_never_surfaced_again() {
    let transport = MockTransport::new();
    let b = candidate_with_photos(&transport, 11, 1);
    let d = candidate_with_photos(&transport, 13, 1);
    transport.set_results(vec![b, d]);

    let h = harness(transport, DiscoverySettings::default());
    let requester = create_test_requester();
    let criteria = default_criteria();

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 11);
    assert!(h.coordinator.add_favorite(REQUESTER_ID, 11).await.unwrap());

    h.engine.reset_seen(REQUESTER_ID).await.unwrap();

    assert_eq!(found_id(&h.engine.next_candidate(&requester, &criteria).await.unwrap()), 13);
    assert_eq!(
        h.engine.next_candidate(&requester, &criteria).await.unwrap(),
        NextCandidate::Exhausted
    );
    assert_eq!(h.coordinator.favorites(REQUESTER_ID).await.unwrap(), vec![11]);
}

#[tokio::test]
async fn test_saved_preferences_replace_defaults() {
    let h = harness(MockTransport::new(), DiscoverySettings::default());
    let requester = create_test_requester();

    assert_eq!(h.engine.criteria_for(&requester).await.unwrap(), default_criteria());

    let preferred = SearchCriteria {
        sex: Sex::Female,
        age_from: 30,
        age_to: 40,
        city: Some(1),
        status: None,
    };
    h.engine.save_preferences(REQUESTER_ID, &preferred).await.unwrap();

    assert_eq!(h.engine.criteria_for(&requester).await.unwrap(), preferred);
    assert_eq!(h.engine.preferences(REQUESTER_ID).await.unwrap(), Some(preferred));
}

#[tokio::test]
async fn test_invalid_preferences_not_saved() {
    let h = harness(MockTransport::new(), DiscoverySettings::default());

    let inverted = SearchCriteria {
        sex: Sex::Female,
        age_from: 40,
        age_to: 30,
        city: None,
        status: None,
    };
    let err = h.engine.save_preferences(REQUESTER_ID, &inverted).await.unwrap_err();

    assert!(matches!(err, DiscoveryError::InvalidCriteria(_)));
    assert_eq!(h.engine.preferences(REQUESTER_ID).await.unwrap(), None);
}

#[tokio::test]
async fn test_platform_like_state_mirrored_into_log() {
    let transport = MockTransport::new();
    let mut liked = create_test_photo(11, 100, 1_700_000_100, 3);
    liked["likes"]["user_likes"] = serde_json::json!(1);
    let mut withdrawn = create_test_photo(11, 101, 1_700_000_000, 3);
    withdrawn["likes"]["user_likes"] = serde_json::json!(0);
    let mut untouched = create_test_photo(11, 102, 1_600_000_000, 3);
    untouched["likes"]["user_likes"] = serde_json::json!(0);
    transport.set_photos(11, vec![liked, withdrawn, untouched]);
    transport.set_results(vec![create_test_user(11, 1, 28)]);

    let h = harness(transport, DiscoverySettings::default());
    // Liked through the service, later withdrawn directly on the platform
    h.store
        .record_decision(REQUESTER_ID, 11, Some(101), Decision::Liked)
        .await
        .unwrap();

    let outcome = h
        .engine
        .next_candidate(&create_test_requester(), &default_criteria())
        .await
        .unwrap();
    let flags: Vec<(i64, bool)> = outcome
        .candidate()
        .unwrap()
        .photos
        .iter()
        .map(|p| (p.id, p.liked_by_requester))
        .collect();
    assert_eq!(flags, vec![(100, true), (101, false), (102, false)]);

    assert_eq!(
        h.store.get_decision(REQUESTER_ID, 11, Some(100)).await.unwrap(),
        Some(Decision::Liked)
    );
    assert_eq!(
        h.store.get_decision(REQUESTER_ID, 11, Some(101)).await.unwrap(),
        Some(Decision::Unliked)
    );
    assert_eq!(h.store.get_decision(REQUESTER_ID, 11, Some(102)).await.unwrap(), None);
}

#[tokio::test]
async fn test_requester_profile_served_from_cache() {
    let mock = Arc::new(MockTransport::new());
    mock.add_profile(serde_json::json!({
        "id": REQUESTER_ID,
        "first_name": "Ivan",
        "last_name": "Petrov",
        "sex": 2,
        "bdate": birth_date_for_age(30)
    }));

    let cache = Arc::new(CacheManager::in_memory(100, 60));
    let engine = DiscoveryEngine::new(
        Arc::new(CachingTransport::new(SharedTransport(Arc::clone(&mock)), cache)),
        Arc::new(InMemoryStore::new()),
        DiscoverySettings::default(),
    );

    let first = engine.resolve_requester(REQUESTER_ID, 5).await.unwrap();
    let second = engine.resolve_requester(REQUESTER_ID, 5).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.count_calls("profiles:"), 1);
}
