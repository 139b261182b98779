//! Concurrency stress tests for last-seat scenarios.
//!
//! Many attendees race for fewer seats than there are attendees. Exactly as
//! many registrations succeed as there were seats, and the count never goes
//! negative.
//!
//! Run with: `cargo test --test concurrency_stress_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect

use conference_central::{ConferenceApp, ConferenceForm, ConferenceOutput, ServiceError, ServiceSettings};
use conference_testing::{
    InMemoryAnnouncementCache, InMemoryEntityStore, InMemoryTaskQueue, test_identity,
};
use futures::future::join_all;
use std::sync::Arc;

fn app() -> ConferenceApp {
    ConferenceApp::new(
        Arc::new(InMemoryEntityStore::new()),
        Arc::new(InMemoryTaskQueue::new()),
        Arc::new(InMemoryAnnouncementCache::new()),
        ServiceSettings::default(),
    )
}

async fn conference(app: &ConferenceApp, name: &str, seats: i64) -> ConferenceOutput {
    app.conferences
        .create_conference(
            Some(&test_identity("organizer")),
            ConferenceForm {
                name: Some(name.to_string()),
                max_attendees: Some(seats),
                ..ConferenceForm::default()
            },
        )
        .await
        .unwrap()
}

/// Spawn one registration per attendee and count (successes, sold-out).
async fn race(app: &ConferenceApp, websafe_key: &str, prefix: &str, attendees: usize) -> (usize, usize) {
    let handles = (0..attendees).map(|i| {
        let app = app.clone();
        let key = websafe_key.to_string();
        let identity = test_identity(&format!("{prefix}-{i}"));
        tokio::spawn(async move { app.registration.register(Some(&identity), &key).await })
    });

    let mut succeeded = 0;
    let mut sold_out = 0;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(true) => succeeded += 1,
            Err(ServiceError::Conflict(msg)) if msg == "no seats available" => sold_out += 1,
            other => panic!("unexpected registration result: {other:?}"),
        }
    }
    (succeeded, sold_out)
}

/// Test: 100 concurrent registrations for 10 seats.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_last_seats_concurrency_100_requests() {
    println!("🧪 Concurrency Stress Test: 100 concurrent requests for 10 seats");
    let app = app();
    let conf = conference(&app, "Tiny RustConf", 10).await;

    let (succeeded, sold_out) = race(&app, &conf.websafe_key, "attendee", 100).await;
    println!("  ✓ {succeeded} succeeded, {sold_out} sold out");

    assert_eq!(succeeded, 10);
    assert_eq!(sold_out, 90);
    let after = app.conferences.get_conference(&conf.websafe_key).await.unwrap();
    assert_eq!(after.seats_available, 0);
}

/// Test: one seat, 50 contenders.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_single_last_seat() {
    let app = app();
    let conf = conference(&app, "One Seat", 1).await;

    let (succeeded, sold_out) = race(&app, &conf.websafe_key, "attendee", 50).await;

    assert_eq!(succeeded, 1);
    assert_eq!(sold_out, 49);
    assert_eq!(
        app.conferences.get_conference(&conf.websafe_key).await.unwrap().seats_available,
        0
    );
}

/// Test: races on different conferences are independent.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_conferences_do_not_interfere() {
    let app = app();
    let first = conference(&app, "First", 5).await;
    let second = conference(&app, "Second", 7).await;

    let (a, b) = tokio::join!(
        race(&app, &first.websafe_key, "first", 30),
        race(&app, &second.websafe_key, "second", 30),
    );

    assert_eq!(a, (5, 25));
    assert_eq!(b, (7, 23));
}

/// Test: the same attendees register for two conferences at once; each
/// profile ends up holding both.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_profile_updates_are_not_lost() {
    let app = app();
    let first = conference(&app, "First", 20).await;
    let second = conference(&app, "Second", 20).await;

    let handles = (0..10).flat_map(|i| {
        [first.websafe_key.clone(), second.websafe_key.clone()].map(|key| {
            let app = app.clone();
            let identity = test_identity(&format!("attendee-{i}"));
            tokio::spawn(async move { app.registration.register(Some(&identity), &key).await })
        })
    });
    for result in join_all(handles).await {
        assert!(result.unwrap().unwrap());
    }

    for i in 0..10 {
        let identity = test_identity(&format!("attendee-{i}"));
        let profile = app.profiles.get_profile(Some(&identity)).await.unwrap();
        assert_eq!(profile.conference_keys_to_attend.len(), 2);
    }
    for key in [&first.websafe_key, &second.websafe_key] {
        assert_eq!(app.conferences.get_conference(key).await.unwrap().seats_available, 10);
    }
}
