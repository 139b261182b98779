//! Seat booking: the end-to-end scenario, round trips, and failure paths.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use conference_central::{
    ConferenceApp, ConferenceForm, ConferenceOutput, ErrorKind, ServiceError, ServiceSettings,
};
use conference_core::Identity;
use conference_testing::{
    InMemoryAnnouncementCache, InMemoryEntityStore, InMemoryTaskQueue, test_identity,
};
use proptest::prelude::*;
use std::sync::Arc;

struct Harness {
    store: Arc<InMemoryEntityStore>,
    app: ConferenceApp,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryEntityStore::new());
    let app = ConferenceApp::new(
        store.clone(),
        Arc::new(InMemoryTaskQueue::new()),
        Arc::new(InMemoryAnnouncementCache::new()),
        ServiceSettings::default(),
    );
    Harness { store, app }
}

async fn conference(app: &ConferenceApp, organizer: &Identity, max_attendees: i64) -> ConferenceOutput {
    app.conferences
        .create_conference(
            Some(organizer),
            ConferenceForm {
                name: Some("RustConf".to_string()),
                max_attendees: Some(max_attendees),
                ..ConferenceForm::default()
            },
        )
        .await
        .unwrap()
}

async fn seats(app: &ConferenceApp, websafe_key: &str) -> i64 {
    app.conferences
        .get_conference(websafe_key)
        .await
        .unwrap()
        .seats_available
}

async fn attending(app: &ConferenceApp, identity: &Identity) -> Vec<String> {
    app.profiles
        .get_profile(Some(identity))
        .await
        .unwrap()
        .conference_keys_to_attend
}

#[tokio::test]
async fn two_seat_conference_scenario() {
    let Harness { app, .. } = harness();
    let organizer = test_identity("organizer");
    let (a, b, c) = (test_identity("a"), test_identity("b"), test_identity("c"));

    let conf = conference(&app, &organizer, 2).await;
    assert_eq!(conf.seats_available, 2);

    assert!(app.registration.register(Some(&a), &conf.websafe_key).await.unwrap());
    assert_eq!(seats(&app, &conf.websafe_key).await, 1);

    assert!(app.registration.register(Some(&b), &conf.websafe_key).await.unwrap());
    assert_eq!(seats(&app, &conf.websafe_key).await, 0);

    let rejected = app.registration.register(Some(&c), &conf.websafe_key).await;
    assert!(matches!(&rejected, Err(ServiceError::Conflict(msg)) if msg == "no seats available"));
    assert_eq!(seats(&app, &conf.websafe_key).await, 0);
    assert!(attending(&app, &c).await.is_empty());

    assert!(app.registration.unregister(Some(&a), &conf.websafe_key).await.unwrap());
    assert_eq!(seats(&app, &conf.websafe_key).await, 1);
}

#[tokio::test]
async fn register_then_unregister_restores_state() {
    let Harness { app, .. } = harness();
    let organizer = test_identity("organizer");
    let alice = test_identity("alice");
    let conf = conference(&app, &organizer, 10).await;

    app.registration.register(Some(&alice), &conf.websafe_key).await.unwrap();
    assert_eq!(attending(&app, &alice).await, vec![conf.websafe_key.clone()]);

    assert!(app.registration.unregister(Some(&alice), &conf.websafe_key).await.unwrap());
    assert_eq!(seats(&app, &conf.websafe_key).await, 10);
    assert!(attending(&app, &alice).await.is_empty());
}

#[tokio::test]
async fn double_registration_decrements_once() {
    let Harness { app, .. } = harness();
    let organizer = test_identity("organizer");
    let alice = test_identity("alice");
    let conf = conference(&app, &organizer, 3).await;

    app.registration.register(Some(&alice), &conf.websafe_key).await.unwrap();
    let second = app.registration.register(Some(&alice), &conf.websafe_key).await;

    assert!(matches!(&second, Err(ServiceError::Conflict(msg)) if msg == "already registered"));
    assert_eq!(seats(&app, &conf.websafe_key).await, 2);
    assert_eq!(attending(&app, &alice).await.len(), 1);
}

#[tokio::test]
async fn unregister_without_registration_is_a_no_op() {
    let Harness { app, .. } = harness();
    let organizer = test_identity("organizer");
    let alice = test_identity("alice");
    let conf = conference(&app, &organizer, 3).await;

    assert!(!app.registration.unregister(Some(&alice), &conf.websafe_key).await.unwrap());
    assert!(!app.registration.unregister(Some(&alice), &conf.websafe_key).await.unwrap());
    assert_eq!(seats(&app, &conf.websafe_key).await, 3);
}

#[tokio::test]
async fn unknown_or_malformed_conference_is_not_found() {
    let Harness { app, .. } = harness();
    let alice = test_identity("alice");
    let organizer = test_identity("organizer");
    let conf = conference(&app, &organizer, 3).await;

    // A well-formed key of the right kind that was never stored.
    let missing = conference_core::Key::named("Profile", "organizer")
        .child_id("Conference", 9_999)
        .urlsafe();
    let err = app.registration.register(Some(&alice), &missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = app.registration.register(Some(&alice), "not-a-key!").await.unwrap_err();
    assert!(matches!(&err, ServiceError::NotFound { key, .. } if key == "not-a-key!"));

    // A session-shaped key is the wrong kind for registration.
    let wrong_kind = conference_core::Key::from_urlsafe(&conf.websafe_key)
        .unwrap()
        .child_id("Session", 1)
        .urlsafe();
    let err = app.registration.unregister(Some(&alice), &wrong_kind).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn first_visit_keeps_the_profile_when_booking_fails() {
    let Harness { store, app } = harness();
    let organizer = test_identity("organizer");
    let full = conference(&app, &organizer, 0).await;
    let missing = conference_core::Key::named("Profile", "organizer")
        .child_id("Conference", 9_999)
        .urlsafe();
    let profiles = || store.entities_of_kind("Profile").len();
    assert_eq!(profiles(), 1);

    let err = app
        .registration
        .register(Some(&test_identity("a")), &missing)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(profiles(), 2);

    let err = app
        .registration
        .register(Some(&test_identity("b")), "not-a-key!")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(profiles(), 3);

    let err = app
        .registration
        .register(Some(&test_identity("c")), &full.websafe_key)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(profiles(), 4);

    let left = app
        .registration
        .unregister(Some(&test_identity("d")), &full.websafe_key)
        .await
        .unwrap();
    assert!(!left);
    assert_eq!(profiles(), 5);

    assert!(attending(&app, &test_identity("c")).await.is_empty());
    assert_eq!(seats(&app, &full.websafe_key).await, 0);
}

#[tokio::test]
async fn anonymous_callers_are_rejected() {
    let Harness { app, .. } = harness();
    let organizer = test_identity("organizer");
    let conf = conference(&app, &organizer, 3).await;

    let err = app.registration.register(None, &conf.websafe_key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    let err = app.registration.unregister(None, &conf.websafe_key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert_eq!(seats(&app, &conf.websafe_key).await, 3);
}

#[tokio::test]
async fn failed_commit_leaves_profile_and_seats_untouched() {
    let Harness { store, app } = harness();
    let organizer = test_identity("organizer");
    let alice = test_identity("alice");
    let conf = conference(&app, &organizer, 3).await;
    app.profiles.get_profile(Some(&alice)).await.unwrap();

    store.set_fail_commits(true);
    let err = app.registration.register(Some(&alice), &conf.websafe_key).await.unwrap_err();
    store.set_fail_commits(false);

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(seats(&app, &conf.websafe_key).await, 3);
    assert!(attending(&app, &alice).await.is_empty());
}

#[tokio::test]
async fn conferences_to_attend_follow_registrations() {
    let Harness { app, .. } = harness();
    let organizer = test_identity("organizer");
    let alice = test_identity("alice");
    let first = conference(&app, &organizer, 3).await;
    let second = conference(&app, &organizer, 3).await;

    app.registration.register(Some(&alice), &second.websafe_key).await.unwrap();
    app.registration.register(Some(&alice), &first.websafe_key).await.unwrap();

    let keys: Vec<String> = app
        .conferences
        .conferences_to_attend(Some(&alice))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.websafe_key)
        .collect();
    assert_eq!(keys, vec![second.websafe_key, first.websafe_key]);
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any interleaving of register and unregister by a few attendees
    /// keeps seats equal to capacity minus current registrations.
    #[test]
    fn seats_track_registrations(
        capacity in 0_i64..4,
        steps in prop::collection::vec((0_usize..3, any::<bool>()), 0..16),
    ) {
        runtime().block_on(async {
            let Harness { app, .. } = harness();
            let organizer = test_identity("organizer");
            let attendees = [test_identity("a"), test_identity("b"), test_identity("c")];
            let conf = conference(&app, &organizer, capacity).await;
            let mut registered = [false; 3];

            for (who, register) in steps {
                let identity = Some(&attendees[who]);
                if register {
                    let result = app.registration.register(identity, &conf.websafe_key).await;
                    let held = i64::try_from(registered.iter().filter(|r| **r).count()).unwrap();
                    if registered[who] || held >= capacity {
                        assert!(result.is_err());
                    } else {
                        assert!(result.unwrap());
                        registered[who] = true;
                    }
                } else {
                    let released = app
                        .registration
                        .unregister(identity, &conf.websafe_key)
                        .await
                        .unwrap();
                    assert_eq!(released, registered[who]);
                    registered[who] = false;
                }

                let held = i64::try_from(registered.iter().filter(|r| **r).count()).unwrap();
                let left = seats(&app, &conf.websafe_key).await;
                assert_eq!(left, capacity - held);
                assert!(left >= 0);
            }
        });
    }
}
