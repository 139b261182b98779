//! Conference Central Demo
//!
//! Walks through the main flows over in-memory collaborators:
//! - Conference creation and filtered search
//! - Seat booking until the conference is sold out
//! - Sessions, featured-speaker detection, and period queries
//! - Wishlists
//! - Draining the task queue (confirmation mail, featured speaker)
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//! RUST_LOG=debug cargo run --bin demo
//! ```

use conference_central::{
    Config, ConferenceApp, ConferenceForm, FilterClause, SessionForm, TaskProcessor,
    metrics::register_business_metrics,
};
use conference_testing::{
    ConsoleMailer, InMemoryAnnouncementCache, InMemoryEntityStore, InMemoryTaskQueue,
    test_identity,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,conference_central=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n🎤 ============================================");
    println!("   Conference Central - Live Demo");
    println!("============================================\n");

    let config = Config::from_env();
    register_business_metrics();

    println!("⚙️  Initializing application...");
    let store = Arc::new(InMemoryEntityStore::new());
    let queue = Arc::new(InMemoryTaskQueue::new());
    let cache = Arc::new(InMemoryAnnouncementCache::new());
    let app = ConferenceApp::new(
        store.clone(),
        queue.clone(),
        cache.clone(),
        config.services.clone(),
    );
    let processor = TaskProcessor::new(cache, Arc::new(ConsoleMailer::new()));

    let refresher = {
        let announcements = app.announcements.clone();
        let period = Duration::from_secs(config.announcement_refresh_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(error) = announcements.refresh_announcement().await {
                    tracing::warn!(error = %error, "Announcement refresh failed");
                }
            }
        })
    };
    println!("✓ Application started\n");

    let organizer = test_identity("organizer");
    let alice = test_identity("alice");
    let bob = test_identity("bob");
    let carol = test_identity("carol");

    // ========== Seat booking ==========

    println!("1️⃣  Creating conferences...");
    let tiny = app
        .conferences
        .create_conference(
            Some(&organizer),
            ConferenceForm {
                name: Some("Tiny RustConf".to_string()),
                city: Some("Lisbon".to_string()),
                topics: Some(vec!["Rust".to_string(), "Systems".to_string()]),
                start_date: Some("2026-06-12".to_string()),
                max_attendees: Some(2),
                ..ConferenceForm::default()
            },
        )
        .await?;
    let big = app
        .conferences
        .create_conference(
            Some(&organizer),
            ConferenceForm {
                name: Some("Async Summit".to_string()),
                city: Some("Berlin".to_string()),
                topics: Some(vec!["Async".to_string()]),
                start_date: Some("2026-06-20".to_string()),
                max_attendees: Some(120),
                ..ConferenceForm::default()
            },
        )
        .await?;
    println!("   ✓ {} ({} seats)", tiny.name, tiny.seats_available);
    println!("   ✓ {} ({} seats)\n", big.name, big.seats_available);

    println!("2️⃣  Registering attendees for {}...", tiny.name);
    for attendee in [&alice, &bob, &carol] {
        match app.registration.register(Some(attendee), &tiny.websafe_key).await {
            Ok(_) => println!("   ✓ {} registered", attendee.nickname),
            Err(error) => println!("   ✗ {} rejected: {error}", attendee.nickname),
        }
    }
    let seats = app.conferences.get_conference(&tiny.websafe_key).await?.seats_available;
    println!("   Seats left: {seats}");

    app.registration.unregister(Some(&alice), &tiny.websafe_key).await?;
    let seats = app.conferences.get_conference(&tiny.websafe_key).await?.seats_available;
    println!("   ✓ alice unregistered, seats left: {seats}\n");

    // ========== Filtered search ==========

    println!("3️⃣  Searching conferences (month = 6, maxAttendees > 50)...");
    let found = app
        .conferences
        .query_conferences(&[
            FilterClause::new("month", "EQ", "6"),
            FilterClause::new("maxAttendees", "GT", "50"),
        ])
        .await?;
    for conference in &found {
        println!("   • {} in {:?}", conference.name, conference.city);
    }
    match app
        .conferences
        .query_conferences(&[
            FilterClause::new("city", "GT", "B"),
            FilterClause::new("topic", "LT", "M"),
        ])
        .await
    {
        Ok(_) => println!("   ✗ two inequality fields were accepted"),
        Err(error) => println!("   ✓ rejected: {error}"),
    }
    println!();

    // ========== Sessions ==========

    println!("4️⃣  Scheduling sessions for {}...", big.name);
    let sessions = [
        ("Ownership in Practice", "09:30", Some("lecture")),
        ("Tokio Deep Dive", "14:00", Some("workshop")),
        ("Pinning Explained", "18:30", None),
    ];
    for (name, start, kind) in sessions {
        let created = app
            .sessions
            .create_session(
                Some(&organizer),
                &big.websafe_key,
                SessionForm {
                    name: Some(name.to_string()),
                    speaker_name: Some("Ada".to_string()),
                    speaker_email: Some("ada@example.com".to_string()),
                    duration: Some(45),
                    type_of_session: kind.map(str::to_string),
                    start_time: Some(start.to_string()),
                    ..SessionForm::default()
                },
            )
            .await?;
        println!("   ✓ {} at {} by {}", created.name, created.start_time, created.speaker_name);

        app.profiles
            .add_to_wishlist(Some(&bob), &created.websafe_session_key)
            .await?;
    }

    let afternoon = app.sessions.sessions_in_period(&big.websafe_key, "afternoon").await?;
    println!("   Afternoon sessions: {}", afternoon.len());
    let non_workshop = app.sessions.non_workshop_sessions_before(None).await?;
    println!("   Non-workshop sessions before cutoff: {}", non_workshop.len());
    let wishlist = app.sessions.wishlist_sessions(Some(&bob)).await?;
    println!("   bob's wishlist: {} sessions\n", wishlist.len());

    // ========== Background work ==========

    println!("5️⃣  Processing queued tasks...");
    for task in queue.drain() {
        let kind = task.kind();
        if let Err(error) = processor.process(task).await {
            println!("   ✗ {kind} failed: {error}");
        }
    }

    app.registration.register(Some(&alice), &big.websafe_key).await?;
    let announcement = app.announcements.refresh_announcement().await?;
    println!("   Announcement: {announcement}");
    println!("   Featured: {}", app.announcements.get_featured_speaker().await?);
    println!("   Entities stored: {}\n", store.len());

    refresher.abort();
    println!("✓ Demo complete");
    Ok(())
}
