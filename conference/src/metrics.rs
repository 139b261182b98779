//! Business metrics for the conference service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `conference_conferences_created_total` - Conferences created
//! - `conference_sessions_created_total` - Sessions created
//! - `conference_registrations_total{outcome}` - Registration attempts by outcome
//! - `conference_unregistrations_total` - Seats released by unregistering
//! - `conference_featured_speaker_notices_total` - Featured-speaker notices enqueued
//! - `conference_task_enqueue_failures_total{task}` - Swallowed enqueue failures
//!
//! ## Gauges
//! - `conference_seats_available{conference}` - Seats left, per conference

use metrics::{describe_counter, describe_gauge};

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "conference_conferences_created_total",
        "Total number of conferences created"
    );
    describe_counter!(
        "conference_sessions_created_total",
        "Total number of sessions created"
    );
    describe_counter!(
        "conference_registrations_total",
        "Registration attempts by outcome (registered, already_registered, sold_out)"
    );
    describe_counter!(
        "conference_unregistrations_total",
        "Total number of seats released by unregistering"
    );
    describe_counter!(
        "conference_featured_speaker_notices_total",
        "Featured-speaker notices handed to the task queue"
    );
    describe_counter!(
        "conference_task_enqueue_failures_total",
        "Fire-and-forget tasks the queue refused, by task kind"
    );
    describe_gauge!(
        "conference_seats_available",
        "Seats still available, per conference"
    );

    tracing::info!("Business metrics registered");
}

/// Outcome label of a registration attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Seat booked
    Registered,
    /// Caller already held a seat
    AlreadyRegistered,
    /// No seats left
    SoldOut,
}

impl RegistrationOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::AlreadyRegistered => "already_registered",
            Self::SoldOut => "sold_out",
        }
    }
}

/// Record a conference created.
pub fn record_conference_created(conference: &str, seats: i64) {
    metrics::counter!("conference_conferences_created_total").increment(1);
    record_seats_available(conference, seats);
}

/// Record a session created.
pub fn record_session_created() {
    metrics::counter!("conference_sessions_created_total").increment(1);
}

/// Record a registration attempt.
pub fn record_registration(outcome: RegistrationOutcome) {
    metrics::counter!("conference_registrations_total", "outcome" => outcome.label()).increment(1);
    tracing::debug!(outcome = outcome.label(), "Recorded registration metric");
}

/// Record a released seat.
pub fn record_unregistration() {
    metrics::counter!("conference_unregistrations_total").increment(1);
}

/// Record a featured-speaker notice handed to the queue.
pub fn record_featured_speaker_notice() {
    metrics::counter!("conference_featured_speaker_notices_total").increment(1);
}

/// Record a task the queue refused.
pub fn record_enqueue_failure(task: &'static str) {
    metrics::counter!("conference_task_enqueue_failures_total", "task" => task).increment(1);
}

/// Publish the current seat count of a conference.
#[allow(clippy::cast_precision_loss)] // Seat counts are far below 2^52
pub fn record_seats_available(conference: &str, seats: i64) {
    metrics::gauge!("conference_seats_available", "conference" => conference.to_string())
        .set(seats as f64);
}
