//! Conference Central - a conference organization backend.
//!
//! Organizers create conferences and schedule sessions; attendees keep a
//! profile, register for conferences, and wishlist sessions. Everything is
//! stored through the [`conference_core::EntityStore`] contract.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!   Identity ───────▶│        ConferenceApp         │
//!                    └──────────────────────────────┘
//!        │             │            │            │             │
//!        ▼             ▼            ▼            ▼             ▼
//!   ┌─────────┐ ┌────────────┐ ┌──────────┐ ┌──────────┐ ┌─────────────┐
//!   │ Profile │ │ Conference │ │ Register │ │ Session  │ │Announcement │
//!   │ Manager │ │  Manager   │ │  Engine  │ │ Manager  │ │  Service    │
//!   └─────────┘ └────────────┘ └──────────┘ └──────────┘ └─────────────┘
//!        │        │   filters      │           │  speakers       │
//!        │        └──── OutputComposer ────────┘                 │
//!        ▼             ▼            ▼            ▼               ▼
//!   ┌──────────────────────────────────────────────┐  ┌────────────────┐
//!   │                 EntityStore                  │  │ TaskQueue/Cache│
//!   └──────────────────────────────────────────────┘  └────────────────┘
//! ```
//!
//! # Key Features
//!
//! ## 1. Dynamic filter queries
//!
//! [`filters::build_conference_query`] validates caller-supplied clauses and
//! produces a query with at most one inequality property, sorted first by
//! that property and then by name.
//!
//! ## 2. Transactional seat booking
//!
//! [`services::RegistrationEngine`] updates the attendee's profile and the
//! conference's seat count in one transaction. Concurrent registrations for
//! one conference are serialized; `seatsAvailable` never goes negative.
//!
//! ## 3. Batched joins
//!
//! [`composer::OutputComposer`] resolves organizer and speaker names for a
//! whole listing with one multi-get.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod composer;
pub mod config;
pub mod error;
pub mod filters;
pub mod forms;
pub mod metrics;
pub mod services;
pub mod tasks;
pub mod types;

pub use app::ConferenceApp;
pub use config::{Config, ServiceSettings};
pub use error::{ErrorKind, Result, ServiceError};
pub use filters::FilterClause;
pub use forms::{
    ConferenceForm, ConferenceOutput, ProfileForm, ProfileOutput, SessionForm, SessionOutput,
};
pub use tasks::TaskProcessor;
pub use types::TeeShirtSize;
