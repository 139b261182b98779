//! Inbound forms and outbound records.
//!
//! Forms carry optional fields exactly as a caller sent them; the managers
//! validate and apply defaults. Output records are flat, denormalized views
//! with keys in websafe form and dates rendered as text. Every output field
//! is filled by an explicit mapping below.

use crate::types::{Conference, Profile, Session, Speaker, TeeShirtSize, format_date, format_time};
use serde::{Deserialize, Serialize};

/// Fields of a conference to create or update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceForm {
    /// Name (required on create)
    pub name: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Topics
    pub topics: Option<Vec<String>>,
    /// City
    pub city: Option<String>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub end_date: Option<String>,
    /// Capacity
    pub max_attendees: Option<i64>,
}

/// Fields of a session to create.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionForm {
    /// Name (required)
    pub name: Option<String>,
    /// Highlights
    pub highlights: Option<String>,
    /// Speaker name, required when the speaker is new
    pub speaker_name: Option<String>,
    /// Speaker email (required)
    pub speaker_email: Option<String>,
    /// Minutes; defaults to 0
    pub duration: Option<i64>,
    /// Type tag
    pub type_of_session: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// `HH:MM`; defaults to `00:00`
    pub start_time: Option<String>,
}

/// Profile fields a caller may change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    /// New display name
    pub display_name: Option<String>,
    /// New shirt size, by wire name
    pub tee_shirt_size: Option<String>,
}

/// A conference joined with its organizer's display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ConferenceOutput {
    pub websafe_key: String,
    pub name: String,
    pub description: Option<String>,
    pub organizer_display_name: String,
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub month: i64,
    pub max_attendees: i64,
    pub seats_available: i64,
}

impl ConferenceOutput {
    /// Map a conference; `organizer_display_name` is empty when the
    /// organizer's profile is gone.
    #[must_use]
    pub fn new(conference: &Conference, organizer_display_name: String) -> Self {
        Self {
            websafe_key: conference.key.urlsafe(),
            name: conference.name.clone(),
            description: conference.description.clone(),
            organizer_display_name,
            topics: conference.topics.clone(),
            city: conference.city.clone(),
            start_date: conference.start_date.map(format_date),
            end_date: conference.end_date.map(format_date),
            month: conference.month,
            max_attendees: conference.max_attendees,
            seats_available: conference.seats_available,
        }
    }
}

/// A session joined with its speaker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SessionOutput {
    pub websafe_session_key: String,
    pub name: String,
    pub highlights: Option<String>,
    pub speaker_name: String,
    pub speaker_email: String,
    pub duration: i64,
    pub type_of_session: Option<String>,
    pub date: Option<String>,
    pub start_time: String,
}

impl SessionOutput {
    /// Map a session; the speaker name is empty when the speaker is gone.
    #[must_use]
    pub fn new(session: &Session, speaker: Option<&Speaker>) -> Self {
        Self {
            websafe_session_key: session.key.urlsafe(),
            name: session.name.clone(),
            highlights: session.highlights.clone(),
            speaker_name: speaker.map(|s| s.name.clone()).unwrap_or_default(),
            speaker_email: speaker.map_or_else(|| session.speaker_email.clone(), |s| s.email.clone()),
            duration: session.duration,
            type_of_session: session.type_of_session.clone(),
            date: session.date.map(format_date),
            start_time: format_time(session.start_time),
        }
    }
}

/// A profile as shown to its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ProfileOutput {
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    pub conference_keys_to_attend: Vec<String>,
    pub session_keys_wishlist: Vec<String>,
}

impl From<&Profile> for ProfileOutput {
    fn from(profile: &Profile) -> Self {
        Self {
            display_name: profile.display_name.clone(),
            main_email: profile.main_email.clone(),
            tee_shirt_size: profile.tee_shirt_size,
            conference_keys_to_attend: profile.conferences_to_attend.iter().map(|k| k.urlsafe()).collect(),
            session_keys_wishlist: profile.session_wishlist.iter().map(|k| k.urlsafe()).collect(),
        }
    }
}
