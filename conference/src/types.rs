//! Domain records and their entity mappings.
//!
//! Each record maps itself to and from a store [`Entity`] field by field.
//! Keys held in list properties (attend-list, wishlist) are stored in their
//! URL-safe form.

use crate::error::{Result, ServiceError};
use chrono::{Datelike, NaiveDate, NaiveTime};
use conference_core::{Entity, EntityStoreError, Identity, Key, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity kind of attendee profiles.
pub const PROFILE: &str = "Profile";
/// Entity kind of conferences.
pub const CONFERENCE: &str = "Conference";
/// Entity kind of sessions.
pub const SESSION: &str = "Session";
/// Entity kind of speakers.
pub const SPEAKER: &str = "Speaker";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Key of the profile owned by `user_id`.
#[must_use]
pub fn profile_key(user_id: &str) -> Key {
    Key::named(PROFILE, user_id)
}

/// Key of the speaker with `email`.
#[must_use]
pub fn speaker_key(email: &str) -> Key {
    Key::named(SPEAKER, email)
}

/// Decode a caller-supplied websafe key of the given kind.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] naming `websafe` when it does not
/// decode or decodes to a key of another kind.
pub fn resolve_websafe(kind: &'static str, websafe: &str) -> Result<Key> {
    match Key::from_urlsafe(websafe) {
        Ok(key) if key.kind() == kind => Ok(key),
        _ => Err(ServiceError::NotFound {
            kind,
            key: websafe.to_string(),
        }),
    }
}

/// Require an authenticated caller.
///
/// # Errors
///
/// Returns [`ServiceError::Unauthenticated`] for `None`.
pub const fn require_identity(identity: Option<&Identity>) -> Result<&Identity> {
    match identity {
        Some(identity) => Ok(identity),
        None => Err(ServiceError::Unauthenticated),
    }
}

/// Parse a `YYYY-MM-DD` date; only the first ten characters are considered.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] naming `field` when the text is not
/// a date.
pub fn parse_date(field: &str, text: &str) -> Result<NaiveDate> {
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, DATE_FORMAT)
        .map_err(|e| ServiceError::BadRequest(format!("'{field}' must be YYYY-MM-DD, got '{text}': {e}")))
}

/// Parse an `HH:MM` time of day.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] naming `field` when the text is not
/// a time.
pub fn parse_time(field: &str, text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), TIME_FORMAT)
        .map_err(|e| ServiceError::BadRequest(format!("'{field}' must be HH:MM, got '{text}': {e}")))
}

/// Render a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Render a time as `HH:MM`.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// A record persisted as one entity kind.
pub trait Record: Sized {
    /// Entity kind
    const KIND: &'static str;

    /// Rebuild the record from a stored entity.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::MalformedEntity`] when a property is
    /// missing or has the wrong type.
    fn from_entity(entity: &Entity) -> std::result::Result<Self, EntityStoreError>;

    /// Map the record to an entity.
    fn to_entity(&self) -> Entity;
}

fn malformed(entity: &Entity, reason: impl Into<String>) -> EntityStoreError {
    EntityStoreError::MalformedEntity {
        kind: entity.key().kind().to_string(),
        key: entity.key().clone(),
        reason: reason.into(),
    }
}

fn required_str(entity: &Entity, name: &str) -> std::result::Result<String, EntityStoreError> {
    entity
        .get_str(name)
        .map(ToString::to_string)
        .ok_or_else(|| malformed(entity, format!("missing text property '{name}'")))
}

fn optional_str(entity: &Entity, name: &str) -> Option<String> {
    entity.get_str(name).map(ToString::to_string)
}

fn required_int(entity: &Entity, name: &str) -> std::result::Result<i64, EntityStoreError> {
    entity
        .get_int(name)
        .ok_or_else(|| malformed(entity, format!("missing integer property '{name}'")))
}

fn optional_date(entity: &Entity, name: &str) -> std::result::Result<Option<NaiveDate>, EntityStoreError> {
    entity
        .get_str(name)
        .map(|text| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map_err(|e| malformed(entity, format!("'{name}': {e}")))
        })
        .transpose()
}

fn key_list(entity: &Entity, name: &str) -> std::result::Result<Vec<Key>, EntityStoreError> {
    entity
        .get_str_list(name)
        .iter()
        .map(|websafe| {
            Key::from_urlsafe(websafe).map_err(|e| malformed(entity, format!("'{name}': {e}")))
        })
        .collect()
}

fn websafe_list(keys: &[Key]) -> Value {
    Value::List(keys.iter().map(|k| Value::Str(k.urlsafe())).collect())
}

// ============================================================================
// Profile
// ============================================================================

/// Shirt size preference of an attendee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum TeeShirtSize {
    #[default]
    NotSpecified,
    XsM,
    XsW,
    SM,
    SW,
    MM,
    MW,
    LM,
    LW,
    XlM,
    XlW,
    XxlM,
    XxlW,
    XxxlM,
    XxxlW,
}

impl TeeShirtSize {
    /// Every size, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::NotSpecified,
        Self::XsM,
        Self::XsW,
        Self::SM,
        Self::SW,
        Self::MM,
        Self::MW,
        Self::LM,
        Self::LW,
        Self::XlM,
        Self::XlW,
        Self::XxlM,
        Self::XxlW,
        Self::XxxlM,
        Self::XxxlW,
    ];

    /// Wire name, e.g. `XL_W`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotSpecified => "NOT_SPECIFIED",
            Self::XsM => "XS_M",
            Self::XsW => "XS_W",
            Self::SM => "S_M",
            Self::SW => "S_W",
            Self::MM => "M_M",
            Self::MW => "M_W",
            Self::LM => "L_M",
            Self::LW => "L_W",
            Self::XlM => "XL_M",
            Self::XlW => "XL_W",
            Self::XxlM => "XXL_M",
            Self::XxlW => "XXL_W",
            Self::XxxlM => "XXXL_M",
            Self::XxxlW => "XXXL_W",
        }
    }
}

impl fmt::Display for TeeShirtSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeeShirtSize {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| ServiceError::BadRequest(format!("Unknown teeShirtSize '{s}'")))
    }
}

/// An attendee profile, keyed by the owner's user id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    /// `Profile:<user id>`
    pub key: Key,
    /// Display name
    pub display_name: String,
    /// Contact email
    pub main_email: String,
    /// Shirt size preference
    pub tee_shirt_size: TeeShirtSize,
    /// Conferences the owner is registered for, unique, in registration order
    pub conferences_to_attend: Vec<Key>,
    /// Sessions of interest, unique, in insertion order
    pub session_wishlist: Vec<Key>,
}

impl Profile {
    /// Fresh profile for a first-time caller.
    #[must_use]
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            key: profile_key(&identity.user_id),
            display_name: identity.nickname.clone(),
            main_email: identity.email.clone(),
            tee_shirt_size: TeeShirtSize::NotSpecified,
            conferences_to_attend: Vec::new(),
            session_wishlist: Vec::new(),
        }
    }

    /// Whether the owner holds a seat at `conference`.
    #[must_use]
    pub fn is_attending(&self, conference: &Key) -> bool {
        self.conferences_to_attend.contains(conference)
    }

    /// Append `conference` to the attend-list; `false` if already present.
    pub fn attend(&mut self, conference: Key) -> bool {
        push_unique(&mut self.conferences_to_attend, conference)
    }

    /// Remove `conference` from the attend-list; `false` if absent.
    pub fn leave(&mut self, conference: &Key) -> bool {
        let before = self.conferences_to_attend.len();
        self.conferences_to_attend.retain(|k| k != conference);
        self.conferences_to_attend.len() != before
    }

    /// Append `session` to the wishlist; `false` if already present.
    pub fn wish(&mut self, session: Key) -> bool {
        push_unique(&mut self.session_wishlist, session)
    }

    /// Empty the wishlist; `true` if it held anything.
    pub fn clear_wishlist(&mut self) -> bool {
        let had_any = !self.session_wishlist.is_empty();
        self.session_wishlist.clear();
        had_any
    }
}

fn push_unique(keys: &mut Vec<Key>, key: Key) -> bool {
    if keys.contains(&key) {
        false
    } else {
        keys.push(key);
        true
    }
}

impl Record for Profile {
    const KIND: &'static str = PROFILE;

    fn from_entity(entity: &Entity) -> std::result::Result<Self, EntityStoreError> {
        let tee_shirt_size = match entity.get_str("teeShirtSize") {
            Some(name) => name
                .parse()
                .map_err(|e: ServiceError| malformed(entity, e.to_string()))?,
            None => TeeShirtSize::NotSpecified,
        };
        Ok(Self {
            key: entity.key().clone(),
            display_name: required_str(entity, "displayName")?,
            main_email: required_str(entity, "mainEmail")?,
            tee_shirt_size,
            conferences_to_attend: key_list(entity, "conferenceKeysToAttend")?,
            session_wishlist: key_list(entity, "sessionKeysWishlist")?,
        })
    }

    fn to_entity(&self) -> Entity {
        Entity::new(self.key.clone())
            .with("displayName", self.display_name.as_str())
            .with("mainEmail", self.main_email.as_str())
            .with("teeShirtSize", self.tee_shirt_size.as_str())
            .with("conferenceKeysToAttend", websafe_list(&self.conferences_to_attend))
            .with("sessionKeysWishlist", websafe_list(&self.session_wishlist))
    }
}

// ============================================================================
// Conference
// ============================================================================

/// A conference, keyed under its organizer's profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conference {
    /// `Profile:<organizer>/Conference:<id>`
    pub key: Key,
    /// Name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// User id of the organizer
    pub organizer_user_id: String,
    /// Topics
    pub topics: Vec<String>,
    /// City
    pub city: Option<String>,
    /// First day
    pub start_date: Option<NaiveDate>,
    /// Last day
    pub end_date: Option<NaiveDate>,
    /// Month of `start_date`, 0 when unknown
    pub month: i64,
    /// Capacity
    pub max_attendees: i64,
    /// Seats left, `0 <= seats_available <= max_attendees`
    pub seats_available: i64,
}

impl Conference {
    /// Key of the organizer's profile.
    #[must_use]
    pub fn organizer_key(&self) -> Key {
        profile_key(&self.organizer_user_id)
    }

    /// Set the start date and recompute `month`.
    pub fn set_start_date(&mut self, start_date: Option<NaiveDate>) {
        self.start_date = start_date;
        self.month = start_date.map_or(0, |d| i64::from(d.month()));
    }

    /// Seats already taken.
    #[must_use]
    pub const fn registered(&self) -> i64 {
        self.max_attendees - self.seats_available
    }

    /// Change capacity, keeping the registered count fixed.
    ///
    /// # Errors
    ///
    /// `BadRequest` when `max_attendees` is negative or below the number of
    /// registered attendees; the conference is left unchanged.
    pub fn set_max_attendees(&mut self, max_attendees: i64) -> Result<()> {
        if max_attendees < 0 {
            return Err(ServiceError::BadRequest(
                "'maxAttendees' must not be negative".to_string(),
            ));
        }
        let registered = self.registered();
        if max_attendees < registered {
            return Err(ServiceError::BadRequest(format!(
                "'maxAttendees' cannot drop below the {registered} registered attendees"
            )));
        }
        self.max_attendees = max_attendees;
        self.seats_available = max_attendees - registered;
        Ok(())
    }
}

impl Record for Conference {
    const KIND: &'static str = CONFERENCE;

    fn from_entity(entity: &Entity) -> std::result::Result<Self, EntityStoreError> {
        Ok(Self {
            key: entity.key().clone(),
            name: required_str(entity, "name")?,
            description: optional_str(entity, "description"),
            organizer_user_id: required_str(entity, "organizerUserId")?,
            topics: entity.get_str_list("topics"),
            city: optional_str(entity, "city"),
            start_date: optional_date(entity, "startDate")?,
            end_date: optional_date(entity, "endDate")?,
            month: entity.get_int("month").unwrap_or(0),
            max_attendees: required_int(entity, "maxAttendees")?,
            seats_available: required_int(entity, "seatsAvailable")?,
        })
    }

    fn to_entity(&self) -> Entity {
        Entity::new(self.key.clone())
            .with("name", self.name.as_str())
            .with("description", self.description.clone())
            .with("organizerUserId", self.organizer_user_id.as_str())
            .with("topics", self.topics.clone())
            .with("city", self.city.clone())
            .with("startDate", self.start_date.map(format_date))
            .with("endDate", self.end_date.map(format_date))
            .with("month", self.month)
            .with("maxAttendees", self.max_attendees)
            .with("seatsAvailable", self.seats_available)
    }
}

// ============================================================================
// Session and Speaker
// ============================================================================

/// A session, keyed under its conference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// `.../Conference:<id>/Session:<id>`
    pub key: Key,
    /// Name
    pub name: String,
    /// Highlights
    pub highlights: Option<String>,
    /// Speaker's email, which names the speaker key
    pub speaker_email: String,
    /// Length in minutes
    pub duration: i64,
    /// Type tag, e.g. `workshop`
    pub type_of_session: Option<String>,
    /// Day
    pub date: Option<NaiveDate>,
    /// Start time
    pub start_time: NaiveTime,
}

impl Session {
    /// Key of the owning conference.
    #[must_use]
    pub fn conference_key(&self) -> Option<Key> {
        self.key.parent()
    }

    /// Key of the speaker.
    #[must_use]
    pub fn speaker_key(&self) -> Key {
        speaker_key(&self.speaker_email)
    }
}

impl Record for Session {
    const KIND: &'static str = SESSION;

    fn from_entity(entity: &Entity) -> std::result::Result<Self, EntityStoreError> {
        let start_time = required_str(entity, "startTime")?;
        Ok(Self {
            key: entity.key().clone(),
            name: required_str(entity, "name")?,
            highlights: optional_str(entity, "highlights"),
            speaker_email: required_str(entity, "speakerEmail")?,
            duration: required_int(entity, "duration")?,
            type_of_session: optional_str(entity, "typeOfSession"),
            date: optional_date(entity, "date")?,
            start_time: NaiveTime::parse_from_str(&start_time, TIME_FORMAT)
                .map_err(|e| malformed(entity, format!("'startTime': {e}")))?,
        })
    }

    fn to_entity(&self) -> Entity {
        Entity::new(self.key.clone())
            .with("name", self.name.as_str())
            .with("highlights", self.highlights.clone())
            .with("speakerEmail", self.speaker_email.as_str())
            .with("duration", self.duration)
            .with("typeOfSession", self.type_of_session.clone())
            .with("date", self.date.map(format_date))
            .with("startTime", format_time(self.start_time))
    }
}

/// A speaker, keyed by email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Speaker {
    /// `Speaker:<email>`
    pub key: Key,
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
}

impl Record for Speaker {
    const KIND: &'static str = SPEAKER;

    fn from_entity(entity: &Entity) -> std::result::Result<Self, EntityStoreError> {
        Ok(Self {
            key: entity.key().clone(),
            name: required_str(entity, "name")?,
            email: required_str(entity, "email")?,
        })
    }

    fn to_entity(&self) -> Entity {
        Entity::new(self.key.clone())
            .with("name", self.name.as_str())
            .with("email", self.email.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn conference() -> Conference {
        Conference {
            key: profile_key("org").child_id(CONFERENCE, 1),
            name: "RustConf".to_string(),
            description: None,
            organizer_user_id: "org".to_string(),
            topics: vec!["Rust".to_string()],
            city: Some("Portland".to_string()),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            end_date: None,
            month: 6,
            max_attendees: 10,
            seats_available: 4,
        }
    }

    #[test]
    fn records_survive_the_store_mapping() {
        let conference = conference();
        assert_eq!(Conference::from_entity(&conference.to_entity()).unwrap(), conference);

        let session = Session {
            key: conference.key.child_id(SESSION, 2),
            name: "Ownership".to_string(),
            highlights: None,
            speaker_email: "ada@example.com".to_string(),
            duration: 45,
            type_of_session: Some("lecture".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 6, 2),
            start_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        };
        let entity = session.to_entity();
        assert_eq!(entity.get_str("startTime"), Some("09:30"));
        assert_eq!(Session::from_entity(&entity).unwrap(), session);
        assert_eq!(session.conference_key(), Some(conference.key));
    }

    #[test]
    fn profile_lists_stay_unique() {
        let mut profile = Profile::for_identity(&Identity::new("amy", "amy@example.com", "Amy"));
        let conference = conference().key;

        assert!(profile.attend(conference.clone()));
        assert!(!profile.attend(conference.clone()));
        assert!(profile.is_attending(&conference));

        let restored = Profile::from_entity(&profile.to_entity()).unwrap();
        assert_eq!(restored.conferences_to_attend, vec![conference.clone()]);

        assert!(profile.leave(&conference));
        assert!(!profile.leave(&conference));
        assert!(!profile.clear_wishlist());
    }

    #[test]
    fn capacity_changes_keep_registered_count() {
        let mut c = conference();
        assert_eq!(c.registered(), 6);

        c.set_max_attendees(20).unwrap();
        assert_eq!(c.seats_available, 14);

        c.set_max_attendees(6).unwrap();
        assert_eq!(c.seats_available, 0);

        assert!(matches!(c.set_max_attendees(5), Err(ServiceError::BadRequest(_))));
        assert!(matches!(c.set_max_attendees(-1), Err(ServiceError::BadRequest(_))));
        assert_eq!((c.max_attendees, c.seats_available), (6, 0));
    }

    #[test]
    fn start_date_drives_month() {
        let mut c = conference();
        c.set_start_date(NaiveDate::from_ymd_opt(2026, 11, 3));
        assert_eq!(c.month, 11);
        c.set_start_date(None);
        assert_eq!(c.month, 0);
    }

    #[test]
    fn dates_and_times_parse_strictly() {
        assert_eq!(
            parse_date("startDate", "2026-06-01T10:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
        );
        assert!(parse_date("startDate", "06/01/2026").is_err());
        assert_eq!(format_time(parse_time("startTime", "18:05").unwrap()), "18:05");
        assert!(parse_time("startTime", "6pm").is_err());
    }

    #[test]
    fn tee_shirt_sizes_parse_by_wire_name() {
        assert_eq!("XXL_W".parse::<TeeShirtSize>().unwrap(), TeeShirtSize::XxlW);
        assert!("HUGE".parse::<TeeShirtSize>().is_err());
        for size in TeeShirtSize::ALL {
            assert_eq!(size.as_str().parse::<TeeShirtSize>().unwrap(), size);
        }
    }

    #[test]
    fn websafe_keys_must_decode_to_the_right_kind() {
        let key = profile_key("org").child_id(CONFERENCE, 1);
        assert_eq!(resolve_websafe(CONFERENCE, &key.urlsafe()).unwrap(), key);
        assert!(matches!(
            resolve_websafe(SESSION, &key.urlsafe()),
            Err(ServiceError::NotFound { kind: "Session", .. })
        ));
        assert!(resolve_websafe(CONFERENCE, "garbage").is_err());
    }
}
