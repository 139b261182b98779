//! Session manager: sessions scoped under conferences, and the queries
//! over them.

use super::{ProfileManager, SpeakerDirectory, enqueue_detached, fetch_all};
use crate::composer::OutputComposer;
use crate::config::ServiceSettings;
use crate::error::{Result, ServiceError};
use crate::forms::{SessionForm, SessionOutput};
use crate::metrics;
use crate::types::{
    CONFERENCE, Conference, Record, SESSION, Session, format_time, parse_date, parse_time,
    require_identity, resolve_websafe,
};
use chrono::NaiveTime;
use conference_core::{
    EntityStore, FilterOp, Identity, Key, PropertyFilter, Query, SortOrder, Task, TaskQueue,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Time-of-day bucket for [`SessionManager::sessions_in_period`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionPeriod {
    /// Starts at or before 12:00
    Morning,
    /// Starts after 12:00, at or before 18:00
    Afternoon,
    /// Starts after 18:00
    Evening,
}

impl SessionPeriod {
    /// Parse a lower-case period name (`morning`, `afternoon`, `evening`).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "morning" => Some(Self::Morning),
            "afternoon" => Some(Self::Afternoon),
            "evening" => Some(Self::Evening),
            _ => None,
        }
    }

    fn filters(self) -> Vec<PropertyFilter> {
        match self {
            Self::Morning => vec![PropertyFilter::new("startTime", FilterOp::LtEq, "12:00")],
            Self::Afternoon => vec![
                PropertyFilter::new("startTime", FilterOp::Gt, "12:00"),
                PropertyFilter::new("startTime", FilterOp::LtEq, "18:00"),
            ],
            Self::Evening => vec![PropertyFilter::new("startTime", FilterOp::Gt, "18:00")],
        }
    }
}

/// Creates sessions and answers session queries.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn EntityStore>,
    tasks: Arc<dyn TaskQueue>,
    speakers: SpeakerDirectory,
    profiles: ProfileManager,
    composer: OutputComposer,
    settings: ServiceSettings,
}

impl SessionManager {
    /// Create a manager.
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        tasks: Arc<dyn TaskQueue>,
        profiles: ProfileManager,
        composer: OutputComposer,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            speakers: SpeakerDirectory::new(Arc::clone(&store)),
            store,
            tasks,
            profiles,
            composer,
            settings,
        }
    }

    /// Create a session under a conference the caller organizes.
    ///
    /// The speaker is looked up by email and created when new. When the
    /// speaker already has another session in this conference, a
    /// featured-speaker notice is enqueued; enqueue failures are logged,
    /// not returned.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    /// - `NotFound`: the conference key is malformed or does not resolve
    /// - `Forbidden`: the caller is not the organizer
    /// - `BadRequest`: missing name, speaker email, or new speaker's name;
    ///   malformed date or start time
    #[tracing::instrument(skip(self, identity, form), fields(user = identity.map(|i| i.user_id.as_str())))]
    pub async fn create_session(
        &self,
        identity: Option<&Identity>,
        websafe_conference_key: &str,
        form: SessionForm,
    ) -> Result<SessionOutput> {
        let identity = require_identity(identity)?;
        let conference = self.load_conference(websafe_conference_key).await?;
        if conference.organizer_user_id != identity.user_id {
            return Err(ServiceError::Forbidden(
                "Only conference organizer can add sessions".to_string(),
            ));
        }

        let name = form
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("Session 'name' field required".to_string()))?;
        let speaker_email = form
            .speaker_email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("Speaker email field required".to_string()))?;
        let date = form
            .date
            .filter(|d| !d.is_empty())
            .map(|d| parse_date("date", &d))
            .transpose()?;
        let start_time = match form.start_time.filter(|t| !t.is_empty()) {
            Some(text) => parse_time("startTime", &text)?,
            None => NaiveTime::default(),
        };

        let speaker = self
            .speakers
            .resolve(&speaker_email, form.speaker_name.as_deref())
            .await?;

        let key = self.store.allocate_key(SESSION, Some(&conference.key)).await?;
        let session = Session {
            key,
            name,
            highlights: form.highlights.filter(|h| !h.is_empty()),
            speaker_email,
            duration: form.duration.unwrap_or(0),
            type_of_session: form.type_of_session.filter(|t| !t.is_empty()),
            date,
            start_time,
        };
        self.store.put(session.to_entity()).await?;

        info!(
            user = %identity.user_id,
            conference = %conference.key,
            session = %session.key,
            speaker = %session.speaker_email,
            "Session created"
        );
        metrics::record_session_created();

        if self.speaker_has_other_sessions(&conference.key, &session).await? {
            enqueue_detached(
                self.tasks.as_ref(),
                Task::SetFeaturedSpeaker {
                    announcement: format!("Featured speaker: {}!!", speaker.name),
                },
            )
            .await;
            metrics::record_featured_speaker_notice();
        }

        Ok(SessionOutput::new(&session, Some(&speaker)))
    }

    /// Fetch one session.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the key is malformed or does not resolve
    pub async fn get_session(&self, websafe_session_key: &str) -> Result<SessionOutput> {
        let key = resolve_websafe(SESSION, websafe_session_key)?;
        let entity = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| ServiceError::not_found(SESSION, &key))?;
        self.composer.session(&Session::from_entity(&entity)?).await
    }

    /// Every session of a conference.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the conference key is malformed or does not resolve
    pub async fn sessions_of_conference(
        &self,
        websafe_conference_key: &str,
    ) -> Result<Vec<SessionOutput>> {
        let conference = self.load_conference(websafe_conference_key).await?;
        self.run(Query::kind(SESSION).ancestor(conference.key)).await
    }

    /// Sessions of a conference with exactly the given type.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the conference key is malformed or does not resolve
    pub async fn sessions_of_conference_by_type(
        &self,
        websafe_conference_key: &str,
        type_of_session: &str,
    ) -> Result<Vec<SessionOutput>> {
        let conference = self.load_conference(websafe_conference_key).await?;
        let query = Query::kind(SESSION)
            .ancestor(conference.key)
            .filter(PropertyFilter::new("typeOfSession", FilterOp::Eq, type_of_session));
        self.run(query).await
    }

    /// Sessions given by one speaker, across all conferences.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn sessions_by_speaker(&self, speaker_email: &str) -> Result<Vec<SessionOutput>> {
        let query = Query::kind(SESSION)
            .filter(PropertyFilter::new("speakerEmail", FilterOp::Eq, speaker_email));
        self.run(query).await
    }

    /// Sessions lasting at most `max_duration` minutes, shortest first.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn sessions_by_max_duration(&self, max_duration: i64) -> Result<Vec<SessionOutput>> {
        let query = Query::kind(SESSION)
            .filter(PropertyFilter::new("duration", FilterOp::LtEq, max_duration))
            .order(SortOrder::ascending("duration"));
        self.run(query).await
    }

    /// Sessions of a conference starting in `period`, by start time.
    ///
    /// An unrecognized period applies no time filter and returns every
    /// session of the conference.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the conference key is malformed or does not resolve
    #[tracing::instrument(skip(self))]
    pub async fn sessions_in_period(
        &self,
        websafe_conference_key: &str,
        period: &str,
    ) -> Result<Vec<SessionOutput>> {
        let conference = self.load_conference(websafe_conference_key).await?;
        let mut query = Query::kind(SESSION).ancestor(conference.key);
        match SessionPeriod::parse(period) {
            Some(period) => {
                for filter in period.filters() {
                    query = query.filter(filter);
                }
            }
            None => debug!(period, "Unknown period, returning all sessions"),
        }
        self.run(query.order(SortOrder::ascending("startTime"))).await
    }

    /// Sessions that are not workshops and start no later than `cutoff`.
    ///
    /// The store serves the type inequality; the start-time bound is
    /// applied afterwards since the store allows one inequality property.
    /// `None` uses the configured cutoff.
    ///
    /// # Errors
    ///
    /// Store failures.
    #[tracing::instrument(skip(self))]
    pub async fn non_workshop_sessions_before(
        &self,
        cutoff: Option<NaiveTime>,
    ) -> Result<Vec<SessionOutput>> {
        let cutoff = cutoff.unwrap_or(self.settings.non_workshop_cutoff);
        let query = Query::kind(SESSION).filter(PropertyFilter::new(
            "typeOfSession",
            FilterOp::Ne,
            self.settings.workshop_session_type.as_str(),
        ));
        let sessions: Vec<Session> = fetch_all(self.store.as_ref(), query).await?;
        let before: Vec<Session> = sessions
            .into_iter()
            .filter(|s| s.start_time <= cutoff)
            .collect();
        debug!(cutoff = %format_time(cutoff), matched = before.len(), "Non-workshop sessions");
        self.composer.sessions(&before).await
    }

    /// Sessions on the caller's wishlist, in wishlist order.
    ///
    /// Sessions deleted since they were added are skipped.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    pub async fn wishlist_sessions(&self, identity: Option<&Identity>) -> Result<Vec<SessionOutput>> {
        let identity = require_identity(identity)?;
        let profile = self.profiles.get_or_create(identity).await?;
        let found = self.store.get_multi(&profile.session_wishlist).await?;
        let sessions = found
            .into_iter()
            .flatten()
            .map(|e| Session::from_entity(&e))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.composer.sessions(&sessions).await
    }

    async fn load_conference(&self, websafe_conference_key: &str) -> Result<Conference> {
        let key = resolve_websafe(CONFERENCE, websafe_conference_key)?;
        let entity = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| ServiceError::not_found(CONFERENCE, &key))?;
        Ok(Conference::from_entity(&entity)?)
    }

    async fn speaker_has_other_sessions(&self, conference: &Key, session: &Session) -> Result<bool> {
        let query = Query::kind(SESSION).ancestor(conference.clone()).filter(PropertyFilter::new(
            "speakerEmail",
            FilterOp::Eq,
            session.speaker_email.as_str(),
        ));
        let same_speaker: Vec<Session> = fetch_all(self.store.as_ref(), query).await?;
        let others = same_speaker.iter().filter(|s| s.key != session.key).count();
        debug!(speaker = %session.speaker_email, others, "Speaker sessions in conference");
        Ok(others > 0)
    }

    async fn run(&self, query: Query) -> Result<Vec<SessionOutput>> {
        let sessions: Vec<Session> = fetch_all(self.store.as_ref(), query).await?;
        self.composer.sessions(&sessions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_names_match_exactly() {
        assert_eq!(SessionPeriod::parse("morning"), Some(SessionPeriod::Morning));
        assert_eq!(SessionPeriod::parse("afternoon"), Some(SessionPeriod::Afternoon));
        assert_eq!(SessionPeriod::parse("evening"), Some(SessionPeriod::Evening));
        assert_eq!(SessionPeriod::parse("Morning"), None);
        assert_eq!(SessionPeriod::parse("AFTERNOON"), None);
        assert_eq!(SessionPeriod::parse("brunch"), None);
    }

    #[test]
    fn afternoon_is_a_half_open_window() {
        let filters = SessionPeriod::Afternoon.filters();
        assert_eq!(filters.len(), 2);
        assert!(filters.iter().all(|f| f.property == "startTime"));
        assert_eq!(filters[0].op, FilterOp::Gt);
        assert_eq!(filters[1].op, FilterOp::LtEq);
    }
}
