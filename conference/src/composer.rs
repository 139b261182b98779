//! Output composition: joins conferences to organizers and sessions to
//! speakers.
//!
//! Single records resolve their join with one lookup. Lists collect the
//! distinct join keys first, resolve them with one `get_multi`, and match
//! the results back by key. A join target that no longer exists yields an
//! empty name instead of failing the listing.

use crate::error::Result;
use crate::forms::{ConferenceOutput, SessionOutput};
use crate::types::{Conference, Profile, Record, Session, Speaker};
use conference_core::{EntityStore, Key};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Builds denormalized output records.
#[derive(Clone)]
pub struct OutputComposer {
    store: Arc<dyn EntityStore>,
}

impl OutputComposer {
    /// Create a composer reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Compose one conference.
    ///
    /// # Errors
    ///
    /// Store failures, or a malformed organizer profile.
    pub async fn conference(&self, conference: &Conference) -> Result<ConferenceOutput> {
        let organizer = match self.store.get(&conference.organizer_key()).await? {
            Some(entity) => Profile::from_entity(&entity)?.display_name,
            None => String::new(),
        };
        Ok(ConferenceOutput::new(conference, organizer))
    }

    /// Compose a list of conferences with one batched organizer lookup.
    ///
    /// # Errors
    ///
    /// Store failures, or a malformed organizer profile.
    pub async fn conferences(&self, conferences: &[Conference]) -> Result<Vec<ConferenceOutput>> {
        let organizers: HashMap<Key, Profile> = self
            .resolve(conferences.iter().map(Conference::organizer_key))
            .await?;
        Ok(conferences
            .iter()
            .map(|c| {
                let name = organizers
                    .get(&c.organizer_key())
                    .map(|p| p.display_name.clone())
                    .unwrap_or_default();
                ConferenceOutput::new(c, name)
            })
            .collect())
    }

    /// Compose one session.
    ///
    /// # Errors
    ///
    /// Store failures, or a malformed speaker.
    pub async fn session(&self, session: &Session) -> Result<SessionOutput> {
        let speaker = match self.store.get(&session.speaker_key()).await? {
            Some(entity) => Some(Speaker::from_entity(&entity)?),
            None => None,
        };
        Ok(SessionOutput::new(session, speaker.as_ref()))
    }

    /// Compose a list of sessions with one batched speaker lookup.
    ///
    /// # Errors
    ///
    /// Store failures, or a malformed speaker.
    pub async fn sessions(&self, sessions: &[Session]) -> Result<Vec<SessionOutput>> {
        let speakers: HashMap<Key, Speaker> = self
            .resolve(sessions.iter().map(Session::speaker_key))
            .await?;
        Ok(sessions
            .iter()
            .map(|s| SessionOutput::new(s, speakers.get(&s.speaker_key())))
            .collect())
    }

    async fn resolve<R: Record>(&self, keys: impl Iterator<Item = Key>) -> Result<HashMap<Key, R>> {
        let distinct: Vec<Key> = keys.collect::<BTreeSet<_>>().into_iter().collect();
        if distinct.is_empty() {
            return Ok(HashMap::new());
        }
        let found = self.store.get_multi(&distinct).await?;
        let mut resolved = HashMap::with_capacity(distinct.len());
        for (key, entity) in distinct.into_iter().zip(found) {
            if let Some(entity) = entity {
                resolved.insert(key, R::from_entity(&entity)?);
            }
        }
        Ok(resolved)
    }
}
