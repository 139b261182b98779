//! Conference manager: create, update, fetch, and search conferences.

use super::{ProfileManager, enqueue_detached, fetch_all};
use crate::composer::OutputComposer;
use crate::error::{Result, ServiceError};
use crate::filters::{FilterClause, build_conference_query};
use crate::forms::{ConferenceForm, ConferenceOutput};
use crate::metrics;
use crate::types::{
    CONFERENCE, Conference, Record, parse_date, profile_key, require_identity, resolve_websafe,
};
use conference_core::{EntityStore, Identity, Query, SortOrder, Task, TaskQueue};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_CITY: &str = "Default City";
const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Creates, updates, and searches conferences.
#[derive(Clone)]
pub struct ConferenceManager {
    store: Arc<dyn EntityStore>,
    tasks: Arc<dyn TaskQueue>,
    profiles: ProfileManager,
    composer: OutputComposer,
}

impl ConferenceManager {
    /// Create a manager.
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        tasks: Arc<dyn TaskQueue>,
        profiles: ProfileManager,
        composer: OutputComposer,
    ) -> Self {
        Self {
            store,
            tasks,
            profiles,
            composer,
        }
    }

    /// Create a conference owned by the caller.
    ///
    /// Omitted fields default to city `Default City`, topics
    /// `["Default", "Topic"]`, and zero capacity. All seats start free.
    /// A confirmation mail task is enqueued afterwards; enqueue failures
    /// are logged, not returned.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    /// - `BadRequest`: missing name, malformed date, negative capacity
    #[tracing::instrument(skip(self, identity, form), fields(user = identity.map(|i| i.user_id.as_str())))]
    pub async fn create_conference(
        &self,
        identity: Option<&Identity>,
        form: ConferenceForm,
    ) -> Result<ConferenceOutput> {
        let identity = require_identity(identity)?;
        let name = non_empty(form.name)
            .ok_or_else(|| ServiceError::BadRequest("Conference 'name' field required".to_string()))?;
        let start_date = non_empty(form.start_date)
            .map(|d| parse_date("startDate", &d))
            .transpose()?;
        let end_date = non_empty(form.end_date)
            .map(|d| parse_date("endDate", &d))
            .transpose()?;
        let max_attendees = form.max_attendees.unwrap_or(0);
        if max_attendees < 0 {
            return Err(ServiceError::BadRequest(
                "'maxAttendees' must not be negative".to_string(),
            ));
        }
        let topics = form
            .topics
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOPICS.map(String::from).to_vec());

        let profile = self.profiles.get_or_create(identity).await?;
        let key = self.store.allocate_key(CONFERENCE, Some(&profile.key)).await?;

        let mut conference = Conference {
            key,
            name,
            description: non_empty(form.description),
            organizer_user_id: identity.user_id.clone(),
            topics,
            city: Some(non_empty(form.city).unwrap_or_else(|| DEFAULT_CITY.to_string())),
            start_date: None,
            end_date,
            month: 0,
            max_attendees,
            seats_available: max_attendees,
        };
        conference.set_start_date(start_date);
        self.store.put(conference.to_entity()).await?;

        info!(
            user = %identity.user_id,
            conference = %conference.key,
            name = %conference.name,
            "Conference created"
        );
        metrics::record_conference_created(&conference.key.urlsafe(), conference.seats_available);

        let output = ConferenceOutput::new(&conference, profile.display_name);
        enqueue_detached(
            self.tasks.as_ref(),
            Task::SendConfirmationEmail {
                email: identity.email.clone(),
                conference_info: serde_json::to_string_pretty(&output).unwrap_or_default(),
            },
        )
        .await;
        Ok(output)
    }

    /// Update a conference owned by the caller.
    ///
    /// Only non-empty fields overwrite stored values. A new start date
    /// recomputes the month; a new capacity shifts the free seats by the
    /// same amount, never below zero.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    /// - `NotFound`: the key is malformed or does not resolve
    /// - `Forbidden`: the caller is not the organizer
    /// - `BadRequest`: malformed date, negative capacity
    #[tracing::instrument(skip(self, identity, form), fields(user = identity.map(|i| i.user_id.as_str())))]
    pub async fn update_conference(
        &self,
        identity: Option<&Identity>,
        websafe_conference_key: &str,
        form: ConferenceForm,
    ) -> Result<ConferenceOutput> {
        let identity = require_identity(identity)?;
        let key = resolve_websafe(CONFERENCE, websafe_conference_key)?;

        let mut txn = self.store.begin_transaction(std::slice::from_ref(&key)).await?;
        let entity = txn
            .get(&key)
            .await?
            .ok_or_else(|| ServiceError::not_found(CONFERENCE, &key))?;
        let mut conference = Conference::from_entity(&entity)?;
        if conference.organizer_user_id != identity.user_id {
            return Err(ServiceError::Forbidden(
                "Only the owner can update the conference".to_string(),
            ));
        }

        if let Some(name) = non_empty(form.name) {
            conference.name = name;
        }
        if let Some(description) = non_empty(form.description) {
            conference.description = Some(description);
        }
        if let Some(topics) = form.topics.filter(|t| !t.is_empty()) {
            conference.topics = topics;
        }
        if let Some(city) = non_empty(form.city) {
            conference.city = Some(city);
        }
        if let Some(start) = non_empty(form.start_date) {
            conference.set_start_date(Some(parse_date("startDate", &start)?));
        }
        if let Some(end) = non_empty(form.end_date) {
            conference.end_date = Some(parse_date("endDate", &end)?);
        }
        if let Some(max_attendees) = form.max_attendees {
            conference.set_max_attendees(max_attendees)?;
        }

        txn.put(conference.to_entity())?;
        txn.commit().await?;

        info!(user = %identity.user_id, conference = %conference.key, "Conference updated");
        metrics::record_seats_available(&conference.key.urlsafe(), conference.seats_available);
        self.composer.conference(&conference).await
    }

    /// Fetch one conference.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the key is malformed or does not resolve
    pub async fn get_conference(&self, websafe_conference_key: &str) -> Result<ConferenceOutput> {
        let key = resolve_websafe(CONFERENCE, websafe_conference_key)?;
        let entity = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| ServiceError::not_found(CONFERENCE, &key))?;
        self.composer.conference(&Conference::from_entity(&entity)?).await
    }

    /// Conferences organized by the caller, by name.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    pub async fn conferences_created(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<ConferenceOutput>> {
        let identity = require_identity(identity)?;
        let query = Query::kind(CONFERENCE)
            .ancestor(profile_key(&identity.user_id))
            .order(SortOrder::ascending("name"));
        let conferences: Vec<Conference> = fetch_all(self.store.as_ref(), query).await?;
        self.composer.conferences(&conferences).await
    }

    /// Search conferences with caller-supplied filter clauses.
    ///
    /// # Errors
    ///
    /// - `InvalidQuery`: unknown field or operator, malformed number
    /// - `UnsupportedQuery`: inequalities on two different fields
    #[tracing::instrument(skip(self))]
    pub async fn query_conferences(&self, clauses: &[FilterClause]) -> Result<Vec<ConferenceOutput>> {
        let query = build_conference_query(clauses)?;
        debug!(filters = query.filters.len(), "Running conference query");
        let conferences: Vec<Conference> = fetch_all(self.store.as_ref(), query).await?;
        self.composer.conferences(&conferences).await
    }

    /// Conferences the caller is registered for, in registration order.
    ///
    /// Conferences deleted since registering are skipped.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    pub async fn conferences_to_attend(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<ConferenceOutput>> {
        let identity = require_identity(identity)?;
        let profile = self.profiles.get_or_create(identity).await?;
        let found = self.store.get_multi(&profile.conferences_to_attend).await?;
        let conferences = found
            .into_iter()
            .flatten()
            .map(|e| Conference::from_entity(&e))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.composer.conferences(&conferences).await
    }
}
