//! Registration engine: atomic seat booking across a profile and a
//! conference.
//!
//! # Concurrency
//!
//! Both operations enlist the caller's profile key and the conference key
//! in one transaction. The seat check, the decrement, and the attend-list
//! append are read and written under the conference's lock, so concurrent
//! registrations for one conference are serialized and `seatsAvailable`
//! can never go negative. Registrations for different conferences hold
//! different locks and run in parallel.
//!
//! ```text
//! register:   lock(profile, conference), first visit creates the profile
//!             ├─ conference missing   → NotFound (new profile kept)
//!             ├─ already attending    → Conflict("already registered")
//!             ├─ seats <= 0           → Conflict("no seats available")
//!             └─ attend += key, seats -= 1, commit both
//! unregister: lock(profile, conference), first visit creates the profile
//!             ├─ conference missing   → NotFound (new profile kept)
//!             ├─ not attending        → false (nothing written)
//!             └─ attend -= key, seats += 1, commit both → true
//! ```

use super::load_or_init_profile;
use crate::error::{Result, ServiceError};
use crate::metrics::{self, RegistrationOutcome};
use crate::types::{
    CONFERENCE, Conference, Profile, Record, profile_key, require_identity, resolve_websafe,
};
use conference_core::{EntityStore, Identity, Key, Transaction};
use std::sync::Arc;
use tracing::{debug, info};

/// Books and releases conference seats.
#[derive(Clone)]
pub struct RegistrationEngine {
    store: Arc<dyn EntityStore>,
}

impl RegistrationEngine {
    /// Create an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Register the caller for a conference.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    /// - `NotFound`: the conference key is malformed or does not resolve
    /// - `Conflict`: already registered, or no seats left
    /// - `Store`: the transaction failed; nothing was written
    #[tracing::instrument(skip(self, identity), fields(user = identity.map(|i| i.user_id.as_str())))]
    pub async fn register(
        &self,
        identity: Option<&Identity>,
        websafe_conference_key: &str,
    ) -> Result<bool> {
        let identity = require_identity(identity)?;
        let Enlisted {
            mut txn,
            mut profile,
            profile_created,
            mut conference,
        } = self.enlist(identity, websafe_conference_key).await?;
        let conference_key = conference.key.clone();

        if profile.is_attending(&conference_key) {
            metrics::record_registration(RegistrationOutcome::AlreadyRegistered);
            return Err(ServiceError::Conflict("already registered".to_string()));
        }
        if conference.seats_available <= 0 {
            metrics::record_registration(RegistrationOutcome::SoldOut);
            let error = ServiceError::Conflict("no seats available".to_string());
            return Err(keep_new_profile(txn, &profile, profile_created, error).await);
        }

        profile.attend(conference_key);
        conference.seats_available -= 1;
        txn.put(profile.to_entity())?;
        txn.put(conference.to_entity())?;
        txn.commit().await?;

        info!(
            user = %identity.user_id,
            conference = %conference.key,
            seats_available = conference.seats_available,
            "Registered for conference"
        );
        metrics::record_registration(RegistrationOutcome::Registered);
        metrics::record_seats_available(&conference.key.urlsafe(), conference.seats_available);
        Ok(true)
    }

    /// Release the caller's seat at a conference.
    ///
    /// Returns `false` when the caller was not registered; only a profile
    /// seen for the first time is written then.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    /// - `NotFound`: the conference key is malformed or does not resolve
    /// - `Store`: the transaction failed; nothing was written
    #[tracing::instrument(skip(self, identity), fields(user = identity.map(|i| i.user_id.as_str())))]
    pub async fn unregister(
        &self,
        identity: Option<&Identity>,
        websafe_conference_key: &str,
    ) -> Result<bool> {
        let identity = require_identity(identity)?;
        let Enlisted {
            mut txn,
            mut profile,
            profile_created,
            mut conference,
        } = self.enlist(identity, websafe_conference_key).await?;

        if !profile.leave(&conference.key) {
            debug!(user = %identity.user_id, conference = %conference.key, "Not registered");
            if profile_created {
                txn.put(profile.to_entity())?;
                txn.commit().await?;
            }
            return Ok(false);
        }
        conference.seats_available = (conference.seats_available + 1).min(conference.max_attendees);
        txn.put(profile.to_entity())?;
        txn.put(conference.to_entity())?;
        txn.commit().await?;

        info!(
            user = %identity.user_id,
            conference = %conference.key,
            seats_available = conference.seats_available,
            "Unregistered from conference"
        );
        metrics::record_unregistration();
        metrics::record_seats_available(&conference.key.urlsafe(), conference.seats_available);
        Ok(true)
    }

    /// Lock the caller's profile together with the conference and load both.
    ///
    /// A profile seen for the first time is persisted even when the
    /// conference key is malformed or does not resolve.
    async fn enlist(&self, identity: &Identity, websafe_conference_key: &str) -> Result<Enlisted> {
        let profile_key = profile_key(&identity.user_id);
        let conference_key = match resolve_websafe(CONFERENCE, websafe_conference_key) {
            Ok(key) => key,
            Err(error) => {
                let keys = [profile_key];
                let mut txn = self.store.begin_transaction(&keys).await?;
                let (profile, created) = load_or_init_profile(txn.as_mut(), identity).await?;
                return Err(keep_new_profile(txn, &profile, created, error).await);
            }
        };

        let keys = [profile_key, conference_key.clone()];
        let mut txn = self.store.begin_transaction(&keys).await?;
        let (profile, profile_created) = load_or_init_profile(txn.as_mut(), identity).await?;
        match load_conference(txn.as_mut(), &conference_key).await {
            Ok(conference) => Ok(Enlisted {
                txn,
                profile,
                profile_created,
                conference,
            }),
            Err(error) => Err(keep_new_profile(txn, &profile, profile_created, error).await),
        }
    }
}

/// An open transaction holding the caller's profile and a conference.
struct Enlisted {
    txn: Box<dyn Transaction>,
    profile: Profile,
    profile_created: bool,
    conference: Conference,
}

/// Commit `profile` when this call created it, then hand back `error`.
///
/// A failed commit replaces `error`.
async fn keep_new_profile(
    mut txn: Box<dyn Transaction>,
    profile: &Profile,
    created: bool,
    error: ServiceError,
) -> ServiceError {
    if !created {
        return error;
    }
    if let Err(store_error) = txn.put(profile.to_entity()) {
        return store_error.into();
    }
    match txn.commit().await {
        Ok(()) => error,
        Err(store_error) => store_error.into(),
    }
}

async fn load_conference(txn: &mut dyn Transaction, key: &Key) -> Result<Conference> {
    let entity = txn
        .get(key)
        .await?
        .ok_or_else(|| ServiceError::not_found(CONFERENCE, key))?;
    Ok(Conference::from_entity(&entity)?)
}
