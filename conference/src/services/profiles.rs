//! Profile manager: lazy profile creation, profile edits, and wishlists.

use super::load_or_init_profile;
use crate::error::{Result, ServiceError};
use crate::forms::{ProfileForm, ProfileOutput};
use crate::types::{Profile, Record, SESSION, TeeShirtSize, profile_key, require_identity, resolve_websafe};
use conference_core::{EntityStore, Identity};
use std::sync::Arc;
use tracing::{debug, info};

/// Gets, creates, and edits attendee profiles.
#[derive(Clone)]
pub struct ProfileManager {
    store: Arc<dyn EntityStore>,
}

impl ProfileManager {
    /// Create a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Return the caller's profile, creating it on first access.
    ///
    /// A new profile takes its display name from the identity's nickname,
    /// its email from the identity, and `NOT_SPECIFIED` as shirt size.
    ///
    /// # Errors
    ///
    /// Store failures.
    #[tracing::instrument(skip(self, identity), fields(user = %identity.user_id))]
    pub async fn get_or_create(&self, identity: &Identity) -> Result<Profile> {
        let key = profile_key(&identity.user_id);
        let mut txn = self.store.begin_transaction(std::slice::from_ref(&key)).await?;
        let (profile, created) = load_or_init_profile(txn.as_mut(), identity).await?;
        if created {
            txn.put(profile.to_entity())?;
            txn.commit().await?;
            info!(user = %identity.user_id, "Profile created");
        }
        Ok(profile)
    }

    /// The caller's profile.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    pub async fn get_profile(&self, identity: Option<&Identity>) -> Result<ProfileOutput> {
        let identity = require_identity(identity)?;
        let profile = self.get_or_create(identity).await?;
        Ok(ProfileOutput::from(&profile))
    }

    /// Overwrite display name and shirt size when non-empty values are given.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    /// - `BadRequest`: unknown shirt size
    #[tracing::instrument(skip(self, identity, form), fields(user = identity.map(|i| i.user_id.as_str())))]
    pub async fn save_profile(
        &self,
        identity: Option<&Identity>,
        form: ProfileForm,
    ) -> Result<ProfileOutput> {
        let identity = require_identity(identity)?;
        let size = form
            .tee_shirt_size
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<TeeShirtSize>)
            .transpose()?;

        let key = profile_key(&identity.user_id);
        let mut txn = self.store.begin_transaction(std::slice::from_ref(&key)).await?;
        let (mut profile, _) = load_or_init_profile(txn.as_mut(), identity).await?;
        if let Some(name) = form.display_name.filter(|n| !n.is_empty()) {
            profile.display_name = name;
        }
        if let Some(size) = size {
            profile.tee_shirt_size = size;
        }
        txn.put(profile.to_entity())?;
        txn.commit().await?;

        debug!(user = %identity.user_id, "Profile saved");
        Ok(ProfileOutput::from(&profile))
    }

    /// Add a session to the caller's wishlist.
    ///
    /// Returns `false` when the session was already on it.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    /// - `NotFound`: the session key is malformed or does not resolve
    #[tracing::instrument(skip(self, identity), fields(user = identity.map(|i| i.user_id.as_str())))]
    pub async fn add_to_wishlist(
        &self,
        identity: Option<&Identity>,
        websafe_session_key: &str,
    ) -> Result<bool> {
        let identity = require_identity(identity)?;
        let session_key = resolve_websafe(SESSION, websafe_session_key)?;
        if self.store.get(&session_key).await?.is_none() {
            return Err(ServiceError::not_found(SESSION, &session_key));
        }

        let key = profile_key(&identity.user_id);
        let mut txn = self.store.begin_transaction(std::slice::from_ref(&key)).await?;
        let (mut profile, created) = load_or_init_profile(txn.as_mut(), identity).await?;
        let added = profile.wish(session_key);
        if added || created {
            txn.put(profile.to_entity())?;
            txn.commit().await?;
        }

        info!(user = %identity.user_id, added, "Wishlist updated");
        Ok(added)
    }

    /// Empty the caller's wishlist; `true` when it held anything.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: no identity
    #[tracing::instrument(skip(self, identity), fields(user = identity.map(|i| i.user_id.as_str())))]
    pub async fn clear_wishlist(&self, identity: Option<&Identity>) -> Result<bool> {
        let identity = require_identity(identity)?;
        let key = profile_key(&identity.user_id);
        let mut txn = self.store.begin_transaction(std::slice::from_ref(&key)).await?;
        let (mut profile, _) = load_or_init_profile(txn.as_mut(), identity).await?;
        let had_any = profile.clear_wishlist();
        txn.put(profile.to_entity())?;
        txn.commit().await?;

        info!(user = %identity.user_id, had_any, "Wishlist cleared");
        Ok(had_any)
    }
}
