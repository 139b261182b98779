//! Speaker directory: speakers keyed by email, created on first use.

use crate::error::{Result, ServiceError};
use crate::types::{Record, Speaker, speaker_key};
use conference_core::EntityStore;
use std::sync::Arc;
use tracing::info;

/// Resolves and creates speakers.
#[derive(Clone)]
pub struct SpeakerDirectory {
    store: Arc<dyn EntityStore>,
}

impl SpeakerDirectory {
    /// Create a directory over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Look a speaker up by email.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn find(&self, email: &str) -> Result<Option<Speaker>> {
        match self.store.get(&speaker_key(email)).await? {
            Some(entity) => Ok(Some(Speaker::from_entity(&entity)?)),
            None => Ok(None),
        }
    }

    /// Return the speaker with `email`, creating it from `name` if absent.
    ///
    /// Lookup and creation share one transaction on the speaker key, so
    /// concurrent first sessions of a new speaker create it once.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: the speaker is new and `name` is missing or empty
    pub async fn resolve(&self, email: &str, name: Option<&str>) -> Result<Speaker> {
        let key = speaker_key(email);
        let mut txn = self.store.begin_transaction(std::slice::from_ref(&key)).await?;
        if let Some(entity) = txn.get(&key).await? {
            return Ok(Speaker::from_entity(&entity)?);
        }

        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("Speaker name field required".to_string()))?;
        let speaker = Speaker {
            key,
            name: name.to_string(),
            email: email.to_string(),
        };
        txn.put(speaker.to_entity())?;
        txn.commit().await?;

        info!(email, "Speaker created");
        Ok(speaker)
    }
}
