//! Announcements: the almost-sold-out notice and the featured speaker.

use super::fetch_all;
use crate::config::ServiceSettings;
use crate::error::Result;
use crate::types::{CONFERENCE, Conference};
use conference_core::{AnnouncementCache, EntityStore, FilterOp, PropertyFilter, Query, SortOrder};
use std::sync::Arc;
use tracing::{debug, info};

const ANNOUNCEMENT_PREFIX: &str =
    "Last chance to attend! The following conferences are nearly sold out: ";

/// Computes and serves cached announcement text.
#[derive(Clone)]
pub struct AnnouncementService {
    store: Arc<dyn EntityStore>,
    cache: Arc<dyn AnnouncementCache>,
    settings: ServiceSettings,
}

impl AnnouncementService {
    /// Create a service.
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        cache: Arc<dyn AnnouncementCache>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    /// Recompute the almost-sold-out announcement and publish it.
    ///
    /// Conferences with `0 < seatsAvailable <= threshold` are listed. When
    /// none qualify the cached text is cleared and `""` returned.
    ///
    /// # Errors
    ///
    /// Store or cache failures.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_announcement(&self) -> Result<String> {
        let query = Query::kind(CONFERENCE)
            .filter(PropertyFilter::new("seatsAvailable", FilterOp::Gt, 0_i64))
            .filter(PropertyFilter::new(
                "seatsAvailable",
                FilterOp::LtEq,
                self.settings.announcement_seats_threshold,
            ))
            .order(SortOrder::ascending("seatsAvailable"));
        let conferences: Vec<Conference> = fetch_all(self.store.as_ref(), query).await?;

        if conferences.is_empty() {
            self.cache.clear_announcement().await?;
            debug!("No conferences nearly sold out");
            return Ok(String::new());
        }

        let names: Vec<&str> = conferences.iter().map(|c| c.name.as_str()).collect();
        let text = format!("{ANNOUNCEMENT_PREFIX}{}", names.join(", "));
        self.cache.set_announcement(text.clone()).await?;
        info!(conferences = names.len(), "Announcement refreshed");
        Ok(text)
    }

    /// The cached announcement, or `""`.
    ///
    /// # Errors
    ///
    /// Cache failures.
    pub async fn get_announcement(&self) -> Result<String> {
        Ok(self.cache.get_announcement().await?.unwrap_or_default())
    }

    /// The cached featured-speaker notice, or `""`.
    ///
    /// # Errors
    ///
    /// Cache failures.
    pub async fn get_featured_speaker(&self) -> Result<String> {
        Ok(self.cache.get_featured_speaker().await?.unwrap_or_default())
    }
}
