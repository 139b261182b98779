//! Application wiring.

use crate::composer::OutputComposer;
use crate::config::ServiceSettings;
use crate::services::{
    AnnouncementService, ConferenceManager, ProfileManager, RegistrationEngine, SessionManager,
};
use conference_core::{AnnouncementCache, EntityStore, TaskQueue};
use std::sync::Arc;

/// All services over one set of collaborators.
///
/// Cloning is cheap; every service shares the same store, queue, and cache.
#[derive(Clone)]
pub struct ConferenceApp {
    /// Profiles and wishlists
    pub profiles: ProfileManager,
    /// Conference CRUD and search
    pub conferences: ConferenceManager,
    /// Seat booking
    pub registration: RegistrationEngine,
    /// Sessions and session queries
    pub sessions: SessionManager,
    /// Announcement text
    pub announcements: AnnouncementService,
}

impl ConferenceApp {
    /// Wire every service.
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        tasks: Arc<dyn TaskQueue>,
        cache: Arc<dyn AnnouncementCache>,
        settings: ServiceSettings,
    ) -> Self {
        let composer = OutputComposer::new(Arc::clone(&store));
        let profiles = ProfileManager::new(Arc::clone(&store));
        Self {
            conferences: ConferenceManager::new(
                Arc::clone(&store),
                Arc::clone(&tasks),
                profiles.clone(),
                composer.clone(),
            ),
            registration: RegistrationEngine::new(Arc::clone(&store)),
            sessions: SessionManager::new(
                Arc::clone(&store),
                tasks,
                profiles.clone(),
                composer,
                settings.clone(),
            ),
            announcements: AnnouncementService::new(store, cache, settings),
            profiles,
        }
    }
}
