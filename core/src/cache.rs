//! Announcement cache contract.
//!
//! Announcement text is computed elsewhere (a periodic refresh, a task
//! handler) and read back verbatim on request. The cache is an explicit
//! collaborator rather than process state so every replica sees the same
//! text.

use crate::entity_store::BoxFuture;
use thiserror::Error;

/// Errors raised by cache backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Backend failure.
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Key-value slots for the recent-announcement and featured-speaker texts.
pub trait AnnouncementCache: Send + Sync {
    /// Store the almost-sold-out announcement.
    ///
    /// # Errors
    ///
    /// - `Backend`: write failed
    fn set_announcement(&self, text: String) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Read the announcement; `None` when unset.
    ///
    /// # Errors
    ///
    /// - `Backend`: read failed
    fn get_announcement(&self) -> BoxFuture<'_, Result<Option<String>, CacheError>>;

    /// Remove the announcement.
    ///
    /// # Errors
    ///
    /// - `Backend`: delete failed
    fn clear_announcement(&self) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Store the featured-speaker text.
    ///
    /// # Errors
    ///
    /// - `Backend`: write failed
    fn set_featured_speaker(&self, text: String) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Read the featured-speaker text; `None` when unset.
    ///
    /// # Errors
    ///
    /// - `Backend`: read failed
    fn get_featured_speaker(&self) -> BoxFuture<'_, Result<Option<String>, CacheError>>;
}
