//! # Conference Testing
//!
//! In-memory implementations of the `conference-core` contracts.
//!
//! This crate provides:
//! - [`InMemoryEntityStore`]: keyed store with ancestor queries and
//!   per-key locking transactions
//! - [`InMemoryTaskQueue`]: records tasks, can be switched to fail
//! - [`InMemoryAnnouncementCache`]: process-local announcement slots
//! - [`RecordingMailer`] and [`ConsoleMailer`]
//! - [`fixtures`]: ready-made identities
//!
//! ## Example
//!
//! ```
//! use conference_core::{Task, TaskQueue};
//! use conference_testing::InMemoryTaskQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = InMemoryTaskQueue::new();
//! queue
//!     .enqueue(Task::SetFeaturedSpeaker {
//!         announcement: "Featured speaker: Ada!!".to_string(),
//!     })
//!     .await?;
//! assert_eq!(queue.tasks().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod collaborators;
pub mod entity_store;

pub use collaborators::{ConsoleMailer, InMemoryAnnouncementCache, InMemoryTaskQueue, RecordingMailer};
pub use entity_store::InMemoryEntityStore;

/// Ready-made test inputs.
pub mod fixtures {
    use conference_core::Identity;

    /// Identity whose id, email, and nickname derive from `name`.
    ///
    /// # Example
    ///
    /// ```
    /// use conference_testing::fixtures::test_identity;
    ///
    /// let alice = test_identity("alice");
    /// assert_eq!(alice.email, "alice@example.com");
    /// ```
    #[must_use]
    pub fn test_identity(name: &str) -> Identity {
        Identity::new(name, format!("{name}@example.com"), name)
    }
}

pub use fixtures::test_identity;
