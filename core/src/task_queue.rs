//! Fire-and-forget task submission.
//!
//! Services hand work that must not block or fail the caller (confirmation
//! mail, featured-speaker announcements) to a [`TaskQueue`]. The queue owns
//! delivery from that point on and is assumed to deliver at least once, so
//! task handlers must tolerate duplicates.

use crate::entity_store::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when submitting a task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskQueueError {
    /// The queue refused the task.
    #[error("Enqueue failed for task '{kind}': {reason}")]
    EnqueueFailed {
        /// Task kind
        kind: &'static str,
        /// Failure reason
        reason: String,
    },
}

/// Background work handed off by the services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// Mail the organizer that their conference was created.
    SendConfirmationEmail {
        /// Organizer's email
        email: String,
        /// Human-readable dump of the created conference
        conference_info: String,
    },
    /// Publish a featured-speaker announcement.
    SetFeaturedSpeaker {
        /// Announcement text
        announcement: String,
    },
}

impl Task {
    /// Short name used for routing and logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SendConfirmationEmail { .. } => "send_confirmation_email",
            Self::SetFeaturedSpeaker { .. } => "set_featured_speaker",
        }
    }
}

/// Asynchronous task submission.
pub trait TaskQueue: Send + Sync {
    /// Submit a task. Success means the queue accepted it, not that it ran.
    ///
    /// # Errors
    ///
    /// - `EnqueueFailed`: the queue did not accept the task
    fn enqueue(&self, task: Task) -> BoxFuture<'_, Result<(), TaskQueueError>>;
}
