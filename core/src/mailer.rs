//! Outbound mail contract used by task handlers.

use crate::entity_store::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by mail providers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailerError {
    /// The provider rejected or failed to deliver the message.
    #[error("Failed to send mail to {to}: {reason}")]
    SendFailed {
        /// Recipient
        to: String,
        /// Failure reason
        reason: String,
    },
}

/// A plain-text message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Mail delivery.
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// - `SendFailed`: delivery failed
    fn send(&self, mail: Mail) -> BoxFuture<'_, Result<(), MailerError>>;
}
