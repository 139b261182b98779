//! Service error taxonomy.
//!
//! Every manager operation fails with [`ServiceError`]. Callers at an API
//! boundary map [`ServiceError::kind`] to a transport status; nothing in the
//! services retries.

use conference_core::{CacheError, EntityStoreError, Key, MailerError};
use thiserror::Error;

/// Errors surfaced by the conference services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The operation needs an authenticated caller.
    #[error("Authorization required")]
    Unauthenticated,

    /// The caller is authenticated but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A referenced key does not resolve.
    #[error("No {kind} found with key: {key}")]
    NotFound {
        /// Entity kind that was looked up
        kind: &'static str,
        /// The key as the caller supplied it
        key: String,
    },

    /// A required field is missing or malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A filter clause names an unknown field or operator, or a value that
    /// does not parse for its field.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A business rule refused the operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The filter combination cannot be executed with one sort order.
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// Entity store failure.
    #[error("Store error: {0}")]
    Store(#[from] EntityStoreError),

    /// Announcement cache failure.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Mail delivery failure (task processing only).
    #[error("Mail error: {0}")]
    Mail(#[from] MailerError),
}

/// Coarse error classes for mapping to transport statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No identity
    Unauthenticated,
    /// Identity lacks ownership
    Forbidden,
    /// Key does not resolve
    NotFound,
    /// Malformed input
    BadRequest,
    /// Business-rule violation
    Conflict,
    /// Filter combination not executable
    UnsupportedQuery,
    /// Collaborator failure
    Internal,
}

impl ServiceError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BadRequest(_) | Self::InvalidQuery(_) => ErrorKind::BadRequest,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::UnsupportedQuery(_) => ErrorKind::UnsupportedQuery,
            Self::Store(_) | Self::Cache(_) | Self::Mail(_) => ErrorKind::Internal,
        }
    }

    /// `NotFound` for a key.
    #[must_use]
    pub fn not_found(kind: &'static str, key: &Key) -> Self {
        Self::NotFound {
            kind,
            key: key.urlsafe(),
        }
    }
}

/// Result alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
