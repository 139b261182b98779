//! Authenticated caller identity.
//!
//! Authentication happens outside the services. Whatever front end sits on
//! top resolves the caller and passes `Option<&Identity>` into each
//! operation that needs one; `None` means the caller is anonymous.

use serde::{Deserialize, Serialize};

/// A caller resolved by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id; names the caller's profile key
    pub user_id: String,
    /// Contact email
    pub email: String,
    /// Display nickname, used as the default profile display name
    pub nickname: String,
}

impl Identity {
    /// Create an identity.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            nickname: nickname.into(),
        }
    }
}
