//! Hierarchical entity keys.
//!
//! A [`Key`] is a non-empty path of `(kind, id)` pairs. Every element but the
//! last names an ancestor, so a conference owned by a profile is keyed as
//! `Profile:alice / Conference:7` and a session of that conference as
//! `Profile:alice / Conference:7 / Session:12`.
//!
//! Ancestor queries select every key whose path starts with the ancestor's
//! path.
//!
//! Keys cross the service boundary in their URL-safe form (see
//! [`Key::urlsafe`]), which is what callers send back as "websafe" keys.
//!
//! # Examples
//!
//! ```
//! use conference_core::key::Key;
//!
//! let profile = Key::named("Profile", "alice");
//! let conference = profile.child_id("Conference", 7);
//!
//! assert_eq!(conference.parent(), Some(profile.clone()));
//! assert!(conference.is_descendant_of(&profile));
//!
//! let websafe = conference.urlsafe();
//! assert_eq!(Key::from_urlsafe(&websafe).unwrap(), conference);
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a URL-safe key string cannot be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid key '{input}': {reason}")]
pub struct ParseKeyError {
    /// The rejected input
    pub input: String,
    /// Why it was rejected
    pub reason: String,
}

impl ParseKeyError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Identifier of a single path element: either store-allocated or named.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyId {
    /// Numeric id handed out by the store
    Id(i64),
    /// Caller-chosen name (user ids, speaker emails)
    Name(String),
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// One `(kind, id)` step of a key path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    /// Entity kind, e.g. `"Conference"`
    pub kind: String,
    /// Identifier within the parent
    pub id: KeyId,
}

/// A parented entity key.
///
/// Keys are ordered by path, which groups descendants right after their
/// ancestor.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key {
    path: Vec<PathElement>,
}

impl Key {
    /// Root key with a caller-chosen name.
    #[must_use]
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: vec![PathElement {
                kind: kind.into(),
                id: KeyId::Name(name.into()),
            }],
        }
    }

    /// Root key with a numeric id.
    #[must_use]
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            path: vec![PathElement {
                kind: kind.into(),
                id: KeyId::Id(id),
            }],
        }
    }

    /// Child of this key with a caller-chosen name.
    #[must_use]
    pub fn child_named(&self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.child(PathElement {
            kind: kind.into(),
            id: KeyId::Name(name.into()),
        })
    }

    /// Child of this key with a numeric id.
    #[must_use]
    pub fn child_id(&self, kind: impl Into<String>, id: i64) -> Self {
        self.child(PathElement {
            kind: kind.into(),
            id: KeyId::Id(id),
        })
    }

    fn child(&self, element: PathElement) -> Self {
        let mut path = self.path.clone();
        path.push(element);
        Self { path }
    }

    /// Kind of the entity this key names (the last path element).
    #[must_use]
    pub fn kind(&self) -> &str {
        self.last().map_or("", |e| e.kind.as_str())
    }

    /// Identifier of the last path element.
    #[must_use]
    pub fn id(&self) -> Option<&KeyId> {
        self.last().map(|e| &e.id)
    }

    /// Name of the last path element, if it is a named key.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self.id() {
            Some(KeyId::Name(name)) => Some(name),
            _ => None,
        }
    }

    /// Full path, root first.
    #[must_use]
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Parent key, or `None` for a root key.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// Whether `ancestor`'s path is a prefix of this key's path.
    ///
    /// A key counts as its own descendant, matching ancestor-query semantics.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.path.starts_with(&ancestor.path)
    }

    /// Encode the key as a URL-safe string.
    #[must_use]
    pub fn urlsafe(&self) -> String {
        // Serializing a Vec of plain structs cannot fail.
        let json = serde_json::to_vec(&self.path).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a key produced by [`Key::urlsafe`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseKeyError`] if the input is not valid base64, does not
    /// hold a key path, or holds an empty path.
    pub fn from_urlsafe(input: &str) -> Result<Self, ParseKeyError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(input.trim())
            .map_err(|e| ParseKeyError::new(input, e.to_string()))?;
        let path: Vec<PathElement> = serde_json::from_slice(&bytes)
            .map_err(|e| ParseKeyError::new(input, e.to_string()))?;
        if path.is_empty() {
            return Err(ParseKeyError::new(input, "empty key path"));
        }
        Ok(Self { path })
    }

    fn last(&self) -> Option<&PathElement> {
        self.path.last()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}:{}", element.kind, element.id)?;
        }
        Ok(())
    }
}

impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_urlsafe(s)
    }
}
