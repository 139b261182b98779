//! # Conference Core
//!
//! Contracts between the conference services and their external
//! collaborators.
//!
//! - [`key`]: hierarchical keys and their URL-safe encoding
//! - [`entity`]: stored entities and property values
//! - [`entity_store`]: persistence, queries, and entity-group transactions
//! - [`identity`]: the authenticated caller handed in by the front end
//! - [`task_queue`]: fire-and-forget background work
//! - [`cache`]: announcement text shared across replicas
//! - [`mailer`]: outbound mail for task handlers
//!
//! In-memory implementations of every trait live in `conference-testing`.

pub mod cache;
pub mod entity;
pub mod entity_store;
pub mod identity;
pub mod key;
pub mod mailer;
pub mod task_queue;

pub use cache::{AnnouncementCache, CacheError};
pub use entity::{Entity, Value};
pub use entity_store::{
    BoxFuture, Direction, EntityStore, EntityStoreError, EntityStream, FilterOp, PropertyFilter,
    Query, SortOrder, Transaction,
};
pub use identity::Identity;
pub use key::{Key, KeyId, ParseKeyError, PathElement};
pub use mailer::{Mail, Mailer, MailerError};
pub use task_queue::{Task, TaskQueue, TaskQueueError};
