//! Domain services.
//!
//! Each manager holds the collaborators it needs behind `Arc`s and takes
//! the caller's identity explicitly. Multi-entity updates run inside
//! store transactions that enlist every touched key up front.

mod announcements;
mod conferences;
mod profiles;
mod registration;
mod sessions;
mod speakers;

pub use announcements::AnnouncementService;
pub use conferences::ConferenceManager;
pub use profiles::ProfileManager;
pub use registration::RegistrationEngine;
pub use sessions::{SessionManager, SessionPeriod};
pub use speakers::SpeakerDirectory;

use crate::error::Result;
use crate::metrics;
use crate::types::{Profile, Record, profile_key};
use conference_core::{Entity, EntityStore, Identity, Query, Task, TaskQueue, Transaction};
use futures::TryStreamExt;
use tracing::warn;

/// Run `query` and map every result to `R`.
async fn fetch_all<R: Record>(store: &dyn EntityStore, query: Query) -> Result<Vec<R>> {
    let entities: Vec<Entity> = store.query(query).await?.try_collect().await?;
    entities
        .iter()
        .map(|e| R::from_entity(e).map_err(Into::into))
        .collect()
}

/// Read the caller's profile inside `txn`, or build a fresh one.
///
/// The flag is `true` when the profile did not exist yet; the caller must
/// `put` it for the creation to persist. The profile key must be enlisted.
async fn load_or_init_profile(
    txn: &mut dyn Transaction,
    identity: &Identity,
) -> Result<(Profile, bool)> {
    let key = profile_key(&identity.user_id);
    match txn.get(&key).await? {
        Some(entity) => Ok((Profile::from_entity(&entity)?, false)),
        None => Ok((Profile::for_identity(identity), true)),
    }
}

/// Hand `task` to the queue; a refusal is logged and swallowed.
async fn enqueue_detached(tasks: &dyn TaskQueue, task: Task) {
    let kind = task.kind();
    if let Err(error) = tasks.enqueue(task).await {
        warn!(task = kind, error = %error, "Task enqueue failed, continuing");
        metrics::record_enqueue_failure(kind);
    }
}
