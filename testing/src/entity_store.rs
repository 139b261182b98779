//! In-memory entity store with per-key transactions.
//!
//! Every key has its own async mutex, created on first use and dropped once
//! nothing holds or awaits it. A transaction
//! holds the mutexes of all keys it enlisted from `begin_transaction` until
//! commit or drop, so transactions over the same key run one after another
//! while disjoint keys never wait on each other. Plain `put`s take the key's
//! mutex for the duration of the write.

#![allow(clippy::unwrap_used)] // Lock poisoning only happens after a panic in a test

use conference_core::entity_store::{
    BoxFuture, EntityStore, EntityStoreError, EntityStream, Query, Transaction,
};
use conference_core::{Entity, Key};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{Mutex as KeyMutex, OwnedMutexGuard};

/// In-memory entity store for fast, deterministic tests and demos.
///
/// # Example
///
/// ```
/// use conference_core::{Entity, EntityStore, Key};
/// use conference_testing::InMemoryEntityStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryEntityStore::new();
/// let key = Key::named("Profile", "alice");
///
/// store.put(Entity::new(key.clone()).with("displayName", "Alice")).await?;
///
/// let loaded = store.get(&key).await?;
/// assert_eq!(loaded.unwrap().get_str("displayName"), Some("Alice"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEntityStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entities: RwLock<BTreeMap<Key, Entity>>,
    next_id: AtomicI64,
    key_locks: Mutex<HashMap<Key, Arc<KeyMutex<()>>>>,
    fail_commits: AtomicBool,
}

impl Inner {
    /// Mutex for `key`. Entries referenced only by the map are idle and
    /// pruned here; guards and waiters keep their own `Arc`.
    fn key_lock(&self, key: &Key) -> Arc<KeyMutex<()>> {
        let mut locks = self.key_locks.lock().unwrap();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    fn read(&self, key: &Key) -> Option<Entity> {
        self.entities.read().unwrap().get(key).cloned()
    }
}

impl InMemoryEntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entities.read().unwrap().len()
    }

    /// Whether the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entities.read().unwrap().is_empty()
    }

    /// Every stored entity of `kind`, in key order.
    #[must_use]
    pub fn entities_of_kind(&self, kind: &str) -> Vec<Entity> {
        self.inner
            .entities
            .read()
            .unwrap()
            .values()
            .filter(|e| e.key().kind() == kind)
            .cloned()
            .collect()
    }

    /// Remove an entity directly, bypassing key locks.
    ///
    /// Lets tests simulate a join target that was deleted elsewhere.
    pub fn remove(&self, key: &Key) -> Option<Entity> {
        self.inner.entities.write().unwrap().remove(key)
    }

    /// Make every subsequent commit abort (or stop doing so).
    pub fn set_fail_commits(&self, fail: bool) {
        self.inner.fail_commits.store(fail, Ordering::SeqCst);
    }
}

impl EntityStore for InMemoryEntityStore {
    fn allocate_key<'a>(
        &'a self,
        kind: &'a str,
        parent: Option<&'a Key>,
    ) -> BoxFuture<'a, Result<Key, EntityStoreError>> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let key = match parent {
            Some(parent) => parent.child_id(kind, id),
            None => Key::with_id(kind, id),
        };
        Box::pin(async move { Ok(key) })
    }

    fn get<'a>(&'a self, key: &'a Key) -> BoxFuture<'a, Result<Option<Entity>, EntityStoreError>> {
        let entity = self.inner.read(key);
        Box::pin(async move { Ok(entity) })
    }

    fn get_multi<'a>(
        &'a self,
        keys: &'a [Key],
    ) -> BoxFuture<'a, Result<Vec<Option<Entity>>, EntityStoreError>> {
        let entities = {
            let map = self.inner.entities.read().unwrap();
            keys.iter().map(|k| map.get(k).cloned()).collect()
        };
        Box::pin(async move { Ok(entities) })
    }

    fn put(&self, entity: Entity) -> BoxFuture<'_, Result<(), EntityStoreError>> {
        let lock = self.inner.key_lock(entity.key());
        Box::pin(async move {
            let _guard = lock.lock_owned().await;
            self.inner
                .entities
                .write()
                .unwrap()
                .insert(entity.key().clone(), entity);
            Ok(())
        })
    }

    fn query(&self, query: Query) -> BoxFuture<'_, Result<EntityStream, EntityStoreError>> {
        let result = query.validate().map(|()| {
            let mut matches: Vec<Entity> = self
                .inner
                .entities
                .read()
                .unwrap()
                .values()
                .filter(|e| query.matches(e))
                .cloned()
                .collect();
            matches.sort_by(|a, b| query.compare(a, b));
            let stream: EntityStream = Box::pin(futures::stream::iter(matches.into_iter().map(Ok)));
            stream
        });
        Box::pin(async move { result })
    }

    fn begin_transaction<'a>(
        &'a self,
        keys: &'a [Key],
    ) -> BoxFuture<'a, Result<Box<dyn Transaction>, EntityStoreError>> {
        // Sorted, de-duplicated keys give every transaction the same lock
        // order, so overlapping transactions cannot deadlock.
        let enlisted: BTreeSet<Key> = keys.iter().cloned().collect();
        Box::pin(async move {
            let mut guards = Vec::with_capacity(enlisted.len());
            for key in &enlisted {
                guards.push(self.inner.key_lock(key).lock_owned().await);
            }
            let txn: Box<dyn Transaction> = Box::new(InMemoryTransaction {
                inner: Arc::clone(&self.inner),
                enlisted,
                writes: BTreeMap::new(),
                _guards: guards,
            });
            Ok(txn)
        })
    }
}

struct InMemoryTransaction {
    inner: Arc<Inner>,
    enlisted: BTreeSet<Key>,
    writes: BTreeMap<Key, Entity>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl InMemoryTransaction {
    fn check_enlisted(&self, key: &Key) -> Result<(), EntityStoreError> {
        if self.enlisted.contains(key) {
            Ok(())
        } else {
            Err(EntityStoreError::NotEnlisted { key: key.clone() })
        }
    }

    fn apply(self) -> Result<(), EntityStoreError> {
        if self.inner.fail_commits.load(Ordering::SeqCst) {
            return Err(EntityStoreError::TransactionAborted(
                "commit failure injected".to_string(),
            ));
        }
        let mut entities = self.inner.entities.write().unwrap();
        for (key, entity) in self.writes {
            entities.insert(key, entity);
        }
        Ok(())
    }
}

impl Transaction for InMemoryTransaction {
    fn get<'a>(
        &'a mut self,
        key: &'a Key,
    ) -> BoxFuture<'a, Result<Option<Entity>, EntityStoreError>> {
        let result = self
            .check_enlisted(key)
            .map(|()| self.writes.get(key).cloned().or_else(|| self.inner.read(key)));
        Box::pin(async move { result })
    }

    fn put(&mut self, entity: Entity) -> Result<(), EntityStoreError> {
        self.check_enlisted(entity.key())?;
        self.writes.insert(entity.key().clone(), entity);
        Ok(())
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), EntityStoreError>> {
        let result = self.apply();
        Box::pin(async move { result })
    }
}
