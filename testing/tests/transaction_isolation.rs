//! Concurrency behaviour of the in-memory entity store.

#![allow(clippy::unwrap_used)]

use conference_core::{Entity, EntityStore, Key};
use conference_testing::InMemoryEntityStore;
use futures::future::join_all;
use std::time::Duration;
use tokio_test::assert_ok;

fn counter_key() -> Key {
    Key::named("Profile", "org").child_id("Conference", 1)
}

#[tokio::test]
async fn same_key_transactions_do_not_lose_updates() {
    let store = InMemoryEntityStore::new();
    store
        .put(Entity::new(counter_key()).with("seatsAvailable", 0_i64))
        .await
        .unwrap();

    let handles = (0..50).map(|_| {
        let store = store.clone();
        tokio::spawn(async move {
            let key = counter_key();
            let mut txn = store.begin_transaction(std::slice::from_ref(&key)).await?;
            let entity = txn.get(&key).await?.unwrap();
            let seats = entity.get_int("seatsAvailable").unwrap();
            tokio::task::yield_now().await;
            txn.put(entity.with("seatsAvailable", seats + 1))?;
            txn.commit().await
        })
    });

    for result in join_all(handles).await {
        assert_ok!(result.unwrap());
    }

    let entity = store.get(&counter_key()).await.unwrap().unwrap();
    assert_eq!(entity.get_int("seatsAvailable"), Some(50));
}

#[tokio::test]
async fn disjoint_keys_do_not_block_each_other() {
    let store = InMemoryEntityStore::new();
    let organizer = Key::named("Profile", "org");
    let first = organizer.child_id("Conference", 1);
    let second = organizer.child_id("Conference", 2);

    // Hold the first conference open while the second one's transaction
    // runs to completion, even though both share an organizer.
    let held = store.begin_transaction(std::slice::from_ref(&first)).await.unwrap();

    let other = tokio::time::timeout(Duration::from_secs(1), async {
        let mut txn = store.begin_transaction(std::slice::from_ref(&second)).await?;
        txn.put(Entity::new(second.clone()))?;
        txn.commit().await
    })
    .await;

    assert!(matches!(other, Ok(Ok(()))));
    drop(held);
}

#[tokio::test]
async fn same_key_waits_for_the_holder() {
    let store = InMemoryEntityStore::new();
    let conference = Key::named("Profile", "alice").child_id("Conference", 3);

    let held = store.begin_transaction(std::slice::from_ref(&conference)).await.unwrap();

    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        store.begin_transaction(std::slice::from_ref(&conference)),
    )
    .await;
    assert!(blocked.is_err(), "second transaction must wait for the first");

    drop(held);
    let txn = store.begin_transaction(std::slice::from_ref(&conference)).await.unwrap();
    assert_ok!(txn.commit().await);
}

#[tokio::test]
async fn plain_put_waits_for_the_holder() {
    let store = InMemoryEntityStore::new();
    let profile = Key::named("Profile", "alice");

    let held = store.begin_transaction(std::slice::from_ref(&profile)).await.unwrap();
    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        store.put(Entity::new(profile.clone())),
    )
    .await;
    assert!(blocked.is_err());

    drop(held);
    assert_ok!(store.put(Entity::new(profile)).await);
}

#[tokio::test]
async fn overlapping_multi_key_transactions_do_not_deadlock() {
    let store = InMemoryEntityStore::new();
    let a = Key::named("Profile", "a");
    let b = Key::named("Profile", "b");

    let forward = {
        let store = store.clone();
        let groups = vec![a.clone(), b.clone()];
        tokio::spawn(async move {
            for _ in 0..20 {
                let txn = store.begin_transaction(&groups).await?;
                txn.commit().await?;
            }
            Ok::<_, conference_core::EntityStoreError>(())
        })
    };
    let backward = {
        let store = store.clone();
        let groups = vec![b, a];
        tokio::spawn(async move {
            for _ in 0..20 {
                let txn = store.begin_transaction(&groups).await?;
                txn.commit().await?;
            }
            Ok::<_, conference_core::EntityStoreError>(())
        })
    };

    let both = tokio::time::timeout(Duration::from_secs(5), async {
        (forward.await.unwrap(), backward.await.unwrap())
    })
    .await
    .unwrap();
    assert_ok!(both.0);
    assert_ok!(both.1);
}
