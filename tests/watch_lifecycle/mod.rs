//! End-to-end watcher behavior over an in-process store

use std::time::Duration;

use confwatch::ConnectionError;
use confwatch::Error;
use confwatch::HookMode;
use confwatch::StoreClient;
use tokio::time::timeout;

use crate::commons::connect_mem;
use crate::commons::next_change;
use crate::commons::recording_hook;
use crate::commons::EVENT_WAIT;

#[tokio::test]
async fn test_config_namespace_put_and_delete() {
    let (store, manager) = connect_mem().await;
    let watcher = manager.new_watcher("config").await.unwrap();
    let (hook, mut changes) = recording_hook();
    assert!(watcher.add_hook("", HookMode::Prefix, hook).await);

    store.put("CONFIG/test0", "100").await.unwrap();
    next_change(&mut changes).await;
    assert_eq!(watcher.get("test0").await.unwrap().as_int(), 100);

    store.delete("CONFIG/test0").await.unwrap();
    let (new, old) = next_change(&mut changes).await;

    assert!(!watcher.exists("test0"));
    assert_eq!(new.as_int(), 0);
    assert_eq!(old.as_int(), 100);

    manager.close_all();
}

#[tokio::test]
async fn test_round_trip_through_manager_writes() {
    let (_store, manager) = connect_mem().await;
    let watcher = manager.new_watcher("service").await.unwrap();
    let (hook, mut changes) = recording_hook();
    assert!(watcher.add_hook("timeout", HookMode::Exact, hook).await);

    manager.put("SERVICE/timeout", "1.5").await.unwrap();
    let (new, _) = next_change(&mut changes).await;
    assert_eq!(new.key(), "timeout");

    let item = watcher.get("timeout").await.unwrap();
    assert_eq!(item.as_str(), "1.5");
    assert_eq!(item.as_f64(), 1.5);
    assert_eq!(item.as_int(), 0);

    manager.close_all();
}

#[tokio::test]
async fn test_watchers_are_isolated_by_namespace() {
    let (store, manager) = connect_mem().await;
    let app = manager.new_watcher("app").await.unwrap();
    let db = manager.new_watcher("db").await.unwrap();
    let (app_hook, mut app_changes) = recording_hook();
    let (db_hook, mut db_changes) = recording_hook();
    assert!(app.add_hook("", HookMode::Prefix, app_hook).await);
    assert!(db.add_hook("", HookMode::Prefix, db_hook).await);

    store.put("DB/pool_size", "16").await.unwrap();
    store.put("APP/workers", "4").await.unwrap();

    assert_eq!(next_change(&mut app_changes).await.0.key(), "workers");
    assert_eq!(next_change(&mut db_changes).await.0.key(), "pool_size");
    assert!(app_changes.try_recv().is_err());
    assert!(db_changes.try_recv().is_err());

    assert_eq!(db.get("pool_size").await.unwrap().as_int(), 16);
    assert!(app.get_with("pool_size", false).await.is_none());

    manager.close_all();
}

#[tokio::test]
async fn test_updates_reach_cached_keys_in_order() {
    let (store, manager) = connect_mem().await;
    store.put("FLAGS/level", "0").await.unwrap();
    let watcher = manager.new_watcher("flags").await.unwrap();
    assert_eq!(watcher.get("level").await.unwrap().as_int(), 0);

    let (hook, mut changes) = recording_hook();
    assert!(watcher.add_hook("level", HookMode::Exact, hook).await);
    for i in 1..=20 {
        store.put("FLAGS/level", &i.to_string()).await.unwrap();
    }
    for i in 1..=20 {
        let (new, old) = next_change(&mut changes).await;
        assert_eq!((new.as_int(), old.as_int()), (i, i - 1));
    }

    assert_eq!(watcher.get_with("level", false).await.unwrap().as_int(), 20);
    manager.close_all();
}

#[tokio::test]
async fn test_close_all_shuts_every_watcher() {
    let (store, manager) = connect_mem().await;
    let first = manager.new_watcher("one").await.unwrap();
    let second = manager.new_watcher("two").await.unwrap();
    assert_eq!(store.watcher_count(), 2);

    assert_eq!(manager.close_all(), 2);

    for watcher in [&first, &second] {
        timeout(EVENT_WAIT, watcher.closed()).await.expect("watcher should stop");
        let (hook, _changes) = recording_hook();
        assert!(!watcher.add_hook("", HookMode::Prefix, hook).await);
    }
    assert_eq!(store.watcher_count(), 0);
    assert!(matches!(
        manager.new_watcher("three").await,
        Err(Error::Connection(ConnectionError::Closed))
    ));
}

#[tokio::test]
async fn test_cache_serves_last_state_after_close() {
    let (store, manager) = connect_mem().await;
    store.put("CACHE/k", "1").await.unwrap();
    let watcher = manager.new_watcher("cache").await.unwrap();
    assert_eq!(watcher.get("k").await.unwrap().as_int(), 1);

    watcher.close();
    timeout(EVENT_WAIT, watcher.closed()).await.expect("watcher should stop");
    store.put("CACHE/k", "2").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(watcher.get("k").await.unwrap().as_int(), 1);
    manager.close_all();
}
