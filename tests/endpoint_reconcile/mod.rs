//! Endpoint tracking against a changing member list

use std::sync::Arc;
use std::time::Duration;

use confwatch::ConfWatchConfig;
use confwatch::ConnectionManager;
use confwatch::MemStore;
use tokio::time::timeout;

use crate::commons::member;
use crate::commons::MemConnector;

async fn wait_for_endpoints(
    manager: &ConnectionManager,
    expected: &[&str],
) {
    timeout(Duration::from_secs(5), async {
        while manager.endpoints() != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("endpoints should converge");
}

#[tokio::test]
async fn test_endpoints_track_membership() {
    let store = Arc::new(MemStore::new());
    store.set_members(vec![member(1, "http://10.1.0.1:2379"), member(2, "http://10.1.0.2:2379")]);
    let mut config = ConfWatchConfig::default();
    config.client.reconcile_interval_ms = 50;

    let manager = ConnectionManager::connect(config, &MemConnector { store: store.clone() })
        .await
        .unwrap();
    wait_for_endpoints(&manager, &["10.1.0.1:2379", "10.1.0.2:2379"]).await;

    store.set_members(vec![
        member(1, "http://10.1.0.1:2379"),
        member(2, "http://10.1.0.2:2379"),
        member(3, "http://10.1.0.3:2379"),
    ]);
    wait_for_endpoints(&manager, &["10.1.0.1:2379", "10.1.0.2:2379", "10.1.0.3:2379"]).await;

    // several idle passes later nothing new is applied
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.endpoint_updates().len(), 2);

    manager.close_all();
}

#[tokio::test]
async fn test_manual_pass_reports_change() {
    let store = Arc::new(MemStore::new());
    store.set_members(vec![member(1, "http://10.1.0.1:2379")]);
    let mut config = ConfWatchConfig::default();
    config.client.reconcile_interval_ms = 60_000;

    let manager = ConnectionManager::connect(config, &MemConnector { store: store.clone() })
        .await
        .unwrap();
    wait_for_endpoints(&manager, &["10.1.0.1:2379"]).await;

    assert!(!manager.reconcile_endpoints().await.unwrap());
    store.set_members(vec![member(4, "http://10.1.0.4:2379")]);
    assert!(manager.reconcile_endpoints().await.unwrap());
    assert_eq!(manager.endpoints(), vec!["10.1.0.4:2379"]);

    manager.close_all();
}
