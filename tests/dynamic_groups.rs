//! End-to-end behaviour of configuration groups over the memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dynconf::dynamic::{ConfigSchema, GroupError, GroupState};
use dynconf::schemas::{DatabaseConfig, HttpConfig, Validate};
use dynconf::{ConfigManager, MemoryStore};

mod common;

const DB_KEY: &str = "/config/myapp/prod/database/content.yaml";

#[tokio::test]
async fn test_reads_existing_document() {
    let (_store, manager) = common::seeded_manager(&[(DB_KEY, "host: db1\nport: 3306\n")]);

    let group = manager.get_group("myapp", "prod", "database").await;
    assert_eq!(group.key(), DB_KEY);
    assert_eq!(group.get_string("host"), "db1");
    assert_eq!(group.get_int("port"), 3306);
    assert!(!group.get_bool("missing"));
    assert_eq!(group.get_string("missing"), "");
    assert_eq!(group.state(), GroupState::Watching);
}

#[tokio::test]
async fn test_same_triple_same_group() {
    let (store, manager) = common::manager();

    let a = manager.get_group("myapp", "prod", "database").await;
    let b = manager.get_group("myapp", "prod", "database").await;
    let other = manager.get_group("myapp", "staging", "database").await;

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &other));
    assert_eq!(manager.group_count().await, 2);
    assert_eq!(store.watch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_access_creates_one_group() {
    let (store, manager) = common::seeded_manager(&[(DB_KEY, "host: db1\n")]);
    let manager = Arc::new(manager);

    let tasks = (0..16).map(|_| {
        let manager = manager.clone();
        tokio::spawn(async move { manager.get_group("myapp", "prod", "database").await })
    });
    let groups: Vec<_> = futures_util::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    for group in &groups[1..] {
        assert!(Arc::ptr_eq(&groups[0], group));
    }
    assert_eq!(manager.group_count().await, 1);
    assert_eq!(store.watch_count(), 1);
    assert_eq!(store.read_count(), 1);
}

#[tokio::test]
async fn test_refresh_after_child_key_change() {
    let (store, manager) = common::seeded_manager(&[(DB_KEY, "host: db1\nport: 3306\n")]);
    let group = manager.get_group("myapp", "prod", "database").await;

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    group.on_change(move || {
        h.fetch_add(1, Ordering::SeqCst);
    });

    common::update_document(&store, DB_KEY, "host: db2\nport: 3307\n");

    assert!(common::wait_until(|| group.get_string("host") == "db2").await);
    assert_eq!(group.get_int("port"), 3307);
    assert!(common::wait_until(|| hits.load(Ordering::SeqCst) >= 1).await);
    assert!(group.revision() >= 1);
}

#[tokio::test]
async fn test_document_key_write_alone_does_not_refresh() {
    let (store, manager) = common::seeded_manager(&[(DB_KEY, "host: db1\n")]);
    let group = manager.get_group("myapp", "prod", "database").await;

    store.put(DB_KEY, b"host: db2\n".to_vec());
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(group.get_string("host"), "db1");
    assert_eq!(group.revision(), 0);

    store.put(format!("{}/touch", DB_KEY), b"x".to_vec());
    assert!(common::wait_until(|| group.get_string("host") == "db2").await);
}

#[tokio::test]
async fn test_batch_triggers_single_refresh() {
    let (store, manager) = common::seeded_manager(&[(DB_KEY, "v: 1\n")]);
    let group = manager.get_group("myapp", "prod", "database").await;

    store.put(DB_KEY, b"v: 2\n".to_vec());
    store.put_batch(vec![
        (format!("{}/a", DB_KEY), b"1".to_vec()),
        (format!("{}/b", DB_KEY), b"2".to_vec()),
        (format!("{}/c", DB_KEY), b"3".to_vec()),
    ]);

    assert!(common::wait_until(|| group.revision() == 1).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(group.revision(), 1);
    assert_eq!(group.get_int("v"), 2);
}

#[tokio::test]
async fn test_unsubscribed_callback_not_invoked() {
    let (store, manager) = common::seeded_manager(&[(DB_KEY, "v: 1\n")]);
    let group = manager.get_group("myapp", "prod", "database").await;

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let id = group.on_change(move || {
        h.fetch_add(1, Ordering::SeqCst);
    });
    assert!(group.unsubscribe(id));

    common::update_document(&store, DB_KEY, "v: 2\n");
    assert!(common::wait_until(|| group.get_int("v") == 2).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nested_paths_and_lists() {
    let yaml = "\
server:
  listen_addr: 0.0.0.0
  port: 8080
features:
  - a
  - b
ratio: 0.5
debug: yes
";
    let (_store, manager) =
        common::seeded_manager(&[("/config/myapp/prod/http/content.yaml", yaml)]);
    let group = manager.get_group("myapp", "prod", "http").await;

    assert_eq!(group.get_string("server.listen_addr"), "0.0.0.0");
    assert_eq!(group.get_int("server.port"), 8080);
    assert_eq!(group.get_string_list("features"), vec!["a", "b"]);
    assert_eq!(group.get_string("features.1"), "b");
    assert_eq!(group.get_float("ratio"), 0.5);
    assert!(group.get_bool("debug"));
    assert!(group.is_set("server"));
}

#[tokio::test]
async fn test_get_typed_database() {
    let yaml = "\
engine: mysql
name: orders
host: db1
port: 3306
username: app
password: secret
parameters: charset=utf8mb4
";
    let (_store, manager) = common::seeded_manager(&[(DB_KEY, yaml)]);

    let db: DatabaseConfig = manager.get_typed("myapp", "prod").await.unwrap();
    assert_eq!(db.host, "db1");
    assert_eq!(db.port, 3306);
    assert!(db.validate().is_ok());
    assert_eq!(db.dsn(), "app:secret@tcp(db1:3306)/orders?charset=utf8mb4");
    assert_eq!(manager.keys().await, vec![DB_KEY.to_string()]);
}

#[tokio::test]
async fn test_get_typed_decode_error_keeps_group() {
    let (_store, manager) =
        common::seeded_manager(&[(DB_KEY, "host: db1\nport: not-a-number\n")]);

    let err = manager
        .get_typed::<DatabaseConfig>("myapp", "prod")
        .await
        .unwrap_err();
    assert!(matches!(err, GroupError::Decode { ref key, .. } if key == DB_KEY));

    assert_eq!(manager.keys().await, vec![DB_KEY.to_string()]);
    let group = manager.get_group("myapp", "prod", "database").await;
    assert_eq!(group.state(), GroupState::Watching);
    assert_eq!(group.get_string("host"), "db1");
    assert_eq!(group.get_string("port"), "not-a-number");
    assert_eq!(group.get_int("port"), 0);
}

#[tokio::test]
async fn test_get_typed_missing_group_is_default() {
    let (_store, manager) = common::manager();

    let http: HttpConfig = manager.get_typed("myapp", "dev").await.unwrap();
    assert_eq!(http, HttpConfig::default());
    assert_eq!(
        manager.keys().await,
        vec![format!("/config/myapp/dev/{}/content.yaml", HttpConfig::group_name())]
    );
}

#[tokio::test]
async fn test_unmarshal_into_keeps_defaults_when_empty() {
    let (_store, manager) = common::manager();
    let group = manager.get_group("myapp", "prod", "database").await;

    let mut db = DatabaseConfig {
        host: "fallback".into(),
        ..DatabaseConfig::default()
    };
    group.unmarshal_into(&mut db).unwrap();
    assert_eq!(db.host, "fallback");
}

#[tokio::test]
async fn test_shutdown_closes_groups_and_keeps_snapshots() {
    let (store, manager) = common::seeded_manager(&[(DB_KEY, "host: db1\n")]);
    let db = manager.get_group("myapp", "prod", "database").await;
    let http = manager.get_group("myapp", "prod", "http").await;

    manager.shutdown().await.unwrap();

    assert_eq!(db.state(), GroupState::Closed);
    assert_eq!(http.state(), GroupState::Closed);
    assert_eq!(db.get_string("host"), "db1");
    assert_eq!(store.active_watchers(), 0);
    assert!(manager.shutdown().await.is_ok());
}

#[tokio::test]
async fn test_managers_with_different_prefixes_coexist() {
    let store = Arc::new(MemoryStore::new());
    store.put("/config/app/prod/database/content.yaml", b"host: a\n".to_vec());
    store.put("/other/app/prod/database/content.yaml", b"host: b\n".to_vec());

    let first = ConfigManager::new(store.clone(), "/config");
    let second = ConfigManager::new(store.clone(), "/other");

    let a = first.get_group("app", "prod", "database").await;
    let b = second.get_group("app", "prod", "database").await;
    assert_eq!(a.get_string("host"), "a");
    assert_eq!(b.get_string("host"), "b");
    assert_eq!(second.prefix(), "/other");
}
