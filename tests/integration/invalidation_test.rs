//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 缓存失效集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{setup_logging, unique_name, FaultyStore};
use rtcache::backend::KvStore;
use rtcache::config::CacheConfig;
use rtcache::keys::CacheKey;
use rtcache::metrics::GLOBAL_METRICS;
use rtcache::CacheClient;
use std::sync::atomic::Ordering;
use std::sync::Arc;

async fn seeded(prefix: &str, keys: &[&str]) -> (Arc<FaultyStore>, CacheClient) {
    let store = FaultyStore::new();
    for key in keys {
        store.inner.set(key, b"[]".to_vec(), 300).await.unwrap();
    }
    let client = CacheClient::new(
        store.clone(),
        CacheConfig {
            name: unique_name(prefix),
            ..Default::default()
        },
    );
    (store, client)
}

#[tokio::test]
async fn test_delete_by_pattern_removes_only_matching_keys() {
    setup_logging();
    let (store, client) = seeded(
        "invalidation",
        &["chats:user:42:a", "chats:user:42:b", "chats:user:99:z"],
    )
    .await;

    let removed = client.delete_by_pattern("chats:user:42*").await;

    assert_eq!(removed, 2);
    assert!(!store.inner.contains("chats:user:42:a"));
    assert!(!store.inner.contains("chats:user:42:b"));
    assert!(store.inner.contains("chats:user:99:z"));
    assert_eq!(GLOBAL_METRICS.invalidated_count(client.name()), 2);
}

#[tokio::test]
async fn test_no_match_issues_no_delete() {
    let (store, client) = seeded("invalidation_empty", &["chats:user:99:z"]).await;

    let removed = client.delete_by_pattern("chats:user:42*").await;

    assert_eq!(removed, 0);
    assert_eq!(FaultyStore::count(&store.keys_calls), 1);
    assert_eq!(FaultyStore::count(&store.del_calls), 0);
    assert_eq!(
        GLOBAL_METRICS.request_count(client.name(), "delete_pattern", "empty"),
        1
    );
}

#[tokio::test]
async fn test_delete_single_key() {
    let (store, client) = seeded("invalidation_single", &["chat:1", "chat:10"]).await;

    assert_eq!(client.delete("chat:1").await, 1);
    assert_eq!(client.delete("chat:1").await, 0);
    assert!(store.inner.contains("chat:10"));
}

#[tokio::test]
async fn test_store_errors_are_swallowed() {
    let (store, client) = seeded("invalidation_errors", &["messages:chat:1"]).await;

    store.fail_keys.store(true, Ordering::SeqCst);
    assert_eq!(client.delete_by_pattern("messages:*").await, 0);
    assert_eq!(FaultyStore::count(&store.del_calls), 0);

    store.fail_keys.store(false, Ordering::SeqCst);
    store.fail_del.store(true, Ordering::SeqCst);
    assert_eq!(client.delete_by_pattern("messages:*").await, 0);
    assert_eq!(client.delete("messages:chat:1").await, 0);
    assert!(store.inner.contains("messages:chat:1"));
    assert_eq!(
        GLOBAL_METRICS.request_count(client.name(), "delete_pattern", "error"),
        2
    );
}

#[tokio::test]
async fn test_cache_key_patterns_escape_glob_characters() {
    let user = CacheKey::new("chats").part("user").part("a*b");
    let (store, client) = seeded(
        "invalidation_escape",
        &["chats:user:a*b", "chats:user:a*b:page:2", "chats:user:axxb"],
    )
    .await;

    assert_eq!(client.delete_by_pattern(&user.children_pattern()).await, 1);
    assert!(store.inner.contains("chats:user:a*b"));

    assert_eq!(client.delete_by_pattern(&user.prefix_pattern()).await, 1);
    assert!(store.inner.contains("chats:user:axxb"));
}

#[tokio::test]
async fn test_read_after_invalidation_recomputes() {
    let (_store, client) = seeded("invalidation_read", &[]).await;
    let key = CacheKey::new("votes").part("chat").part(7).to_string();

    let first = client
        .get_or_set(&key, || async { Ok::<_, std::io::Error>(1u32) }, None)
        .await
        .unwrap();
    client.delete(&key).await;
    let second = client
        .get_or_set(&key, || async { Ok::<_, std::io::Error>(2u32) }, None)
        .await
        .unwrap();

    assert_eq!((first, second), (1, 2));
}
