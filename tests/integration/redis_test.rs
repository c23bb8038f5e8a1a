//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis集成测试，Redis 不可用时跳过

#[path = "../common/mod.rs"]
mod common;

use common::{is_redis_available, redis_url, setup_logging, unique_name};
use rtcache::backend::{KvStore, RedisStore, PONG};
use rtcache::config::{CacheConfig, Config, StoreConfig};
use rtcache::health;
use rtcache::CacheClient;
use std::sync::Arc;

async fn store() -> Option<RedisStore> {
    setup_logging();
    if !is_redis_available().await {
        println!("跳过测试: Redis不可用");
        return None;
    }
    Some(
        RedisStore::new(&StoreConfig::with_url(redis_url()))
            .await
            .expect("Failed to connect to Redis"),
    )
}

#[tokio::test]
async fn test_redis_ping() {
    let Some(store) = store().await else { return };
    assert!(store.is_connected());
    assert_eq!(store.ping().await.unwrap(), PONG);
}

#[tokio::test]
async fn test_redis_set_get_expire() {
    let Some(store) = store().await else { return };
    let key = format!("{}:value", unique_name("rtcache_test"));

    store.set(&key, b"hello".to_vec(), 1).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), Some(b"hello".to_vec()));

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_redis_scan_and_delete_by_pattern() {
    let Some(store) = store().await else { return };
    let ns = unique_name("rtcache_test");
    let client = CacheClient::new(
        Arc::new(store.clone()),
        CacheConfig {
            name: ns.clone(),
            ..Default::default()
        },
    );

    for key in ["user:42:a", "user:42:b", "user:99:z"] {
        client.set(&format!("{}:{}", ns, key), &1, Some(60)).await;
    }

    let pattern = format!("{}:user:42*", ns);
    assert_eq!(store.keys(&pattern).await.unwrap().len(), 2);
    assert_eq!(client.delete_by_pattern(&pattern).await, 2);
    assert_eq!(client.delete_by_pattern(&pattern).await, 0);

    let rest = format!("{}:*", ns);
    assert_eq!(store.keys(&rest).await.unwrap().len(), 1);
    assert_eq!(client.delete_by_pattern(&rest).await, 1);
}

#[tokio::test]
async fn test_redis_read_through() {
    let Some(store) = store().await else { return };
    let key = format!("{}:chat:1", unique_name("rtcache_test"));
    let client = CacheClient::new(Arc::new(store), CacheConfig::default());

    let first = client
        .get_or_set(&key, || async { Ok::<_, std::io::Error>(vec![1, 2, 3]) }, Some(60))
        .await
        .unwrap();
    let cached: Option<Vec<i32>> = client.get(&key).await;
    assert_eq!(cached, Some(first));
    assert_eq!(client.delete(&key).await, 1);
}

#[tokio::test]
async fn test_redis_self_test_and_health() {
    let Some(store) = store().await else { return };

    let report = health::self_test(&store).await;
    assert!(report.passed, "{:?}", report.steps);
    assert_eq!(store.get(&report.probe_key).await.unwrap(), None);

    assert!(health::check(&store).await.is_ok());
}

#[tokio::test]
async fn test_connect_via_config() {
    setup_logging();
    if !is_redis_available().await {
        println!("跳过测试: Redis不可用");
        return;
    }

    let mut config = Config::default();
    config.store = StoreConfig::with_url(redis_url());
    let client = CacheClient::connect(&config).await.unwrap();
    assert_eq!(client.ping().await.unwrap(), PONG);

    let lazy = CacheClient::connect_lazy(&config);
    assert!(lazy.health().await.is_ok());
}
