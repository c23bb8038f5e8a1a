//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! Redis 不可用时的降级测试，不依赖外部 Redis

#[path = "../common/mod.rs"]
mod common;

use common::{setup_logging, unique_name, FailingProvider};
use rtcache::backend::{KvStore, RedisStore};
use rtcache::config::{CacheConfig, StoreConfig};
use rtcache::error::CacheError;
use rtcache::metrics::GLOBAL_METRICS;
use rtcache::{CacheClient, HealthStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn unreachable_store(provider: Arc<FailingProvider>) -> RedisStore {
    RedisStore::lazy_with_provider(&StoreConfig::with_url("redis://127.0.0.1:1"), provider)
}

fn degraded_client(prefix: &str) -> (Arc<FailingProvider>, CacheClient) {
    let provider = FailingProvider::new();
    let store = unreachable_store(provider.clone());
    let client = CacheClient::new(
        Arc::new(store),
        CacheConfig {
            name: unique_name(prefix),
            ..Default::default()
        },
    );
    (provider, client)
}

#[tokio::test]
async fn test_eager_connect_reports_error() {
    setup_logging();
    let provider = FailingProvider::new();
    let result =
        RedisStore::new_with_provider(&StoreConfig::with_url("redis://127.0.0.1:1"), provider.clone())
            .await;

    assert!(result.is_err());
    assert_eq!(provider.attempts(), 1);
}

#[tokio::test]
async fn test_read_through_falls_back_to_compute() {
    let (_provider, client) = degraded_client("degraded_read");

    for expected in 1..=3u32 {
        let value = client
            .get_or_set("chat:1", || async move { Ok::<_, std::io::Error>(expected) }, None)
            .await
            .unwrap();
        // 每次都是未命中，compute 的结果原样返回
        assert_eq!(value, expected);
    }
    assert_eq!(
        GLOBAL_METRICS.request_count(client.name(), "compute", "attempt"),
        3
    );
}

#[tokio::test]
async fn test_compute_error_still_propagates_when_degraded() {
    let (_provider, client) = degraded_client("degraded_err");

    let result: Result<u32, String> = client
        .get_or_set("chat:1", || async { Err("db down".to_string()) }, None)
        .await;

    assert_eq!(result, Err("db down".to_string()));
}

#[tokio::test]
async fn test_invalidation_is_best_effort() {
    let (_provider, client) = degraded_client("degraded_del");

    assert_eq!(client.delete("chat:1").await, 0);
    assert_eq!(client.delete_by_pattern("chats:user:42*").await, 0);
    client.set("chat:1", "ignored", None).await;
    assert_eq!(client.get::<String>("chat:1").await, None);
}

#[tokio::test]
async fn test_ping_and_health_report_errors() {
    let (_provider, client) = degraded_client("degraded_health");

    assert!(client.ping().await.is_err());

    let report = client.health().await;
    assert_eq!(report.status, HealthStatus::Error);
    assert_eq!(report.message, "Redis connection error");
    assert!(report
        .error
        .as_deref()
        .is_some_and(|e| e.contains("Connection refused")));
}

#[tokio::test]
async fn test_failed_connect_is_not_retried_during_cooldown() {
    let provider = FailingProvider::new();
    let config = StoreConfig {
        reconnect_cooldown_ms: 200,
        ..StoreConfig::with_url("redis://127.0.0.1:1")
    };
    let store = RedisStore::lazy_with_provider(&config, provider.clone());

    assert!(store.get("chat:1").await.is_err());
    assert!(store.keys("chat:*").await.is_err());
    assert!(store.ping().await.is_err());
    assert_eq!(provider.attempts(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(store.get("chat:1").await.is_err());
    assert_eq!(provider.attempts(), 2);
    assert!(!store.is_connected());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_failing_connect() {
    const CALLERS: usize = 8;
    let provider = FailingProvider::slow(Duration::from_millis(300));
    let client = CacheClient::new(
        Arc::new(unreachable_store(provider.clone())),
        CacheConfig {
            name: unique_name("degraded_concurrent"),
            ..Default::default()
        },
    );

    let started = Instant::now();
    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                let begin = Instant::now();
                let value = client
                    .get_or_set("chat:1", || async move { Ok::<_, std::io::Error>(i) }, None)
                    .await
                    .unwrap();
                (value, begin.elapsed())
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let worst = results
        .into_iter()
        .enumerate()
        .map(|(i, joined)| {
            let (value, elapsed) = joined.unwrap();
            assert_eq!(value, i);
            elapsed
        })
        .max()
        .unwrap();

    // 一次连接尝试的耗时，而不是随调用方数量线性增长
    assert!(worst < Duration::from_millis(1000), "worst latency {:?}", worst);
    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(provider.attempts(), 1);
}

#[tokio::test]
async fn test_waiting_for_connection_is_bounded_by_command_timeout() {
    let provider = FailingProvider::slow(Duration::from_secs(5));
    let config = StoreConfig {
        command_timeout_ms: 200,
        ..StoreConfig::with_url("redis://127.0.0.1:1")
    };
    let store = RedisStore::lazy_with_provider(&config, provider.clone());

    let started = Instant::now();
    let err = store.get("chat:1").await.unwrap_err();
    assert!(matches!(err, CacheError::Timeout(_)), "{}", err);
    assert!(started.elapsed() < Duration::from_secs(1));

    // 后台的连接尝试仍在进行，后续调用方加入它而不是再发起一次
    assert!(store.ping().await.is_err());
    assert_eq!(provider.attempts(), 1);
}
