//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 单飞模式集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{setup_logging, unique_name};
use rtcache::backend::MemoryStore;
use rtcache::config::CacheConfig;
use rtcache::metrics::GLOBAL_METRICS;
use rtcache::CacheClient;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

const CONCURRENCY: usize = 10;

fn client(prefix: &str, single_flight: bool) -> CacheClient {
    CacheClient::new(
        Arc::new(MemoryStore::new()),
        CacheConfig {
            name: unique_name(prefix),
            single_flight,
            ..Default::default()
        },
    )
}

/// 同时发起 CONCURRENCY 个对同一个键的读穿请求，返回 compute 被调用的次数
async fn race(client: CacheClient, key: &'static str) -> (usize, Vec<String>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(CONCURRENCY));

    let mut handles = Vec::new();
    for _ in 0..CONCURRENCY {
        let client = client.clone();
        let calls = calls.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            client
                .get_or_set(
                    key,
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok::<_, std::io::Error>("hot value".to_string())
                    },
                    Some(60),
                )
                .await
        }));
    }

    let results = futures::future::join_all(handles).await;
    let values = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    (calls.load(Ordering::SeqCst), values)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_flight_deduplication() {
    setup_logging();
    let client = client("single_flight", true);
    let name = client.name().to_string();

    let (calls, values) = race(client, "hot_key").await;

    assert_eq!(calls, 1);
    assert!(values.iter().all(|v| v == "hot value"));
    assert_eq!(
        GLOBAL_METRICS.request_count(&name, "compute", "coalesced"),
        (CONCURRENCY - 1) as u64
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_compute_independently_by_default() {
    let client = client("no_single_flight", false);

    let (calls, values) = race(client, "hot_key").await;

    assert!(calls > 1, "expected independent computations, got {}", calls);
    assert_eq!(values.len(), CONCURRENCY);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_follower_computes_when_leader_fails() {
    let client = client("single_flight_leader_err", true);

    let leader = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .get_or_set(
                    "flaky",
                    || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err::<String, _>("leader failed".to_string())
                    },
                    None,
                )
                .await
        })
    };

    // 让 leader 先登记
    tokio::time::sleep(Duration::from_millis(20)).await;
    let follower = client
        .get_or_set(
            "flaky",
            || async { Ok::<_, String>("follower value".to_string()) },
            None,
        )
        .await;

    assert_eq!(leader.await.unwrap(), Err("leader failed".to_string()));
    assert_eq!(follower, Ok("follower value".to_string()));
    assert_eq!(client.get::<String>("flaky").await, Some("follower value".to_string()));
}
