//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内的键值存储，基于 Moka。
//!
//! 与 Redis 适配器行为一致：逐条目 TTL、glob 键匹配、DEL 返回删除数量。
//! 用于测试和本地开发，可以直接替换注入到缓存客户端中。

use super::{KvStore, PONG};
use crate::error::Result;
use crate::utils::GlobPattern;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

#[derive(Clone)]
struct StoredValue {
    data: Vec<u8>,
    ttl: Duration,
}

/// 每个条目按写入时给定的 TTL 过期，覆盖写入时重新计时（与 `SET EX` 相同）
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 内存键值存储
///
/// [`MemoryStore::new`] 不限制条目数，每次 `set` 都会写入，与 Redis 的后写入者胜出一致。
/// [`MemoryStore::with_capacity`] 设置上限后由 moka 的 TinyLFU 准入策略淘汰，
/// 接近上限时新写入可能被直接拒绝且不报错，只适合对命中率没有精确要求的场景。
#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    /// 创建指定最大条目数的内存存储
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// 键是否存在且未过期
    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|v| v.data))
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: u64) -> Result<()> {
        let stored = StoredValue {
            data: value,
            ttl: Duration::from_secs(ttl.max(1)),
        };
        self.cache.insert(key.to_string(), stored).await;
        Ok(())
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut removed = 0u64;
        for key in keys {
            if self.cache.remove(key.as_str()).await.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    #[instrument(skip(self), level = "debug")]
    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let glob = GlobPattern::new(pattern)?;
        let mut found: Vec<String> = self
            .cache
            .iter()
            .map(|(key, _)| key.as_str().to_string())
            .filter(|key| glob.matches(key) && self.cache.contains_key(key.as_str()))
            .collect();
        found.sort();
        debug!("Memory keys {} matched {} keys", pattern, found.len());
        Ok(found)
    }

    async fn ping(&self) -> Result<String> {
        Ok(PONG.to_string())
    }
}
