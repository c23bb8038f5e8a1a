//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了读穿缓存客户端。
//!
//! 缓存只是性能优化：存储不可用时降级为“每次都重新计算”，
//! 存储层的任何错误都不会改变调用方在无缓存时看到的结果或错误。
//! 唯一会传递给调用方的错误来自调用方自己提供的 compute。
//!
//! 写操作之后再调用失效接口，两者之间存在短暂的可读到旧值的窗口，
//! 这是可接受的最终一致性窗口。

use crate::backend::{KvStore, RedisStore};
use crate::config::{CacheConfig, Config};
use crate::error::Result;
use crate::health::{self, HealthReport};
use crate::metrics::GLOBAL_METRICS;
use crate::serialization::{Serializer, SerializerEnum};
use crate::sync::{Flight, InFlightRegistry};
use crate::utils::redaction::redact_cache_key;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 读穿缓存客户端
///
/// 客户端本身不保存任何缓存条目，所有状态都在注入的存储里，
/// 可以通过 `Arc` 在任意多个并发任务间共享。
#[derive(Clone)]
pub struct CacheClient {
    /// 缓存实例名称
    name: String,
    /// 键值存储
    store: Arc<dyn KvStore>,
    /// 序列化器
    serializer: SerializerEnum,
    /// 缓存配置
    config: CacheConfig,
    /// 并发计算登记表，仅在启用 single_flight 时存在
    in_flight: Option<InFlightRegistry>,
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("name", &self.name)
            .field("default_ttl", &self.config.default_ttl)
            .field("single_flight", &self.in_flight.is_some())
            .finish()
    }
}

impl CacheClient {
    /// 使用注入的存储创建客户端
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        let in_flight = config.single_flight.then(InFlightRegistry::new);
        Self {
            name: config.name.clone(),
            serializer: SerializerEnum::from_config(&config),
            store,
            config,
            in_flight,
        }
    }

    /// 连接 Redis 并创建客户端
    ///
    /// 连接失败时返回错误
    #[instrument(skip(config), level = "info", fields(cache = %config.cache.name))]
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = RedisStore::new(&config.store).await?;
        Ok(Self::new(Arc::new(store), config.cache.clone()))
    }

    /// 创建客户端，Redis 在首次使用时才连接
    ///
    /// Redis 不可用时客户端照常工作，所有读取都是未命中。
    pub fn connect_lazy(config: &Config) -> Self {
        let store = RedisStore::lazy(&config.store);
        Self::new(Arc::new(store), config.cache.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 底层存储
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 解析某个键最终使用的 TTL（秒）
    pub fn resolve_ttl(&self, key: &str, ttl: Option<u64>) -> u64 {
        self.config.resolve_ttl(key, ttl)
    }

    /// 读取缓存值
    ///
    /// 不存在、存储出错或内容无法反序列化时都返回 None，错误只记录日志。
    #[instrument(skip(self), level = "debug", fields(cache = %self.name))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let start = Instant::now();
        let result = self.store.get(key).await;
        GLOBAL_METRICS.record_duration(&self.name, "get", start.elapsed().as_secs_f64());

        let data = match result {
            Ok(Some(data)) => data,
            Ok(None) => {
                GLOBAL_METRICS.record_request(&self.name, "get", "miss");
                return None;
            }
            Err(e) => {
                warn!(key = %redact_cache_key(key), error = %e, "Cache get error, treating as miss");
                GLOBAL_METRICS.record_request(&self.name, "get", "error");
                return None;
            }
        };

        match self.serializer.deserialize(&data) {
            Ok(value) => {
                GLOBAL_METRICS.record_request(&self.name, "get", "hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %redact_cache_key(key), error = %e, "Discarding undecodable cache entry");
                GLOBAL_METRICS.record_request(&self.name, "get", "corrupt");
                None
            }
        }
    }

    /// 写入缓存值
    ///
    /// 尽力而为：序列化或存储失败只记录日志。`ttl` 为 None 时按 TTL 策略解析。
    #[instrument(skip(self, value), level = "debug", fields(cache = %self.name))]
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<u64>) {
        let ttl = self.resolve_ttl(key, ttl);
        let payload = match self.serializer.serialize(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %redact_cache_key(key), error = %e, "Cache set error: value not serializable");
                GLOBAL_METRICS.record_request(&self.name, "set", "error");
                return;
            }
        };

        let start = Instant::now();
        let result = self.store.set(key, payload, ttl).await;
        GLOBAL_METRICS.record_duration(&self.name, "set", start.elapsed().as_secs_f64());
        match result {
            Ok(()) => {
                debug!(key = %redact_cache_key(key), ttl, "Cached value");
                GLOBAL_METRICS.record_request(&self.name, "set", "ok");
            }
            Err(e) => {
                warn!(key = %redact_cache_key(key), error = %e, "Cache set error");
                GLOBAL_METRICS.record_request(&self.name, "set", "error");
            }
        }
    }

    /// 读穿：命中直接返回，未命中时调用 `compute` 并写回缓存
    ///
    /// `compute` 的错误原样返回，且不会写入缓存；写回失败不影响返回值。
    /// 默认不合并并发计算：同一个键同时未命中的调用方各自计算、各自写回。
    /// 启用 `single_flight` 后，同时未命中的调用方等待第一个调用方的结果。
    ///
    /// ```no_run
    /// # async fn demo(cache: rtcache::CacheClient) -> Result<(), std::io::Error> {
    /// let title: String = cache
    ///     .get_or_set("chat:42", || async { Ok::<_, std::io::Error>("Probate".to_string()) }, Some(300))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, compute), level = "debug", fields(cache = %self.name))]
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<u64>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let Some(registry) = &self.in_flight else {
            return self.compute_and_store(key, compute, ttl).await;
        };

        match registry.acquire(key) {
            Flight::Leader(guard) => {
                let result = self.compute_and_store(key, compute, ttl).await;
                drop(guard);
                result
            }
            Flight::Follower(waiter) => {
                debug!(key = %redact_cache_key(key), "Waiting for in-flight computation");
                waiter.wait().await;
                if let Some(value) = self.get(key).await {
                    GLOBAL_METRICS.record_request(&self.name, "compute", "coalesced");
                    return Ok(value);
                }
                // leader 失败、写回失败或被取消：自行计算，错误只属于自己的 compute
                self.compute_and_store(key, compute, ttl).await
            }
        }
    }

    async fn compute_and_store<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<u64>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        GLOBAL_METRICS.record_request(&self.name, "compute", "attempt");
        let start = Instant::now();
        let result = compute().await;
        GLOBAL_METRICS.record_duration(&self.name, "compute", start.elapsed().as_secs_f64());

        match result {
            Ok(value) => {
                self.set(key, &value, ttl).await;
                Ok(value)
            }
            Err(e) => {
                debug!(key = %redact_cache_key(key), "Compute failed, nothing cached");
                GLOBAL_METRICS.record_request(&self.name, "compute", "error");
                Err(e)
            }
        }
    }

    /// 删除单个键
    ///
    /// 返回删除的数量；失效是尽力而为的，错误只记录日志并返回 0。
    #[instrument(skip(self), level = "debug", fields(cache = %self.name))]
    pub async fn delete(&self, key: &str) -> u64 {
        match self.store.del(&[key.to_string()]).await {
            Ok(removed) => {
                GLOBAL_METRICS.record_request(&self.name, "delete", "ok");
                GLOBAL_METRICS.record_invalidated(&self.name, removed);
                removed
            }
            Err(e) => {
                warn!(key = %redact_cache_key(key), error = %e, "Cache delete error");
                GLOBAL_METRICS.record_request(&self.name, "delete", "error");
                0
            }
        }
    }

    /// 按 glob 模式批量删除
    ///
    /// 先列出匹配的键，再一次性删除；没有匹配时不发出删除命令。
    /// 调用方负责让模式足够具体，例如 `chats:user:123*` 而不是 `chats:*`。
    #[instrument(skip(self), level = "debug", fields(cache = %self.name))]
    pub async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        let keys = match self.store.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern = %redact_cache_key(pattern), error = %e, "Cache delete by pattern error");
                GLOBAL_METRICS.record_request(&self.name, "delete_pattern", "error");
                return 0;
            }
        };

        if keys.is_empty() {
            debug!(pattern = %redact_cache_key(pattern), "No keys matched, nothing to delete");
            GLOBAL_METRICS.record_request(&self.name, "delete_pattern", "empty");
            return 0;
        }

        match self.store.del(&keys).await {
            Ok(removed) => {
                debug!(pattern = %redact_cache_key(pattern), matched = keys.len(), removed, "Invalidated keys");
                GLOBAL_METRICS.record_request(&self.name, "delete_pattern", "ok");
                GLOBAL_METRICS.record_invalidated(&self.name, removed);
                removed
            }
            Err(e) => {
                warn!(pattern = %redact_cache_key(pattern), error = %e, "Cache delete by pattern error");
                GLOBAL_METRICS.record_request(&self.name, "delete_pattern", "error");
                0
            }
        }
    }

    /// 存活探测，成功时返回 `"PONG"`
    pub async fn ping(&self) -> Result<String> {
        self.store.ping().await
    }

    /// 生成健康报告
    pub async fn health(&self) -> HealthReport {
        health::check(self.store.as_ref()).await
    }
}
