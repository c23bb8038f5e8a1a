//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的键值存储适配器。

use super::redis_provider::{DefaultRedisProvider, RedisProvider};
use super::KvStore;
use crate::config::StoreConfig;
use crate::error::{CacheError, Result};
use crate::utils::redaction::redact_connection_string;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, RedisResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tokio::time::{timeout, Duration};
use tracing::{debug, instrument, warn};

/// 每轮 SCAN 建议返回的键数量
const SCAN_COUNT: u64 = 1000;

/// 连接状态
///
/// 同一时刻最多只有一次连接尝试；失败后在冷却期内直接报错，不再重连。
#[derive(Default)]
struct ConnectionState {
    manager: Option<ConnectionManager>,
    /// 正在进行的连接尝试，结束时发送 true
    attempt: Option<watch::Receiver<bool>>,
    failed_at: Option<Instant>,
    last_error: Option<String>,
}

impl ConnectionState {
    fn unavailable(&self) -> CacheError {
        CacheError::BackendError(format!(
            "Redis unavailable: {}",
            self.last_error.as_deref().unwrap_or("connection failed")
        ))
    }
}

/// Redis 键值存储
///
/// 连接在首次使用时建立。并发调用方共享同一次连接尝试，尝试失败时一起失败；
/// 失败后的 `reconnect_cooldown_ms` 内所有操作立即返回错误，冷却结束后的下一次操作重新连接。
/// 等待连接与执行命令都受 `command_timeout_ms` 约束，超时按普通存储错误上报。
#[derive(Clone)]
pub struct RedisStore {
    config: StoreConfig,
    provider: Arc<dyn RedisProvider>,
    state: Arc<Mutex<ConnectionState>>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field(
                "target",
                &redact_connection_string(&self.config.connection_url()),
            )
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl RedisStore {
    /// 创建并立即连接
    ///
    /// 连接失败时返回错误
    #[instrument(skip(config), level = "info", name = "init_redis_store")]
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        Self::new_with_provider(config, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的Redis提供者创建并立即连接
    pub async fn new_with_provider(
        config: &StoreConfig,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        let manager = provider.connect(config).await?;
        let store = Self::lazy_with_provider(config, provider);
        store.state.lock().await.manager = Some(manager);
        Ok(store)
    }

    /// 创建但不连接
    ///
    /// 启动时 Redis 不可用也不会失败，缓存在连上之前表现为全部未命中。
    pub fn lazy(config: &StoreConfig) -> Self {
        Self::lazy_with_provider(config, Arc::new(DefaultRedisProvider))
    }

    pub fn lazy_with_provider(config: &StoreConfig, provider: Arc<dyn RedisProvider>) -> Self {
        Self {
            config: config.clone(),
            provider,
            state: Arc::new(Mutex::new(ConnectionState::default())),
        }
    }

    /// 是否已建立连接
    pub fn is_connected(&self) -> bool {
        self.state
            .try_lock()
            .map(|state| state.manager.is_some())
            .unwrap_or(false)
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.config.command_timeout_ms)
    }

    /// 取得连接，必要时发起（或加入）一次连接尝试
    async fn connection(&self) -> Result<ConnectionManager> {
        let mut done = {
            let mut state = self.state.lock().await;
            if let Some(manager) = &state.manager {
                return Ok(manager.clone());
            }
            if let Some(failed_at) = state.failed_at {
                if failed_at.elapsed() < Duration::from_millis(self.config.reconnect_cooldown_ms) {
                    return Err(state.unavailable());
                }
            }
            // 发送端已关闭说明上一次尝试的任务异常退出，需要重新发起
            match state.attempt.as_ref().filter(|done| done.has_changed().is_ok()) {
                Some(done) => done.clone(),
                None => {
                    let done = self.spawn_connect();
                    state.attempt = Some(done.clone());
                    done
                }
            }
        };

        // 连接尝试在后台任务中进行，这里超时返回不会取消它
        if timeout(self.command_timeout(), done.wait_for(|finished| *finished))
            .await
            .is_err()
        {
            return Err(CacheError::Timeout(format!(
                "Waiting for Redis connection timed out after {}ms",
                self.config.command_timeout_ms
            )));
        }

        let state = self.state.lock().await;
        match &state.manager {
            Some(manager) => Ok(manager.clone()),
            None => Err(state.unavailable()),
        }
    }

    fn spawn_connect(&self) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        let provider = self.provider.clone();
        let config = self.config.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            debug!("Establishing Redis connection");
            let result = provider.connect(&config).await;

            let mut state = state.lock().await;
            state.attempt = None;
            match result {
                Ok(manager) => {
                    state.manager = Some(manager);
                    state.failed_at = None;
                    state.last_error = None;
                }
                Err(e) => {
                    warn!(error = %e, "Redis connection error");
                    state.failed_at = Some(Instant::now());
                    state.last_error = Some(e.to_string());
                }
            }
            drop(state);
            let _ = tx.send(true);
        });
        rx
    }

    async fn run<T, F>(&self, command: &str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(self.command_timeout(), fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(CacheError::Timeout(format!(
                "{} timed out after {}ms",
                command, self.config.command_timeout_ms
            ))),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        self.run("GET", async move {
            redis::cmd("GET")
                .arg(key)
                .query_async::<Option<Vec<u8>>>(&mut conn)
                .await
        })
        .await
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        self.run("SET", async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl)
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        self.run("DEL", async move {
            redis::cmd("DEL")
                .arg(keys)
                .query_async::<u64>(&mut conn)
                .await
        })
        .await
    }

    /// 使用游标式 SCAN MATCH 遍历，避免 KEYS 阻塞服务端
    #[instrument(skip(self), level = "debug")]
    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let mut cursor = 0u64;
        let mut found = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = self
                .run("SCAN", async {
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_COUNT)
                        .query_async(&mut conn)
                        .await
                })
                .await?;
            found.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        // SCAN 在 rehash 期间可能重复返回同一个键
        found.sort();
        found.dedup();
        debug!("SCAN {} matched {} keys", pattern, found.len());
        Ok(found)
    }

    #[instrument(skip(self), level = "debug")]
    async fn ping(&self) -> Result<String> {
        let mut conn = self.connection().await?;
        self.run("PING", async move {
            redis::cmd("PING").query_async::<String>(&mut conn).await
        })
        .await
    }
}
