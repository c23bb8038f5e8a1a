//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Redis连接提供者接口和默认实现。

use crate::{
    config::StoreConfig,
    error::{CacheError, Result},
    utils::redaction::redact_connection_string,
};
use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    Client,
};
use tokio::time::{timeout, Duration};

/// Redis 连接提供者
///
/// 把连接的建立与存储适配器分开，测试中可以替换为不触网的实现。
#[async_trait]
pub trait RedisProvider: Send + Sync {
    async fn connect(&self, config: &StoreConfig) -> Result<ConnectionManager>;
}

/// 默认的 Redis 提供者
///
/// 使用 `ConnectionManager`，断线后按有界指数退避自动重连。
pub struct DefaultRedisProvider;

impl DefaultRedisProvider {
    fn manager_config(config: &StoreConfig) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_number_of_retries(config.max_retries)
            .set_exponent_base(2)
            .set_factor(config.retry_factor_ms)
            .set_max_delay(config.max_retry_delay_ms)
            .set_connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .set_response_timeout(Duration::from_millis(config.command_timeout_ms))
    }
}

#[async_trait]
impl RedisProvider for DefaultRedisProvider {
    async fn connect(&self, config: &StoreConfig) -> Result<ConnectionManager> {
        let connection_string = config.connection_url();
        let target = redact_connection_string(&connection_string);

        let client = Client::open(connection_string.as_str())?;
        let manager = match timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager_with_config(Self::manager_config(config)),
        )
        .await
        {
            Ok(res) => res?,
            Err(_) => {
                return Err(CacheError::Timeout(format!(
                    "Connection timed out after {}ms. Target: {}",
                    config.connection_timeout_ms, target
                )));
            }
        };

        tracing::info!(target = %target, "Connected to Redis");
        Ok(manager)
    }
}
