//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存组件的配置结构和解析逻辑。
//!
//! 配置来源优先级：环境变量 `REDIS_URL` > 配置文件（TOML）> 默认值。

use crate::error::{CacheError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

/// 未配置时使用的 Redis 地址
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// 读取连接字符串的环境变量
pub const REDIS_URL_ENV: &str = "REDIS_URL";

/// 默认缓存过期时间（秒），1 小时
pub const DEFAULT_TTL: u64 = 60 * 60;

const MAX_TTL: u64 = 86400 * 30;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub config_version: Option<u32>,
    /// 键值存储连接配置
    pub store: StoreConfig,
    /// 读穿缓存行为配置
    pub cache: CacheConfig,
}

/// 键值存储（Redis）连接配置
///
/// 重连退避策略在构造客户端时一次性配置，不随单次操作变化
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StoreConfig {
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// 是否启用 TLS
    pub enable_tls: bool,
    /// 断线重连的最大次数
    pub max_retries: usize,
    /// 指数退避的基础延迟（毫秒）
    pub retry_factor_ms: u64,
    /// 单次退避的最大延迟（毫秒）
    pub max_retry_delay_ms: u64,
    /// 首次连接失败后暂停重连的时间（毫秒），期间操作直接按未命中处理
    pub reconnect_cooldown_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection_string: SecretString::from(DEFAULT_REDIS_URL.to_string()),
            connection_timeout_ms: 10_000,
            command_timeout_ms: 3000,
            enable_tls: false,
            max_retries: 3,
            retry_factor_ms: 50,
            max_retry_delay_ms: 2000,
            reconnect_cooldown_ms: 1000,
        }
    }
}

impl StoreConfig {
    /// 使用指定的连接字符串创建配置，其余字段取默认值
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            connection_string: SecretString::from(url.into()),
            ..Default::default()
        }
    }

    /// 实际用于连接的地址（启用 TLS 时强制使用 rediss://）
    pub fn connection_url(&self) -> String {
        let raw = self.connection_string.expose_secret();
        if self.enable_tls && !raw.starts_with("rediss://") {
            raw.replacen("redis://", "rediss://", 1)
        } else {
            raw.to_string()
        }
    }
}

/// 序列化类型枚举
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializationType {
    /// JSON序列化
    #[default]
    Json,
}

/// 读穿缓存配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CacheConfig {
    /// 缓存实例名称，用于日志与指标标签
    pub name: String,
    /// 默认的缓存过期时间（秒）
    pub default_ttl: u64,
    /// 序列化类型
    pub serialization: SerializationType,
    /// 是否对缓存值做 gzip 压缩
    pub compression: bool,
    /// 是否对同一个键的并发未命中做合并计算
    pub single_flight: bool,
    /// 按键前缀的 TTL 策略，例如 `"messages:" = 120`
    pub ttl_policies: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            default_ttl: DEFAULT_TTL,
            serialization: SerializationType::Json,
            compression: false,
            single_flight: false,
            ttl_policies: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    /// 追加一条前缀 TTL 策略
    pub fn with_ttl_policy(mut self, prefix: impl Into<String>, ttl: u64) -> Self {
        self.ttl_policies.insert(prefix.into(), ttl);
        self
    }

    /// 解析某个键最终使用的 TTL（秒）
    ///
    /// 显式 TTL 优先，其次是最长匹配的前缀策略，最后是 `default_ttl`。
    /// 结果至少为 1，Redis 不接受 `EX 0`。
    pub fn resolve_ttl(&self, key: &str, explicit: Option<u64>) -> u64 {
        explicit
            .or_else(|| {
                self.ttl_policies
                    .iter()
                    .filter(|(prefix, _)| key.starts_with(prefix.as_str()))
                    .max_by_key(|(prefix, _)| prefix.len())
                    .map(|(_, ttl)| *ttl)
            })
            .unwrap_or(self.default_ttl)
            .max(1)
    }
}

impl Config {
    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CacheError::ConfigError(e.to_string()))
    }

    /// 从 TOML 文件解析配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| CacheError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// 用环境变量覆盖配置
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(REDIS_URL_ENV) {
            if !url.trim().is_empty() {
                self.store.connection_string = SecretString::from(url);
            }
        }
        self
    }

    /// 加载并验证配置
    ///
    /// 提供文件路径时从文件读取，否则使用默认值；随后应用环境变量覆盖。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        }
        .apply_env();
        config.validate().map_err(CacheError::ConfigError)?;
        Ok(config)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保值在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = &self.config_version {
            if *version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        let store = &self.store;
        let url = store.connection_string.expose_secret();
        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            return Err("store connection_string must start with redis:// or rediss://".to_string());
        }

        if !(100..=30000).contains(&store.connection_timeout_ms) {
            return Err("store connection_timeout_ms must be between 100 and 30000 ms".to_string());
        }

        if !(100..=60000).contains(&store.command_timeout_ms) {
            return Err("store command_timeout_ms must be between 100 and 60000 ms".to_string());
        }

        if store.max_retries > 10 {
            return Err("store max_retries cannot exceed 10".to_string());
        }

        if store.retry_factor_ms == 0 || store.retry_factor_ms > store.max_retry_delay_ms {
            return Err(format!(
                "store retry_factor_ms ({}) must be non-zero and <= max_retry_delay_ms ({})",
                store.retry_factor_ms, store.max_retry_delay_ms
            ));
        }

        if store.reconnect_cooldown_ms > 60000 {
            return Err("store reconnect_cooldown_ms cannot exceed 60000 ms".to_string());
        }

        let cache = &self.cache;
        if cache.name.is_empty() {
            return Err("cache name cannot be empty".to_string());
        }

        if cache.name.len() > 64 {
            return Err(format!(
                "cache name '{}' exceeds maximum length of 64 characters",
                cache.name
            ));
        }

        if cache.default_ttl == 0 {
            return Err("cache default_ttl cannot be zero".to_string());
        }

        if cache.default_ttl > MAX_TTL {
            return Err("cache default_ttl cannot exceed 30 days (2592000 seconds)".to_string());
        }

        for (prefix, ttl) in &cache.ttl_policies {
            if prefix.is_empty() {
                return Err("ttl policy prefix cannot be empty".to_string());
            }
            if *ttl == 0 || *ttl > MAX_TTL {
                return Err(format!(
                    "ttl policy '{}' must be between 1 and {} seconds",
                    prefix, MAX_TTL
                ));
            }
        }

        Ok(())
    }
}
