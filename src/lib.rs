//! rtcache - 读穿缓存组件
//!
//! 为数据访问代码提供基于 Redis 的读穿缓存：未命中时执行调用方提供的计算并写回，
//! 写操作之后按精确键或 glob 模式失效。存储不可用时降级为不缓存，
//! 只有调用方自己的计算错误会传递出去。
//!
//! ```no_run
//! use rtcache::{CacheClient, Config};
//! use rtcache::keys::CacheKey;
//!
//! # async fn demo() -> rtcache::error::Result<()> {
//! let cache = CacheClient::connect(&Config::default().apply_env()).await?;
//!
//! let key = CacheKey::new("chats").part("user").part(42);
//! let chats: Vec<String> = cache
//!     .get_or_set(&key.to_string(), || async { Ok::<_, std::io::Error>(vec![]) }, Some(300))
//!     .await?;
//!
//! // 写入数据库之后
//! cache.delete_by_pattern(&key.prefix_pattern()).await;
//! # let _ = chats;
//! # Ok(())
//! # }
//! ```

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod keys;
pub mod metrics;
pub mod serialization;
pub mod sync;
pub mod telemetry;
pub mod utils;

pub use backend::{KvStore, MemoryStore, RedisStore};
pub use client::CacheClient;
pub use config::Config;
pub use health::{HealthReport, HealthStatus};

/// rtcache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
