//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了键值存储适配层：读穿缓存依赖的 get/set/del/keys/ping 原语。
//!
//! 适配层只负责把存储错误原样报告给调用方，不在内部重试；
//! 重连退避属于传输层配置，见 [`redis_provider`]。

pub mod memory;
pub mod redis_provider;
pub mod redis_store;

use crate::error::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// `PING` 成功时返回的哨兵值
pub const PONG: &str = "PONG";

/// 键值存储特征
///
/// 每个键遵循后写入者胜出的语义，不提供跨键事务。
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 读取原始值，不存在时返回 None
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入原始值并设置过期时间（秒）
    async fn set(&self, key: &str, value: Vec<u8>, ttl: u64) -> Result<()>;

    /// 批量删除，返回实际删除的键数量
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// 按 glob 模式列出匹配的键
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// 存活探测，成功时返回 [`PONG`]
    async fn ping(&self) -> Result<String>;
}
