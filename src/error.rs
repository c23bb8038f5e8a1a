//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存组件的错误类型。
//!
//! 注意：这些错误只在存储适配层和配置层之间流动。读穿缓存本身会吞掉
//! 存储错误（降级为未命中），唯一会传递给调用方的是 compute 回调自己的错误。

use thiserror::Error;

/// 缓存系统错误类型枚举
#[derive(Error, Debug)]
pub enum CacheError {
    /// 序列化或反序列化失败
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Redis 协议或连接错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// 存储后端错误（非 Redis 原生错误）
    #[error("Backend error: {0}")]
    BackendError(String),

    /// 连接或命令超时
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 非法的 glob 模式
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// 缓存操作结果类型别名
pub type Result<T> = std::result::Result<T, CacheError>;
