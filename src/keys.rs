//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存键构造工具。
//!
//! 键遵循 `namespace:part:part` 约定。失效模式在失效时才计算，不会被存储；
//! 构造模式时各片段中的 glob 元字符会被转义，避免某个 id 里的 `*` 或 `[`
//! 意外扩大失效范围。

use crate::utils::glob;
use std::fmt;

/// 命名空间分隔符
pub const SEPARATOR: char = ':';

/// 缓存键构造器
///
/// ```
/// use rtcache::keys::CacheKey;
///
/// let key = CacheKey::new("chats").part("user").part(42);
/// assert_eq!(key.to_string(), "chats:user:42");
/// assert_eq!(key.prefix_pattern(), "chats:user:42*");
/// assert_eq!(key.children_pattern(), "chats:user:42:*");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    parts: Vec<String>,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            parts: vec![namespace.into()],
        }
    }

    /// 追加一个片段
    pub fn part(mut self, part: impl fmt::Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    /// 以该键为前缀的失效模式（`key*`）
    ///
    /// 与原键逐字前缀匹配，因此 `chats:user:42*` 也会命中 `chats:user:420`。
    pub fn prefix_pattern(&self) -> String {
        format!("{}*", self.escaped())
    }

    /// 只匹配该键下级命名空间的失效模式（`key:*`）
    pub fn children_pattern(&self) -> String {
        format!("{}{}*", self.escaped(), SEPARATOR)
    }

    fn escaped(&self) -> String {
        self.parts
            .iter()
            .map(|p| glob::escape(p))
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join(&SEPARATOR.to_string()))
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}
