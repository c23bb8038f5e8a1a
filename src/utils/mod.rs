//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 工具模块：glob 模式匹配与日志脱敏。

pub mod glob;
pub mod redaction;

pub use glob::GlobPattern;
