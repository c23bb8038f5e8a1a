//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis 风格的 glob 模式匹配。
//!
//! 支持 `*`、`?`、`[abc]`、`[a-z]`、`[^a]` 以及 `\x` 转义，与 `KEYS` / `SCAN MATCH`
//! 的语义一致，匹配整个键。

use crate::error::{CacheError, Result};
use regex::Regex;

/// 需要转义才能按字面匹配的 glob 元字符
const GLOB_META: [char; 5] = ['*', '?', '[', ']', '\\'];

/// 编译后的 glob 模式
#[derive(Debug, Clone)]
pub struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    /// 编译 glob 模式
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&translate(pattern)?)
            .map_err(|e| CacheError::InvalidPattern(format!("{}: {}", pattern, e)))?;
        Ok(Self { regex })
    }

    /// 判断键是否匹配
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// 转义 glob 元字符，使输入按字面匹配
pub fn escape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if GLOB_META.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_literal(re: &mut String, c: char) {
    let mut buf = [0u8; 4];
    re.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

fn push_class_char(re: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~' | '-') {
        re.push('\\');
    }
    re.push(c);
}

/// 输出字符类成员；`a-z` 为范围，两端颠倒时交换（与 Redis 一致），
/// 首尾或转义的 `-` 按字面处理
fn push_class_members(re: &mut String, members: &[(char, bool)]) {
    let mut i = 0;
    while i < members.len() {
        let (c, _) = members[i];
        match (members.get(i + 1), members.get(i + 2)) {
            (Some(('-', false)), Some(&(end, _))) => {
                let (lo, hi) = if c <= end { (c, end) } else { (end, c) };
                push_class_char(re, lo);
                re.push('-');
                push_class_char(re, hi);
                i += 3;
            }
            _ => {
                push_class_char(re, c);
                i += 1;
            }
        }
    }
}

fn translate(pattern: &str) -> Result<String> {
    let mut re = String::with_capacity(pattern.len() * 2 + 8);
    re.push_str("(?s)^");

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '\\' => push_literal(&mut re, chars.next().unwrap_or('\\')),
            '[' => {
                re.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    re.push('^');
                }
                // (字符, 是否转义)
                let mut members: Vec<(char, bool)> = Vec::new();
                let mut closed = false;
                while let Some(n) = chars.next() {
                    match n {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some(escaped) => members.push((escaped, true)),
                            None => break,
                        },
                        other => members.push((other, false)),
                    }
                }
                if !closed || members.is_empty() {
                    return Err(CacheError::InvalidPattern(format!(
                        "{}: unterminated or empty character class",
                        pattern
                    )));
                }
                push_class_members(&mut re, &members);
                re.push(']');
            }
            other => push_literal(&mut re, other),
        }
    }

    re.push('$');
    Ok(re)
}
