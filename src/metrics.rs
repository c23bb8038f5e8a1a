//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存组件的指标收集功能。

use dashmap::DashMap;
use lazy_static::lazy_static;
use std::fmt::Write;
use tracing::{span, Level};

/// 指标收集器
///
/// 以缓存实例名称为维度收集计数和耗时
#[derive(Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    /// key: "cache:op:result"
    pub requests_total: DashMap<String, u64>,
    /// 操作耗时（累计秒数和次数）
    /// key: "cache:op" -> (total_duration_secs, count)
    pub operation_duration: DashMap<String, (f64, u64)>,
    /// 按模式失效删除的键总数
    /// key: cache
    pub invalidated_keys: DashMap<String, u64>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

impl Metrics {
    /// 记录请求指标
    ///
    /// * `cache` - 缓存实例名称
    /// * `op` - 操作类型（get/set/delete/compute）
    /// * `result` - 操作结果（hit/miss/ok/error...）
    pub fn record_request(&self, cache: &str, op: &str, result: &str) {
        let span = span!(Level::TRACE, "cache_request", cache, op, result);
        let _enter = span.enter();
        let key = format!("{}:{}:{}", cache, op, result);
        *self.requests_total.entry(key).or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, cache: &str, op: &str, duration_secs: f64) {
        let key = format!("{}:{}", cache, op);
        let mut entry = self.operation_duration.entry(key).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 累加失效删除的键数量
    pub fn record_invalidated(&self, cache: &str, count: u64) {
        *self
            .invalidated_keys
            .entry(cache.to_string())
            .or_insert(0) += count;
    }

    /// 读取某个请求计数
    pub fn request_count(&self, cache: &str, op: &str, result: &str) -> u64 {
        self.requests_total
            .get(&format!("{}:{}:{}", cache, op, result))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// 读取失效删除的键总数
    pub fn invalidated_count(&self, cache: &str) -> u64 {
        self.invalidated_keys.get(cache).map(|v| *v).unwrap_or(0)
    }
}

/// 获取指标字符串
///
/// 以 Prometheus 文本格式输出所有指标
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let mut output = String::new();

    for entry in metrics.requests_total.iter() {
        let parts: Vec<&str> = entry.key().rsplitn(3, ':').collect();
        if let [result, op, cache] = parts.as_slice() {
            let _ = writeln!(
                output,
                "cache_requests_total{{cache=\"{}\", operation=\"{}\", result=\"{}\"}} {}",
                cache,
                op,
                result,
                entry.value()
            );
        }
    }
    for entry in metrics.operation_duration.iter() {
        if let Some((cache, op)) = entry.key().rsplit_once(':') {
            let (total, count) = *entry.value();
            let _ = writeln!(
                output,
                "cache_operation_duration_seconds_sum{{cache=\"{}\", operation=\"{}\"}} {}",
                cache, op, total
            );
            let _ = writeln!(
                output,
                "cache_operation_duration_seconds_count{{cache=\"{}\", operation=\"{}\"}} {}",
                cache, op, count
            );
        }
    }
    for entry in metrics.invalidated_keys.iter() {
        let _ = writeln!(
            output,
            "cache_invalidated_keys_total{{cache=\"{}\"}} {}",
            entry.key(),
            entry.value()
        );
    }
    output
}
