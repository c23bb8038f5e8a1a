//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了键值存储的健康检查与连接自检。

use crate::backend::{KvStore, PONG};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// 自检写入的探测值
const PROBE_VALUE: &[u8] = b"test_value";

/// 探测键的过期时间（秒），清理失败时也会自动消失
const PROBE_TTL: u64 = 60;

/// 健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

/// 健康报告，可直接序列化为健康检查接口的 JSON 响应
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
            message: "Redis connection successful".to_string(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// 存储不可达（例如连接建立失败）时的报告
    pub fn unreachable(error: impl ToString) -> Self {
        Self {
            status: HealthStatus::Error,
            message: "Redis connection error".to_string(),
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// 检查存储是否存活
///
/// 只有 PING 返回 `PONG` 才算健康；其他回复和错误都报告为 error。
pub async fn check(store: &dyn KvStore) -> HealthReport {
    match store.ping().await {
        Ok(reply) if reply == PONG => HealthReport::ok(),
        Ok(reply) => {
            warn!(reply = %reply, "Unexpected ping reply");
            HealthReport {
                status: HealthStatus::Error,
                message: "Redis connection failed".to_string(),
                error: Some(format!("unexpected ping reply: {}", reply)),
                timestamp: Utc::now(),
            }
        }
        Err(e) => {
            warn!(error = %e, "Redis health check error");
            HealthReport::unreachable(e)
        }
    }
}

/// 自检中的单个步骤
#[derive(Debug, Clone, Serialize)]
pub struct SelfTestStep {
    pub name: &'static str,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 连接自检报告
#[derive(Debug, Clone, Serialize)]
pub struct SelfTestReport {
    pub passed: bool,
    pub probe_key: String,
    pub steps: Vec<SelfTestStep>,
}

impl SelfTestReport {
    fn record(&mut self, name: &'static str, outcome: std::result::Result<String, String>) -> bool {
        let passed = outcome.is_ok();
        let detail = match outcome {
            Ok(detail) | Err(detail) => Some(detail),
        };
        self.steps.push(SelfTestStep {
            name,
            passed,
            detail,
        });
        self.passed &= passed;
        passed
    }
}

/// 连接自检：PING，写入探测键，读回比对，删除探测键
///
/// 遇到第一个失败的步骤即停止；写入成功后无论读回是否一致都会尝试清理。
pub async fn self_test(store: &dyn KvStore) -> SelfTestReport {
    let probe_key = format!("rtcache:self-test:{}", uuid::Uuid::new_v4().simple());
    let mut report = SelfTestReport {
        passed: true,
        probe_key: probe_key.clone(),
        steps: Vec::new(),
    };

    let ping = match store.ping().await {
        Ok(reply) if reply == PONG => Ok(reply),
        Ok(reply) => Err(format!("unexpected ping reply: {}", reply)),
        Err(e) => Err(e.to_string()),
    };
    if !report.record("ping", ping) {
        return report;
    }

    let set = store
        .set(&probe_key, PROBE_VALUE.to_vec(), PROBE_TTL)
        .await
        .map(|_| "stored probe value".to_string())
        .map_err(|e| e.to_string());
    if !report.record("set", set) {
        return report;
    }

    let get = match store.get(&probe_key).await {
        Ok(Some(value)) if value == PROBE_VALUE => Ok("probe value matches".to_string()),
        Ok(Some(value)) => Err(format!(
            "probe value mismatch: {}",
            String::from_utf8_lossy(&value)
        )),
        Ok(None) => Err("probe value missing".to_string()),
        Err(e) => Err(e.to_string()),
    };
    report.record("get", get);

    let del = match store.del(&[probe_key.clone()]).await {
        Ok(1) => Ok("probe key removed".to_string()),
        Ok(n) => Err(format!("expected to remove 1 key, removed {}", n)),
        Err(e) => Err(e.to_string()),
    };
    report.record("del", del);

    if report.passed {
        info!("Redis connection self-test passed");
    } else {
        warn!(probe_key = %report.probe_key, "Redis connection self-test failed");
    }
    report
}
