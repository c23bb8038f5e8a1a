//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了连通性检查命令（ping、health、self-test）的实现。

use crate::backend::{KvStore, RedisStore};
use crate::config::Config;
use crate::health::{self, HealthReport};
use anyhow::{bail, Context, Result};

pub async fn ping(config: &Config) -> Result<()> {
    let store = RedisStore::new(&config.store)
        .await
        .context("Failed to connect to Redis")?;
    let reply = store.ping().await.context("PING failed")?;
    println!("{}", reply);
    Ok(())
}

pub async fn health(config: &Config) -> Result<()> {
    let report = match RedisStore::new(&config.store).await {
        Ok(store) => health::check(&store).await,
        Err(e) => HealthReport::unreachable(e),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_ok() {
        bail!("{}", report.message);
    }
    Ok(())
}

pub async fn self_test(config: &Config) -> Result<()> {
    println!("Testing Redis connection...");
    let store = RedisStore::new(&config.store)
        .await
        .context("❌ Redis connection test failed")?;

    let report = health::self_test(&store).await;
    for step in &report.steps {
        let mark = if step.passed { "✅" } else { "❌" };
        println!(
            "{} {:<4} {}",
            mark,
            step.name,
            step.detail.as_deref().unwrap_or_default()
        );
    }

    if !report.passed {
        bail!("❌ Redis connection test failed");
    }
    println!("✅ Redis connection test passed!");
    Ok(())
}
