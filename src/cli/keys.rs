//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了键查看与失效命令的实现。

use crate::backend::KvStore;
use crate::cli::{KeyArgs, PatternArgs};
use crate::client::CacheClient;
use crate::config::Config;
use anyhow::{Context, Result};

async fn client(config: &Config) -> Result<CacheClient> {
    CacheClient::connect(config)
        .await
        .context("Failed to connect to Redis")
}

pub async fn get(config: &Config, args: &KeyArgs) -> Result<()> {
    let client = client(config).await?;
    match client.get::<serde_json::Value>(&args.key).await {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("(nil)"),
    }
    Ok(())
}

pub async fn del(config: &Config, args: &KeyArgs) -> Result<()> {
    let client = client(config).await?;
    let removed = client.delete(&args.key).await;
    println!("(integer) {}", removed);
    Ok(())
}

pub async fn del_pattern(config: &Config, args: &PatternArgs) -> Result<()> {
    let client = client(config).await?;
    let removed = client.delete_by_pattern(&args.pattern).await;
    println!("(integer) {}", removed);
    Ok(())
}

pub async fn list(config: &Config, args: &PatternArgs) -> Result<()> {
    let client = client(config).await?;
    let keys = client
        .store()
        .keys(&args.pattern)
        .await
        .with_context(|| format!("Failed to list keys for '{}'", args.pattern))?;
    if keys.is_empty() {
        println!("(empty list)");
    }
    for (i, key) in keys.iter().enumerate() {
        println!("{}) {}", i + 1, key);
    }
    Ok(())
}
