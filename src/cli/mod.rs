//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rtcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Log filter used when RUST_LOG is not set"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "ping", about = "Send PING to the store")]
    Ping,

    #[command(name = "health", about = "Print a JSON health report")]
    Health,

    #[command(name = "self-test", about = "Run the connection self-test")]
    SelfTest,

    #[command(name = "get", about = "Print a cached value as JSON")]
    Get(KeyArgs),

    #[command(name = "del", about = "Invalidate a single key")]
    Del(KeyArgs),

    #[command(name = "del-pattern", about = "Invalidate every key matching a glob pattern")]
    DelPattern(PatternArgs),

    #[command(name = "keys", about = "List keys matching a glob pattern")]
    Keys(PatternArgs),
}

#[derive(Parser, Debug)]
pub struct KeyArgs {
    #[arg(help = "Cache key, e.g. chat:42")]
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct PatternArgs {
    #[arg(help = "Glob pattern, e.g. 'chats:user:42*'")]
    pub pattern: String,
}

mod keys;
mod status;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("rtcache", &cli.log_level);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match &cli.command {
        Commands::Ping => status::ping(&config).await,
        Commands::Health => status::health(&config).await,
        Commands::SelfTest => status::self_test(&config).await,
        Commands::Get(args) => keys::get(&config, args).await,
        Commands::Del(args) => keys::del(&config, args).await,
        Commands::DelPattern(args) => keys::del_pattern(&config, args).await,
        Commands::Keys(args) => keys::list(&config, args).await,
    }
}
