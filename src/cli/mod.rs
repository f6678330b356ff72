//! CLI for the stampede-less cache
//!
//! Provides subcommands to inspect and exercise the configured store:
//! - `get`, `set`, `delete`: single-key operations through the stampede-less layer
//! - `flush`: drop a whole group, or the whole store
//! - `simulate`: concurrent read-through traffic with hit/compute counts

pub mod simulate;
pub mod store;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::cache::CacheFactory;
use crate::infrastructure::logging;
use crate::infrastructure::stampede::StampedelessCache;

/// Read-through object cache with TTL jitter and stampede locks
#[derive(Parser)]
#[command(name = "stampedeless-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read a key
    Get(store::GetArgs),

    /// Write a key with a jittered TTL
    Set(store::SetArgs),

    /// Delete a key and its lock key
    Delete(store::DeleteArgs),

    /// Delete every key of a group, or everything
    Flush(store::FlushArgs),

    /// Run concurrent read-through lookups against the store
    Simulate(simulate::SimulateArgs),
}

/// Loads configuration, installs logging and connects the configured store
pub(crate) async fn bootstrap() -> anyhow::Result<(AppConfig, StampedelessCache)> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    let store = CacheFactory::new().create(&config.cache_config()?).await?;
    let cache = StampedelessCache::with_config(store, config.stampede_config()?);

    Ok((config, cache))
}
