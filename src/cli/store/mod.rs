//! Single-key commands
//!
//! With the `in_memory` backend every invocation starts with an empty store,
//! so these are mostly useful against `redis` or `layered`.

use std::time::Duration;

use clap::Args;

use crate::domain::DomainError;
use crate::domain::cache::{Cache, CacheExt, CacheKey, DEFAULT_GROUP};

#[derive(Args, Clone)]
pub struct GetArgs {
    /// Cache group
    #[arg(long, default_value = DEFAULT_GROUP)]
    pub group: String,

    pub key: String,
}

#[derive(Args, Clone)]
pub struct SetArgs {
    /// Cache group
    #[arg(long, default_value = DEFAULT_GROUP)]
    pub group: String,

    pub key: String,

    /// JSON value; anything that is not valid JSON is stored as a string
    pub value: String,

    /// Expiration in seconds before jitter; 0 uses the store default
    #[arg(long, default_value_t = 3600)]
    pub ttl: u64,
}

#[derive(Args, Clone)]
pub struct DeleteArgs {
    /// Cache group
    #[arg(long, default_value = DEFAULT_GROUP)]
    pub group: String,

    pub key: String,
}

#[derive(Args, Clone)]
#[group(required = true, multiple = false)]
pub struct FlushArgs {
    /// Delete every key of this group
    #[arg(long)]
    pub group: Option<String>,

    /// Delete every key in the store (only the key prefix on Redis)
    #[arg(long)]
    pub all: bool,
}

pub async fn get(args: GetArgs) -> anyhow::Result<()> {
    let (_, cache) = super::bootstrap().await?;
    let key = CacheKey::new(args.group, args.key);

    // Inspection must not steal the regeneration lock
    match cache.peek::<serde_json::Value>(&key).await? {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            if let Some(remaining) = cache.store().ttl_of(&key).await? {
                println!("(expires in {:.1}s)", remaining.as_secs_f64());
            }
        }
        None => println!("(miss) {}", key),
    }

    Ok(())
}

pub async fn set(args: SetArgs) -> anyhow::Result<()> {
    let (_, cache) = super::bootstrap().await?;
    let key = CacheKey::new(args.group, args.key);
    let value = parse_value(&args.value);

    let ttl = cache.set(&key, &value, Duration::from_secs(args.ttl)).await?;
    println!("stored {} (ttl {}s)", key, ttl.as_secs());

    Ok(())
}

pub async fn delete(args: DeleteArgs) -> anyhow::Result<()> {
    let (_, cache) = super::bootstrap().await?;
    let key = CacheKey::new(args.group, args.key);

    if cache.delete(&key).await? {
        println!("deleted {}", key);
    } else {
        println!("not found {}", key);
    }

    Ok(())
}

pub async fn flush(args: FlushArgs) -> anyhow::Result<()> {
    let (_, cache) = super::bootstrap().await?;

    match flush_store(cache.store().as_ref(), &args).await? {
        Some(deleted) => println!("deleted {} keys", deleted),
        None => println!("flushed {}", cache.store().backend_name()),
    }

    Ok(())
}

/// Deletes a group, or everything; returns the count when the backend knows it
async fn flush_store(store: &dyn Cache, args: &FlushArgs) -> Result<Option<usize>, DomainError> {
    match &args.group {
        Some(group) => {
            let deleted = store.delete_pattern(&CacheKey::group_pattern(group)).await?;
            tracing::info!(group = %group, deleted, "Flushed cache group");
            Ok(Some(deleted))
        }
        None => {
            store.clear().await?;
            tracing::info!(backend = store.backend_name(), "Flushed cache");
            Ok(None)
        }
    }
}

fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
