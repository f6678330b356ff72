//! Stampede mitigation - jittered, lock-guarded writes and the read-through facade

mod config;
mod read_through;
mod stampedeless;

pub use config::StampedeConfig;
pub use read_through::ReadThroughCache;
pub use stampedeless::{Fetched, StampedelessCache};
