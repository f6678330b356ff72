//! Infrastructure layer - store backends, stampede mitigation and cached lookups

pub mod cache;
pub mod invalidation;
pub mod logging;
pub mod observability;
pub mod services;
pub mod stampede;
