//! Invalidation infrastructure - ordered hook chains

mod chain;

pub use chain::{InvalidationChain, InvalidationFailure, InvalidationReport};
