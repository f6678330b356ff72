//! Stampede mitigation settings

use std::time::Duration;

use crate::domain::DomainError;

/// Tuning for [`super::StampedelessCache`]
#[derive(Debug, Clone, PartialEq)]
pub struct StampedeConfig {
    /// How long a regeneration lock is held before another caller may retry
    pub lock_ttl: Duration,
    /// Fraction of an entry's TTL, counted back from expiry, during which
    /// one caller is sent to regenerate early
    pub early_refresh_ratio: f64,
    /// Maximum jitter added by `set`, as a fraction of the expiration
    pub jitter_ratio: f64,
}

impl Default for StampedeConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(30),
            early_refresh_ratio: 0.1,
            jitter_ratio: 0.1,
        }
    }
}

impl StampedeConfig {
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_early_refresh_ratio(mut self, ratio: f64) -> Self {
        self.early_refresh_ratio = ratio;
        self
    }

    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    /// Turns off early regeneration; entries are served until they expire
    pub fn without_early_refresh(self) -> Self {
        self.with_early_refresh_ratio(0.0)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.lock_ttl.is_zero() {
            return Err(DomainError::validation("lock_ttl must be greater than zero"));
        }

        if !(0.0..1.0).contains(&self.early_refresh_ratio) {
            return Err(DomainError::validation(format!(
                "early_refresh_ratio must be in [0, 1), got {}",
                self.early_refresh_ratio
            )));
        }

        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(DomainError::validation(format!(
                "jitter_ratio must be in [0, 1], got {}",
                self.jitter_ratio
            )));
        }

        Ok(())
    }
}
