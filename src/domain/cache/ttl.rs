//! Jittered expiration policies

use std::time::Duration;

use rand::Rng;

const MINUTE_SECS: u64 = 60;
const HOUR_SECS: u64 = 60 * MINUTE_SECS;
const DAY_SECS: u64 = 24 * HOUR_SECS;

/// Base TTL plus a random extension drawn from `[0, jitter_max]`
///
/// Spreading expiry keeps a batch of keys written together from expiring
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub base: Duration,
    pub jitter_max: Duration,
}

impl TtlPolicy {
    pub const fn new(base: Duration, jitter_max: Duration) -> Self {
        Self { base, jitter_max }
    }

    /// A policy without jitter
    pub const fn fixed(base: Duration) -> Self {
        Self::new(base, Duration::ZERO)
    }

    /// Draws a TTL in `[base, base + jitter_max]`
    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.base + jitter(self.jitter_max, rng)
    }

    /// Upper bound of any sampled TTL
    pub fn max(&self) -> Duration {
        self.base + self.jitter_max
    }
}

/// Uniform jitter in `[0, max]` at millisecond resolution
pub fn jitter<R: Rng + ?Sized>(max: Duration, rng: &mut R) -> Duration {
    let max_ms = max.as_millis() as u64;

    if max_ms == 0 {
        return Duration::ZERO;
    }

    Duration::from_millis(rng.gen_range(0..=max_ms))
}

/// TTLs for positive results and for the negative sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupPolicy {
    pub positive: TtlPolicy,
    pub negative: TtlPolicy,
}

impl LookupPolicy {
    pub const fn new(positive: TtlPolicy, negative: TtlPolicy) -> Self {
        Self { positive, negative }
    }

    /// Same fixed TTL for both outcomes
    pub const fn uniform(ttl: Duration) -> Self {
        Self::new(TtlPolicy::fixed(ttl), TtlPolicy::fixed(ttl))
    }

    /// Policy for the given outcome
    pub fn for_outcome(&self, found: bool) -> &TtlPolicy {
        if found { &self.positive } else { &self.negative }
    }
}

/// Policies used by the cached lookups
pub mod presets {
    use super::*;

    /// Term id by slug or name
    pub const TERM_BY_FIELD: LookupPolicy = LookupPolicy::new(
        TtlPolicy::fixed(Duration::from_secs(4 * HOUR_SECS)),
        TtlPolicy::fixed(Duration::from_secs(15 * MINUTE_SECS)),
    );

    /// Post id by URL; a zero id is cached like any other answer
    pub const URL_TO_POST_ID: LookupPolicy = LookupPolicy::uniform(Duration::from_secs(3 * HOUR_SECS));

    /// Post count per author and post types
    pub const USER_POSTS_COUNT: LookupPolicy = LookupPolicy::uniform(Duration::from_secs(5 * MINUTE_SECS));

    /// Attachment id by file URL
    pub const ATTACHMENT_URL: LookupPolicy = LookupPolicy::new(
        TtlPolicy::new(Duration::from_secs(DAY_SECS), Duration::from_secs(12 * HOUR_SECS)),
        TtlPolicy::new(Duration::from_secs(12 * HOUR_SECS), Duration::from_secs(4 * HOUR_SECS)),
    );

    /// Redirect target for a retired slug
    pub const OLD_SLUG_REDIRECT: LookupPolicy = LookupPolicy::new(
        TtlPolicy::fixed(Duration::from_secs(7 * DAY_SECS)),
        TtlPolicy::new(Duration::from_secs(12 * HOUR_SECS), Duration::from_secs(12 * HOUR_SECS)),
    );

    /// Page id by title or path
    pub const PAGE_LOOKUP: LookupPolicy = LookupPolicy::new(
        TtlPolicy::new(Duration::from_secs(HOUR_SECS), Duration::from_secs(15 * MINUTE_SECS)),
        TtlPolicy::fixed(Duration::from_secs(15 * MINUTE_SECS)),
    );

    /// Previous/next post query
    pub const ADJACENT_POST: LookupPolicy = LookupPolicy::new(
        TtlPolicy::new(Duration::from_secs(6 * HOUR_SECS), Duration::from_secs(2 * HOUR_SECS)),
        TtlPolicy::new(Duration::from_secs(15 * MINUTE_SECS), Duration::from_secs(15 * MINUTE_SECS)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const MINUTE: Duration = Duration::from_secs(MINUTE_SECS);
    const HOUR: Duration = Duration::from_secs(HOUR_SECS);
    const DAY: Duration = Duration::from_secs(DAY_SECS);

    #[test]
    fn test_sample_stays_within_bounds() {
        let policy = TtlPolicy::new(15 * MINUTE, 15 * MINUTE);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1_000 {
            let ttl = policy.sample_with(&mut rng);
            assert!(ttl >= policy.base);
            assert!(ttl <= policy.max());
        }
    }

    #[test]
    fn test_sample_actually_varies() {
        let policy = TtlPolicy::new(HOUR, HOUR);
        let mut rng = StdRng::seed_from_u64(42);

        let first = policy.sample_with(&mut rng);
        let varied = (0..50).any(|_| policy.sample_with(&mut rng) != first);
        assert!(varied);
    }

    #[test]
    fn test_fixed_policy_has_no_jitter() {
        let policy = TtlPolicy::fixed(DAY);
        assert_eq!(policy.sample(), DAY);
    }

    #[test]
    fn test_for_outcome() {
        let policy = presets::TERM_BY_FIELD;
        assert_eq!(policy.for_outcome(true).base, 4 * HOUR);
        assert_eq!(policy.for_outcome(false).base, 15 * MINUTE);
    }

    #[test]
    fn test_preset_bounds() {
        assert_eq!(presets::ATTACHMENT_URL.positive.max(), 36 * HOUR);
        assert_eq!(presets::ATTACHMENT_URL.negative.max(), 16 * HOUR);
        assert_eq!(presets::ADJACENT_POST.negative.max(), 30 * MINUTE);
        assert_eq!(presets::OLD_SLUG_REDIRECT.positive.base, 7 * DAY);
    }
}
