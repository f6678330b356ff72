//! Cache metrics recorded through the `metrics` facade
//!
//! Nothing is exported unless the embedding application installs a
//! recorder; without one every call here is a no-op.

use metrics::counter;

/// Records the outcome of a read-through lookup (`hit`, `negative_hit`, `miss`)
pub fn record_cache_lookup(group: &str, outcome: &'static str) {
    let labels = [("group", group.to_string()), ("outcome", outcome.to_string())];

    counter!("cache_lookups_total", &labels).increment(1);
}

/// Records one run of a caller-supplied compute function
pub fn record_cache_compute(group: &str) {
    counter!("cache_computes_total", "group" => group.to_string()).increment(1);
}

/// Records a store failure that was absorbed (fail-open)
pub fn record_store_error(operation: &'static str) {
    counter!("cache_store_errors_total", "operation" => operation).increment(1);
}

/// Records one invalidation hook run and the number of keys it deleted
pub fn record_invalidation(hook: &str, keys_deleted: usize) {
    let labels = [("hook", hook.to_string())];

    counter!("cache_invalidations_total", &labels).increment(1);
    counter!("cache_invalidated_keys_total", &labels).increment(keys_deleted as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_lookup("terms", "hit");
        record_cache_compute("terms");
        record_store_error("get");
        record_invalidation("term_cache", 2);
    }
}
