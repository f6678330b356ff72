//! Priority-ordered invalidation chain

use std::sync::Arc;

use crate::domain::cache::CacheKey;
use crate::domain::invalidation::{HookControl, InvalidationHook};
use crate::infrastructure::observability::{record_invalidation, record_store_error};
use crate::infrastructure::stampede::StampedelessCache;

struct RegisteredHook<E> {
    priority: i32,
    hook: Arc<dyn InvalidationHook<E>>,
}

/// A key a hook asked for that could not be deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationFailure {
    pub hook: String,
    pub key: CacheKey,
    pub error: String,
}

/// Outcome of dispatching one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Names of the hooks that ran, in order
    pub hooks_run: Vec<String>,
    /// Keys that existed and were deleted
    pub keys_deleted: usize,
    pub failures: Vec<InvalidationFailure>,
    /// Set when a hook stopped the chain early
    pub stopped_by: Option<String>,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs invalidation hooks for an event in a fixed order
///
/// Hooks run in ascending priority; hooks with equal priority run in the
/// order they were registered. Every key a hook returns is deleted together
/// with its lock key before the next hook runs.
pub struct InvalidationChain<E> {
    cache: StampedelessCache,
    hooks: Vec<RegisteredHook<E>>,
}

impl<E> InvalidationChain<E> {
    pub fn new(cache: StampedelessCache) -> Self {
        Self {
            cache,
            hooks: Vec::new(),
        }
    }

    pub fn register(&mut self, priority: i32, hook: Arc<dyn InvalidationHook<E>>) -> &mut Self {
        let position = self.hooks.partition_point(|h| h.priority <= priority);

        tracing::debug!(hook = hook.name(), priority, "Registering invalidation hook");
        self.hooks.insert(position, RegisteredHook { priority, hook });
        self
    }

    pub fn with_hook(mut self, priority: i32, hook: Arc<dyn InvalidationHook<E>>) -> Self {
        self.register(priority, hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Hook names in dispatch order
    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.hook.name()).collect()
    }

    pub async fn dispatch(&self, event: &E) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        for registered in &self.hooks {
            let hook = &registered.hook;
            let mut deleted = 0;

            for key in hook.keys_for(event) {
                match self.cache.delete(&key).await {
                    Ok(true) => deleted += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            hook = hook.name(),
                            key = %key,
                            error = %e,
                            "Failed to invalidate cache key"
                        );
                        record_store_error("delete");
                        report.failures.push(InvalidationFailure {
                            hook: hook.name().to_string(),
                            key,
                            error: e.to_string(),
                        });
                    }
                }
            }

            record_invalidation(hook.name(), deleted);
            report.keys_deleted += deleted;
            report.hooks_run.push(hook.name().to_string());

            if hook.control(event) == HookControl::Stop {
                tracing::debug!(hook = hook.name(), "Invalidation chain stopped");
                report.stopped_by = Some(hook.name().to_string());
                break;
            }
        }

        tracing::debug!(
            hooks = report.hooks_run.len(),
            keys_deleted = report.keys_deleted,
            failures = report.failures.len(),
            "Invalidation dispatched"
        );

        report
    }
}

impl<E> std::fmt::Debug for InvalidationChain<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationChain")
            .field("cache", &self.cache)
            .field("hooks", &self.hook_names())
            .finish()
    }
}
