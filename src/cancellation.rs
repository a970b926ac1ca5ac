//! Supersession of in-flight translations per UI context.
//! A reader selecting new text in the same page context cancels the
//! translation still running for the previous selection. Each request holds
//! a guard; the registry entry is released when the guard drops.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct ActiveRequest {
    token: CancellationToken,
    generation: u64,
}

pub struct SupersedeRegistry {
    active: Mutex<HashMap<String, ActiveRequest>>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

impl SupersedeRegistry {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel whatever is running for `context_id` and register a new request.
    pub fn supersede(self: &Arc<Self>, context_id: &str) -> RequestGuard {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.shutdown.child_token();

        let previous = self.active.lock().insert(
            context_id.to_string(),
            ActiveRequest {
                token: token.clone(),
                generation,
            },
        );
        if let Some(previous) = previous {
            debug!(
                context_id,
                superseded_generation = previous.generation,
                generation,
                "superseding in-flight translation"
            );
            previous.token.cancel();
        }

        RequestGuard {
            token,
            generation,
            context: Some((Arc::clone(self), context_id.to_string())),
        }
    }

    /// A request with no UI context; cancelled only by shutdown.
    pub fn detached(&self) -> RequestGuard {
        RequestGuard {
            token: self.shutdown.child_token(),
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            context: None,
        }
    }

    /// Cancel every in-flight request, current and future. Used on shutdown.
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }

    pub fn active_contexts(&self) -> usize {
        self.active.lock().len()
    }

    fn release(&self, context_id: &str, generation: u64) {
        let mut active = self.active.lock();
        if active
            .get(context_id)
            .is_some_and(|request| request.generation == generation)
        {
            active.remove(context_id);
        }
    }
}

impl Default for SupersedeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the lifetime of one request.
pub struct RequestGuard {
    token: CancellationToken,
    generation: u64,
    context: Option<(Arc<SupersedeRegistry>, String)>,
}

impl RequestGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn is_superseded(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if let Some((registry, context_id)) = self.context.take() {
            registry.release(&context_id, self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_cancels_previous_in_same_context() {
        let registry = Arc::new(SupersedeRegistry::new());
        let first = registry.supersede("page-1");
        let other = registry.supersede("page-2");
        assert!(!first.is_superseded());

        let second = registry.supersede("page-1");
        assert!(first.is_superseded());
        assert!(!second.is_superseded());
        assert!(!other.is_superseded());
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn stale_guard_does_not_release_newer_request() {
        let registry = Arc::new(SupersedeRegistry::new());
        let first = registry.supersede("page-1");
        let second = registry.supersede("page-1");
        drop(first);
        assert_eq!(registry.active_contexts(), 1);

        drop(second);
        assert_eq!(registry.active_contexts(), 0);
    }

    #[test]
    fn cancel_all_reaches_detached_and_contextual_requests() {
        let registry = Arc::new(SupersedeRegistry::new());
        let detached = registry.detached();
        let contextual = registry.supersede("page-1");

        registry.cancel_all();
        assert!(detached.is_superseded());
        assert!(contextual.is_superseded());
        assert!(registry.detached().is_superseded());
    }
}
