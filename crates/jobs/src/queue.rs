use std::sync::atomic::{AtomicU64, Ordering};

/// Best-effort backlog approximation, independent of the transport's own
/// introspection. Incremented on enqueue, decremented on dequeue completion
/// or failure, so the counter cannot drift upward indefinitely. Divergence from the transport's real backlog is
/// expected and diagnosable, not an error.
#[derive(Debug, Default)]
pub struct QueueDepthCounter {
    depth: AtomicU64,
}

impl QueueDepthCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self) -> u64 {
        self.depth.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Saturating at zero: a decrement without a matching increment (for
    /// example after a process restart) must not underflow.
    pub fn decr(&self) -> u64 {
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| d.checked_sub(1));
        self.depth.load(Ordering::Relaxed)
    }

    pub fn depth(&self) -> u64 {
        self.depth.load(Ordering::Relaxed)
    }

    /// Compare against the transport's native backlog count. Returns the
    /// signed divergence (approximate - actual) and logs it; a non-zero
    /// delta is a diagnostic datum, not an error condition.
    pub fn reconcile(&self, actual: u64) -> i64 {
        let approximate = self.depth();
        let delta = approximate as i64 - actual as i64;
        if delta != 0 {
            tracing::debug!(
                approximate,
                actual,
                delta,
                "queue depth counter diverges from transport backlog"
            );
        }
        delta
    }
}
