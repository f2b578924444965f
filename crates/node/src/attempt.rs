//! Bootstrap attempt generations.
//!
//! Every pass through `connect()` gets a fresh generation. Work started by
//! an attempt carries its [`AttemptToken`]; once a newer attempt begins, the
//! token reports stale and any late result is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic generation counter shared by all tokens it issues.
#[derive(Debug, Clone, Default)]
pub struct AttemptCounter {
    current: Arc<AtomicU64>,
}

impl AttemptCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new attempt, invalidating every earlier token.
    pub fn begin(&self) -> AttemptToken {
        let generation = self.current.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        AttemptToken {
            generation,
            current: Arc::clone(&self.current),
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Handle identifying one attempt.
#[derive(Debug, Clone)]
pub struct AttemptToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl AttemptToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False once a newer attempt has begun.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}
