//! # Collection Sync Gate
//!
//! Declares the client "data-ready" once both local read models (accounts
//! and blocks) have delivered their first update.
//!
//! ## Per-Model Flow
//!
//! ```text
//! subscribe() ──▶ initialize() ──▶ accounts && empty? ──yes──▶ ready
//!                                        │
//!                                        no
//!                                        ▼
//!                              await_first_event(rx) ──▶ ready
//!                              (subscription released)
//! ```
//!
//! Both models run concurrently; the gate resolves when both are ready and
//! rejects as soon as either fails to initialize.
//!
//! ## Empty Accounts
//!
//! An accounts model with zero entries never emits an update. That case is
//! checked explicitly after initialization and counts as ready.
//!
//! ## Readiness Flags
//!
//! [`ReadModelReadiness`] flags flip false → true at most once per session
//! and are never reset. Results from a stale attempt are not recorded.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::attempt::AttemptToken;
use crate::read_model::{ReadModel, ReadModelError, ReadModelKind};

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadinessError {
    #[error(transparent)]
    Model(#[from] ReadModelError),
}

// ════════════════════════════════════════════════════════════════════════════════
// FIRST EVENT
// ════════════════════════════════════════════════════════════════════════════════

/// Waits for the first event on `rx`, then drops the receiver.
///
/// A lagged receiver counts as having seen an event. A closed channel is an
/// error: no event will ever arrive.
pub async fn await_first_event<T: Clone>(mut rx: broadcast::Receiver<T>) -> Result<(), RecvError> {
    match rx.recv().await {
        Ok(_) | Err(RecvError::Lagged(_)) => Ok(()),
        Err(RecvError::Closed) => Err(RecvError::Closed),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// READINESS FLAGS
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadModelReadiness {
    pub accounts_ready: bool,
    pub blocks_ready: bool,
}

impl ReadModelReadiness {
    /// Sets the flag for `kind`. Returns true only on the false → true flip.
    pub fn mark(&mut self, kind: ReadModelKind) -> bool {
        let flag = match kind {
            ReadModelKind::Accounts => &mut self.accounts_ready,
            ReadModelKind::Blocks => &mut self.blocks_ready,
        };
        let flipped = !*flag;
        *flag = true;
        flipped
    }

    pub fn all_ready(&self) -> bool {
        self.accounts_ready && self.blocks_ready
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// GATE
// ════════════════════════════════════════════════════════════════════════════════

pub struct CollectionSyncGate {
    accounts: Arc<dyn ReadModel>,
    blocks: Arc<dyn ReadModel>,
    readiness: Mutex<ReadModelReadiness>,
}

impl CollectionSyncGate {
    pub fn new(accounts: Arc<dyn ReadModel>, blocks: Arc<dyn ReadModel>) -> Self {
        Self {
            accounts,
            blocks,
            readiness: Mutex::new(ReadModelReadiness::default()),
        }
    }

    /// Session readiness flags.
    pub fn readiness(&self) -> ReadModelReadiness {
        *self.readiness.lock()
    }

    /// Resolves once both read models have received their first update.
    ///
    /// Returns `Ok(true)` when both were recorded for `attempt`, `Ok(false)`
    /// if the attempt went stale before completion.
    pub async fn await_readiness(&self, attempt: &AttemptToken) -> Result<bool, ReadinessError> {
        let (accounts, blocks) = tokio::try_join!(
            self.watch(self.accounts.as_ref(), attempt),
            self.watch(self.blocks.as_ref(), attempt),
        )?;
        Ok(accounts && blocks)
    }

    async fn watch(&self, model: &dyn ReadModel, attempt: &AttemptToken) -> Result<bool, ReadinessError> {
        let kind = model.kind();
        let rx = model.subscribe();
        model.initialize().await?;

        if kind == ReadModelKind::Accounts && model.is_empty().await? {
            drop(rx);
            debug!(model = %kind, "no entries at subscription time, ready without update");
        } else {
            await_first_event(rx)
                .await
                .map_err(|_| ReadModelError::Closed(kind))?;
        }

        Ok(self.record(kind, attempt))
    }

    fn record(&self, kind: ReadModelKind, attempt: &AttemptToken) -> bool {
        if !attempt.is_current() {
            debug!(model = %kind, generation = attempt.generation(), "discarding stale readiness");
            return false;
        }
        if self.readiness.lock().mark(kind) {
            info!(model = %kind, "read model ready");
        }
        true
    }
}
