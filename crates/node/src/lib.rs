//! # ledgergov Node Crate
//!
//! Connection bootstrap for a ledger governance client.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      ConnectionSupervisor                         │
//! │                                                                   │
//! │  reset ──▶ wait_for_node ──▶ CollectionSyncGate ──▶ network id    │
//! │              (backoff)        ┌──────────┬────────┐     │         │
//! │                               │ accounts │ blocks │     ▼         │
//! │                               │ model    │ model  │  reconcile    │
//! │                               └──────────┴────────┘     │         │
//! │                                                          ▼         │
//! │                                 Ready | Unsupported | Reload       │
//! └──────────────────────────────────────────────────────────────────┘
//!                 │ Ready
//!                 ▼
//!        BlockWatcher, LedgerHealth
//! ```
//!
//! ## Modules
//! - `backoff`: re-check delay schedule
//! - `attempt`: generation counter for stale-attempt discard
//! - `read_model`: local accounts/blocks caches
//! - `readiness`: first-update gate over both read models
//! - `reconcile`: persisted network vs live network
//! - `supervisor`: the bootstrap state machine
//! - `watcher`: post-bootstrap block follower
//! - `health`: connection summary

pub mod attempt;
pub mod backoff;
pub mod health;
pub mod read_model;
pub mod readiness;
pub mod reconcile;
pub mod supervisor;
pub mod watcher;

pub use attempt::{AttemptCounter, AttemptToken};
pub use backoff::{delay_at, BackoffSchedule, BACKOFF_STEP_MS, INITIAL_PROBE_MS};
pub use health::LedgerHealth;
pub use read_model::{LedgerReadModel, ReadModel, ReadModelError, ReadModelKind, ReadModelUpdate};
pub use readiness::{await_first_event, CollectionSyncGate, ReadModelReadiness, ReadinessError};
pub use reconcile::{decide, reconcile, ReconcileOutcome, Reconciliation, UserPrompt};
pub use supervisor::{
    BootstrapOutcome, ConnectionState, ConnectionSupervisor, SupervisorConfig, SupervisorError,
};
pub use watcher::{BlockWatcher, WatcherError};
