//! # Local Read Models
//!
//! Client-side caches of ledger data that the UI reads from instead of
//! querying the node on every render. Two models exist: known accounts and
//! observed blocks.
//!
//! ## Update Flow
//!
//! ```text
//! initialize()
//!     │
//!     ├─ abort previous poller
//!     ├─ clear cached entries
//!     ├─ first fetch ──▶ publish updates      (error → ReadModelError::Init)
//!     └─ spawn poller ──▶ fetch every interval ──▶ publish new entries
//! ```
//!
//! Updates are published on a `tokio::sync::broadcast` channel. Subscribers
//! that register before `initialize()` observe the first fetch's updates.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use ledgergov_common::{Address, LedgerClient, LedgerError};

/// Broadcast buffer per model.
pub const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

// ════════════════════════════════════════════════════════════════════════════════
// TYPES
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadModelKind {
    Accounts,
    Blocks,
}

impl ReadModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadModelKind::Accounts => "accounts",
            ReadModelKind::Blocks => "blocks",
        }
    }
}

impl fmt::Display for ReadModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single inbound change to a read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadModelUpdate {
    AccountAdded(Address),
    BlockAdded(u64),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadModelError {
    #[error("{kind} read model failed to initialize: {source}")]
    Init {
        kind: ReadModelKind,
        source: LedgerError,
    },

    #[error("{0} read model closed its update channel")]
    Closed(ReadModelKind),
}

// ════════════════════════════════════════════════════════════════════════════════
// TRAIT
// ════════════════════════════════════════════════════════════════════════════════

/// A local cache fed by the ledger.
#[async_trait]
pub trait ReadModel: Send + Sync {
    fn kind(&self) -> ReadModelKind;

    /// Registers a listener for subsequent updates.
    fn subscribe(&self) -> broadcast::Receiver<ReadModelUpdate>;

    /// (Re)initializes the model. Drops cached entries and restarts feeding.
    async fn initialize(&self) -> Result<(), ReadModelError>;

    /// Whether the underlying source currently has no entries at all.
    async fn is_empty(&self) -> Result<bool, ReadModelError>;
}

// ════════════════════════════════════════════════════════════════════════════════
// LEDGER-BACKED MODEL
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct Entries {
    accounts: BTreeSet<Address>,
    latest_block: Option<u64>,
}

/// Read model that polls a [`LedgerClient`].
pub struct LedgerReadModel {
    kind: ReadModelKind,
    ledger: Arc<dyn LedgerClient>,
    poll_interval: Duration,
    updates: broadcast::Sender<ReadModelUpdate>,
    entries: Arc<RwLock<Entries>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl LedgerReadModel {
    pub fn accounts(ledger: Arc<dyn LedgerClient>, poll_interval: Duration) -> Self {
        Self::new(ReadModelKind::Accounts, ledger, poll_interval)
    }

    pub fn blocks(ledger: Arc<dyn LedgerClient>, poll_interval: Duration) -> Self {
        Self::new(ReadModelKind::Blocks, ledger, poll_interval)
    }

    fn new(kind: ReadModelKind, ledger: Arc<dyn LedgerClient>, poll_interval: Duration) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            kind,
            ledger,
            poll_interval,
            updates,
            entries: Arc::new(RwLock::new(Entries::default())),
            poller: Mutex::new(None),
        }
    }

    /// Cached accounts, sorted.
    pub fn known_accounts(&self) -> Vec<Address> {
        self.entries.read().accounts.iter().copied().collect()
    }

    /// Highest block seen so far.
    pub fn latest_block(&self) -> Option<u64> {
        self.entries.read().latest_block
    }

    async fn poll_once(
        kind: ReadModelKind,
        ledger: &dyn LedgerClient,
        entries: &RwLock<Entries>,
        updates: &broadcast::Sender<ReadModelUpdate>,
    ) -> Result<usize, LedgerError> {
        let mut fresh = Vec::new();
        match kind {
            ReadModelKind::Accounts => {
                let accounts = ledger.accounts().await?;
                let mut guard = entries.write();
                for account in accounts {
                    if guard.accounts.insert(account) {
                        fresh.push(ReadModelUpdate::AccountAdded(account));
                    }
                }
            }
            ReadModelKind::Blocks => {
                let head = ledger.block_number().await?;
                let mut guard = entries.write();
                if guard.latest_block.map_or(true, |seen| head > seen) {
                    guard.latest_block = Some(head);
                    fresh.push(ReadModelUpdate::BlockAdded(head));
                }
            }
        }

        let count = fresh.len();
        for update in fresh {
            // no receivers is fine; the model is still updated
            let _ = updates.send(update);
        }
        Ok(count)
    }

    fn abort_poller(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl ReadModel for LedgerReadModel {
    fn kind(&self) -> ReadModelKind {
        self.kind
    }

    fn subscribe(&self) -> broadcast::Receiver<ReadModelUpdate> {
        self.updates.subscribe()
    }

    async fn initialize(&self) -> Result<(), ReadModelError> {
        self.abort_poller();
        *self.entries.write() = Entries::default();

        let kind = self.kind;
        Self::poll_once(kind, self.ledger.as_ref(), &self.entries, &self.updates)
            .await
            .map_err(|source| ReadModelError::Init { kind, source })?;

        let ledger = Arc::clone(&self.ledger);
        let entries = Arc::clone(&self.entries);
        let updates = self.updates.clone();
        let interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match Self::poll_once(kind, ledger.as_ref(), &entries, &updates).await {
                    Ok(0) => {}
                    Ok(n) => debug!(model = %kind, new = n, "read model updated"),
                    Err(e) => warn!(model = %kind, error = %e, "read model poll failed"),
                }
            }
        });
        *self.poller.lock() = Some(handle);

        debug!(model = %kind, "read model initialized");
        Ok(())
    }

    async fn is_empty(&self) -> Result<bool, ReadModelError> {
        let kind = self.kind;
        match kind {
            ReadModelKind::Accounts => self
                .ledger
                .accounts()
                .await
                .map(|a| a.is_empty())
                .map_err(|source| ReadModelError::Init { kind, source }),
            ReadModelKind::Blocks => Ok(false),
        }
    }
}

impl Drop for LedgerReadModel {
    fn drop(&mut self) {
        self.abort_poller();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgergov_common::MockLedger;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    #[tokio::test]
    async fn initialize_publishes_existing_accounts() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_accounts(Ok(vec![addr(1), addr(2)]));
        let model = LedgerReadModel::accounts(ledger, Duration::from_secs(60));

        let mut rx = model.subscribe();
        assert_eq!(model.initialize().await, Ok(()));

        assert_eq!(rx.try_recv().ok(), Some(ReadModelUpdate::AccountAdded(addr(1))));
        assert_eq!(rx.try_recv().ok(), Some(ReadModelUpdate::AccountAdded(addr(2))));
        assert_eq!(model.known_accounts(), vec![addr(1), addr(2)]);
    }

    #[tokio::test]
    async fn initialize_failure_is_reported_with_kind() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_block_number(Err(LedgerError::Timeout));
        let model = LedgerReadModel::blocks(ledger, Duration::from_secs(60));

        assert_eq!(
            model.initialize().await,
            Err(ReadModelError::Init {
                kind: ReadModelKind::Blocks,
                source: LedgerError::Timeout
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn poller_publishes_only_new_blocks() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_block_number(Ok(10));
        let model = LedgerReadModel::blocks(ledger.clone(), Duration::from_secs(1));

        let mut rx = model.subscribe();
        assert!(model.initialize().await.is_ok());
        assert_eq!(rx.recv().await.ok(), Some(ReadModelUpdate::BlockAdded(10)));

        ledger.set_block_number(Ok(11));
        assert_eq!(rx.recv().await.ok(), Some(ReadModelUpdate::BlockAdded(11)));
        assert_eq!(model.latest_block(), Some(11));
    }

    #[tokio::test]
    async fn is_empty_reflects_ledger_accounts() {
        let ledger = Arc::new(MockLedger::new());
        let model = LedgerReadModel::accounts(ledger.clone(), Duration::from_secs(60));
        assert_eq!(model.is_empty().await, Ok(true));
        ledger.set_accounts(Ok(vec![addr(9)]));
        assert_eq!(model.is_empty().await, Ok(false));
    }

    #[tokio::test]
    async fn reinitialize_clears_cache() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_accounts(Ok(vec![addr(1)]));
        let model = LedgerReadModel::accounts(ledger.clone(), Duration::from_secs(60));
        assert!(model.initialize().await.is_ok());

        ledger.set_accounts(Ok(vec![addr(3)]));
        assert!(model.initialize().await.is_ok());
        assert_eq!(model.known_accounts(), vec![addr(3)]);
    }
}
