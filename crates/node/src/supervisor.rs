//! # Connection Supervisor
//!
//! Owns the bootstrap state machine: connect to the ledger node, wait out
//! synchronization, wait for the local read models, validate the network and
//! reconcile persisted config.
//!
//! ## Bootstrap Sequence
//!
//! ```text
//! connect()
//!   │
//!   ├─ 1. begin attempt (new generation), reset transport
//!   ├─ 2. wait_for_node()
//!   │       probe after 100ms, then backoff 1000, 3000, 7000, ...
//!   │       not connected      → retry
//!   │       injected wallet    → ready
//!   │       synced / sync err  → ready
//!   │       syncing            → retry
//!   ├─ 3. readiness gate
//!   │       embedded: race against watchdog
//!   │                 timeout → restart immediately
//!   │                 error   → restart after restart_delay
//!   │       browser:  await directly, error → restart after restart_delay
//!   ├─ 4. bind provider on every contract binding
//!   ├─ 5. query network id (transport error → Err)
//!   │       unsupported → alert, Unsupported
//!   └─ 6. reconcile → Ready | Reload
//! ```
//!
//! ## State
//!
//! [`ConnectionState`] is written only by this loop and published on a
//! `tokio::sync::watch` channel for observers.
//!
//! ## Stale Attempts
//!
//! The gate runs as a spawned task tagged with the attempt's
//! [`AttemptToken`]. On watchdog expiry the task is aborted and a new
//! generation begins, so anything it still records is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use ledgergov_common::{
    parse_network_id, ClientConfig, ContractBinding, ExecutionContext, LedgerClient, LedgerError,
    NetworkConfigStore, NetworkIdentity, NetworkTable, ProviderKind, StoreError, SyncStatus,
};

use crate::attempt::{AttemptCounter, AttemptToken};
use crate::backoff::{BackoffSchedule, INITIAL_PROBE_MS};
use crate::readiness::{CollectionSyncGate, ReadinessError};
use crate::reconcile::{reconcile, ReconcileOutcome, UserPrompt};

// ════════════════════════════════════════════════════════════════════════════════
// TYPES
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Waiting on the node. `attempt` counts probes in this wait.
    Connecting { attempt: u32, backoff_ms: u64 },
    ConnectedSyncing,
    ConnectedReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Bootstrap finished. `ready` is true iff both node and read models
    /// became ready in the final attempt.
    Ready { ready: bool, network: NetworkIdentity },
    /// Live network is not in the table. Terminal until the user switches.
    Unsupported { raw_id: String },
    /// The process must restart to apply a network switch or wipe.
    Reload { wiped: bool },
}

impl BootstrapOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapOutcome::Ready { ready: true, .. })
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to query network id: {0}")]
    NetworkId(#[source] LedgerError),

    #[error("persisted config: {0}")]
    Store(#[from] StoreError),
}

// ════════════════════════════════════════════════════════════════════════════════
// CONFIG
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub context: ExecutionContext,
    pub initial_probe: Duration,
    pub watchdog: Duration,
    pub restart_delay: Duration,
    /// Upper bound on a single backoff delay. `None` keeps the pure doubling.
    pub max_backoff_ms: Option<u64>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            context: ExecutionContext::Browser,
            initial_probe: Duration::from_millis(INITIAL_PROBE_MS),
            watchdog: Duration::from_millis(1000),
            restart_delay: Duration::from_millis(500),
            max_backoff_ms: None,
        }
    }
}

impl From<&ClientConfig> for SupervisorConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            context: config.context,
            initial_probe: Duration::from_millis(config.initial_probe_ms),
            watchdog: Duration::from_millis(config.watchdog_ms),
            restart_delay: Duration::from_millis(config.restart_delay_ms),
            max_backoff_ms: None,
        }
    }
}

impl SupervisorConfig {
    fn backoff(&self) -> BackoffSchedule {
        match self.max_backoff_ms {
            Some(cap) => BackoffSchedule::with_cap(cap),
            None => BackoffSchedule::new(),
        }
    }
}

enum GateStep {
    Ready(bool),
    Restart(Duration),
}

// ════════════════════════════════════════════════════════════════════════════════
// SUPERVISOR
// ════════════════════════════════════════════════════════════════════════════════

pub struct ConnectionSupervisor {
    ledger: Arc<dyn LedgerClient>,
    gate: Arc<CollectionSyncGate>,
    bindings: Vec<Arc<dyn ContractBinding>>,
    store: Arc<dyn NetworkConfigStore>,
    prompt: Arc<dyn UserPrompt>,
    networks: NetworkTable,
    config: SupervisorConfig,
    attempts: AttemptCounter,
    restarts: AtomicU64,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionSupervisor {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        gate: Arc<CollectionSyncGate>,
        store: Arc<dyn NetworkConfigStore>,
        prompt: Arc<dyn UserPrompt>,
        networks: NetworkTable,
        config: SupervisorConfig,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            ledger,
            gate,
            bindings: Vec::new(),
            store,
            prompt,
            networks,
            config,
            attempts: AttemptCounter::new(),
            restarts: AtomicU64::new(0),
            state,
        }
    }

    /// Adds a contract binding that receives the provider once connected.
    pub fn with_binding(mut self, binding: Arc<dyn ContractBinding>) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Full restarts performed so far (watchdog or gate failure).
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn gate(&self) -> &CollectionSyncGate {
        &self.gate
    }

    /// Runs the bootstrap until it settles.
    ///
    /// Only a transport error on the network id query or a store failure is
    /// returned as `Err`; everything else is retried or reported through
    /// [`BootstrapOutcome`].
    pub async fn connect(&self) -> Result<BootstrapOutcome, SupervisorError> {
        loop {
            let attempt = self.attempts.begin();
            info!(
                generation = attempt.generation(),
                context = %self.config.context,
                "starting bootstrap attempt"
            );

            self.set_state(ConnectionState::Disconnected);
            self.ledger.reset().await;
            self.wait_for_node().await;

            match self.run_gate(&attempt).await {
                GateStep::Ready(collections_ready) => {
                    return self.finish(collections_ready).await;
                }
                GateStep::Restart(delay) => {
                    self.restarts.fetch_add(1, Ordering::SeqCst);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "connection state");
        }
    }

    /// Polls until the node is connected and not syncing.
    async fn wait_for_node(&self) {
        let mut schedule = self.config.backoff();
        let mut attempt: u32 = 0;

        self.set_state(ConnectionState::Connecting {
            attempt,
            backoff_ms: self.config.initial_probe.as_millis() as u64,
        });
        tokio::time::sleep(self.config.initial_probe).await;

        loop {
            attempt = attempt.saturating_add(1);

            if !self.ledger.is_connected().await {
                let delay = schedule.next_delay();
                info!(attempt, delay_ms = delay, "ledger not connected, retrying");
                self.set_state(ConnectionState::Connecting {
                    attempt,
                    backoff_ms: delay,
                });
                tokio::time::sleep(Duration::from_millis(delay)).await;
                continue;
            }

            let provider = self.ledger.provider();
            if provider.kind == ProviderKind::InjectedWallet {
                debug!(endpoint = %provider.endpoint, "injected wallet manages its own sync");
                break;
            }

            match self.ledger.sync_status().await {
                Ok(SyncStatus::Synced) => break,
                Err(e) => {
                    // no sync information is not grounds for blocking
                    debug!(error = %e, "sync status unavailable, treating as synced");
                    break;
                }
                Ok(SyncStatus::Syncing {
                    current_block,
                    highest_block,
                    ..
                }) => {
                    let delay = schedule.next_delay();
                    info!(
                        attempt,
                        current_block,
                        highest_block,
                        delay_ms = delay,
                        "ledger syncing, retrying"
                    );
                    self.set_state(ConnectionState::ConnectedSyncing);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }

        self.set_state(ConnectionState::ConnectedReady);
        info!(probes = attempt, "ledger node ready");
    }

    async fn run_gate(&self, attempt: &AttemptToken) -> GateStep {
        let gate = Arc::clone(&self.gate);
        let token = attempt.clone();
        let mut task = tokio::spawn(async move { gate.await_readiness(&token).await });

        match self.config.context {
            ExecutionContext::Embedded => {
                match tokio::time::timeout(self.config.watchdog, &mut task).await {
                    Ok(joined) => self.gate_step(joined),
                    Err(_) => {
                        task.abort();
                        warn!(
                            generation = attempt.generation(),
                            watchdog_ms = self.config.watchdog.as_millis() as u64,
                            "read models stalled, restarting bootstrap"
                        );
                        GateStep::Restart(Duration::ZERO)
                    }
                }
            }
            ExecutionContext::Browser => self.gate_step(task.await),
        }
    }

    fn gate_step(&self, joined: Result<Result<bool, ReadinessError>, JoinError>) -> GateStep {
        match joined {
            Ok(Ok(ready)) => GateStep::Ready(ready),
            Ok(Err(e)) => {
                warn!(error = %e, delay_ms = self.config.restart_delay.as_millis() as u64,
                    "readiness gate failed, restarting bootstrap");
                GateStep::Restart(self.config.restart_delay)
            }
            Err(e) => {
                error!(error = %e, "readiness gate task failed, restarting bootstrap");
                GateStep::Restart(self.config.restart_delay)
            }
        }
    }

    async fn finish(&self, collections_ready: bool) -> Result<BootstrapOutcome, SupervisorError> {
        let provider = self.ledger.provider();
        for binding in &self.bindings {
            binding.set_provider(&provider);
            debug!(contract = binding.name(), provider = %provider.kind, "provider bound");
        }

        let raw_id = self
            .ledger
            .network_id()
            .await
            .map_err(SupervisorError::NetworkId)?;

        let identity = match parse_network_id(&raw_id).and_then(|id| self.networks.lookup(id)) {
            Some(identity) => identity.clone(),
            None => {
                warn!(network = %raw_id, "unsupported network");
                self.prompt.alert(&format!(
                    "Current network not supported, please use one of: {}",
                    self.networks.display_names().join(", ")
                ));
                return Ok(BootstrapOutcome::Unsupported { raw_id });
            }
        };

        match reconcile(self.store.as_ref(), &identity, self.prompt.as_ref())? {
            ReconcileOutcome::Persisted => {
                info!(network = identity.id, name = %identity.display_name, ready = collections_ready, "bootstrap complete");
                Ok(BootstrapOutcome::Ready {
                    ready: collections_ready,
                    network: identity,
                })
            }
            ReconcileOutcome::Reload { wiped } => Ok(BootstrapOutcome::Reload { wiped }),
        }
    }
}
