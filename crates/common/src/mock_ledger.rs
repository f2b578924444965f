//! Mock Ledger Client for Testing
//!
//! Fully in-memory [`LedgerClient`]. Responses are scripted per call kind:
//! queued responses are consumed FIFO, and once a queue is drained the
//! configured steady-state value is returned.
//!
//! # Example
//!
//! ```ignore
//! let ledger = MockLedger::new();
//! ledger.push_connected(false);          // first probe: offline
//! ledger.push_sync(Ok(SyncStatus::Syncing { .. }));
//! ledger.set_network_id("42");
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::ledger::{
    Address, CallRequest, LedgerClient, LedgerError, ProviderInfo, ProviderKind, SyncStatus,
};

#[derive(Debug)]
struct MockState {
    provider: ProviderInfo,
    connected_queue: VecDeque<bool>,
    connected: bool,
    sync_queue: VecDeque<Result<SyncStatus, LedgerError>>,
    sync: Result<SyncStatus, LedgerError>,
    network_id: Result<String, LedgerError>,
    accounts: Result<Vec<Address>, LedgerError>,
    block_number: Result<u64, LedgerError>,
    calls_exact: HashMap<Vec<u8>, Result<Vec<u8>, LedgerError>>,
    calls_by_selector: HashMap<[u8; 4], Result<Vec<u8>, LedgerError>>,
    call_log: Vec<CallRequest>,
}

/// Scriptable in-memory ledger.
#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<MockState>,
    resets: AtomicU64,
    connectivity_checks: AtomicU64,
    sync_checks: AtomicU64,
    network_queries: AtomicU64,
}

impl MockLedger {
    /// Connected, synced remote node on network `42` with no accounts.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                provider: ProviderInfo {
                    kind: ProviderKind::RemoteNode,
                    endpoint: "mock://ledger".to_string(),
                },
                connected_queue: VecDeque::new(),
                connected: true,
                sync_queue: VecDeque::new(),
                sync: Ok(SyncStatus::Synced),
                network_id: Ok("42".to_string()),
                accounts: Ok(Vec::new()),
                block_number: Ok(1),
                calls_exact: HashMap::new(),
                calls_by_selector: HashMap::new(),
                call_log: Vec::new(),
            }),
            resets: AtomicU64::new(0),
            connectivity_checks: AtomicU64::new(0),
            sync_checks: AtomicU64::new(0),
            network_queries: AtomicU64::new(0),
        }
    }

    pub fn set_provider_kind(&self, kind: ProviderKind) {
        self.state.lock().provider.kind = kind;
    }

    /// Queues one connectivity answer.
    pub fn push_connected(&self, connected: bool) {
        self.state.lock().connected_queue.push_back(connected);
    }

    /// Steady-state connectivity after the queue drains.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Queues one sync-status answer.
    pub fn push_sync(&self, status: Result<SyncStatus, LedgerError>) {
        self.state.lock().sync_queue.push_back(status);
    }

    pub fn set_sync(&self, status: Result<SyncStatus, LedgerError>) {
        self.state.lock().sync = status;
    }

    pub fn set_network_id(&self, id: &str) {
        self.state.lock().network_id = Ok(id.to_string());
    }

    pub fn set_network_error(&self, error: LedgerError) {
        self.state.lock().network_id = Err(error);
    }

    pub fn set_accounts(&self, accounts: Result<Vec<Address>, LedgerError>) {
        self.state.lock().accounts = accounts;
    }

    pub fn set_block_number(&self, block: Result<u64, LedgerError>) {
        self.state.lock().block_number = block;
    }

    /// Answer for an exact calldata match.
    pub fn set_call_response(&self, data: Vec<u8>, response: Result<Vec<u8>, LedgerError>) {
        self.state.lock().calls_exact.insert(data, response);
    }

    /// Answer for any call whose calldata starts with `selector`.
    pub fn set_selector_response(&self, selector: [u8; 4], response: Result<Vec<u8>, LedgerError>) {
        self.state.lock().calls_by_selector.insert(selector, response);
    }

    pub fn call_log(&self) -> Vec<CallRequest> {
        self.state.lock().call_log.clone()
    }

    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn connectivity_checks(&self) -> u64 {
        self.connectivity_checks.load(Ordering::SeqCst)
    }

    pub fn sync_checks(&self) -> u64 {
        self.sync_checks.load(Ordering::SeqCst)
    }

    pub fn network_queries(&self) -> u64 {
        self.network_queries.load(Ordering::SeqCst)
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn provider(&self) -> ProviderInfo {
        self.state.lock().provider.clone()
    }

    async fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        debug!("MockLedger: reset");
    }

    async fn is_connected(&self) -> bool {
        self.connectivity_checks.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        match state.connected_queue.pop_front() {
            Some(v) => v,
            None => state.connected,
        }
    }

    async fn sync_status(&self) -> Result<SyncStatus, LedgerError> {
        self.sync_checks.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        match state.sync_queue.pop_front() {
            Some(v) => v,
            None => state.sync.clone(),
        }
    }

    async fn network_id(&self) -> Result<String, LedgerError> {
        self.network_queries.fetch_add(1, Ordering::SeqCst);
        self.state.lock().network_id.clone()
    }

    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        self.state.lock().accounts.clone()
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.state.lock().block_number.clone()
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        let mut state = self.state.lock();
        state.call_log.push(request.clone());

        if let Some(resp) = state.calls_exact.get(&request.data) {
            return resp.clone();
        }
        if request.data.len() >= 4 {
            let mut sel = [0u8; 4];
            sel.copy_from_slice(&request.data[..4]);
            if let Some(resp) = state.calls_by_selector.get(&sel) {
                return resp.clone();
            }
        }
        Err(LedgerError::Rpc {
            code: -32000,
            message: "no mock response".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connectivity_queue_then_steady_state() {
        let ledger = MockLedger::new();
        ledger.push_connected(false);
        ledger.push_connected(false);
        assert!(!ledger.is_connected().await);
        assert!(!ledger.is_connected().await);
        assert!(ledger.is_connected().await);
        assert_eq!(ledger.connectivity_checks(), 3);
    }

    #[tokio::test]
    async fn call_prefers_exact_match_over_selector() {
        let ledger = MockLedger::new();
        ledger.set_selector_response([1, 2, 3, 4], Ok(vec![0xAA]));
        ledger.set_call_response(vec![1, 2, 3, 4, 9], Ok(vec![0xBB]));

        let exact = CallRequest {
            to: Address::ZERO,
            from: None,
            data: vec![1, 2, 3, 4, 9],
        };
        let other = CallRequest {
            data: vec![1, 2, 3, 4, 8],
            ..exact.clone()
        };
        assert_eq!(ledger.call(&exact).await, Ok(vec![0xBB]));
        assert_eq!(ledger.call(&other).await, Ok(vec![0xAA]));
        assert_eq!(ledger.call_log().len(), 2);
    }

    #[tokio::test]
    async fn unscripted_call_is_an_rpc_error() {
        let ledger = MockLedger::new();
        let req = CallRequest {
            to: Address::ZERO,
            from: None,
            data: vec![0; 4],
        };
        assert!(matches!(ledger.call(&req).await, Err(LedgerError::Rpc { .. })));
    }
}
