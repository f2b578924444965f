//! Ledger Health Summary
//!
//! Snapshot of the ledger connection taken after bootstrap, printed by the
//! binary and refreshed by the block watcher.
//!
//! ## Healthy Criteria
//!
//! The connection is healthy if and only if:
//! - the node reports connected
//! - the node is not syncing (or sync status is unavailable)
//! - the head block could be read

use std::fmt;

use serde::Serialize;

use ledgergov_common::network::EXPLORER_BASE_DOMAIN;
use ledgergov_common::{LedgerClient, NetworkIdentity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerHealth {
    pub network_id: u64,
    pub network_name: String,
    pub explorer_domain: String,
    pub connected: bool,
    pub syncing: bool,
    /// `None` if the account query failed.
    pub accounts: Option<usize>,
    /// `None` if the block number query failed.
    pub head_block: Option<u64>,
}

impl LedgerHealth {
    /// Queries the ledger. Individual query failures are recorded, not
    /// propagated.
    pub async fn check(ledger: &dyn LedgerClient, network: &NetworkIdentity) -> Self {
        let connected = ledger.is_connected().await;
        let syncing = matches!(ledger.sync_status().await, Ok(status) if status.is_syncing());
        let accounts = ledger.accounts().await.ok().map(|a| a.len());
        let head_block = ledger.block_number().await.ok();

        Self {
            network_id: network.id,
            network_name: network.display_name.clone(),
            explorer_domain: network.explorer_domain.clone(),
            connected,
            syncing,
            accounts,
            head_block,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.connected && !self.syncing && self.head_block.is_some()
    }

    /// Summary with the sync status spelled out.
    pub fn status_label(&self) -> &'static str {
        match (self.is_healthy(), self.syncing) {
            (true, _) => "healthy",
            (false, true) => "syncing",
            (false, false) => "degraded",
        }
    }
}

fn or_unknown<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

impl fmt::Display for LedgerHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) explorer={}{} accounts={} head={} status={}",
            self.network_name,
            self.network_id,
            self.explorer_domain,
            EXPLORER_BASE_DOMAIN,
            or_unknown(self.accounts),
            or_unknown(self.head_block),
            self.status_label()
        )
    }
}
