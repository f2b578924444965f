//! # Ledger Client Abstraction
//!
//! Defines [`LedgerClient`], the contract every remote ledger transport
//! implements, together with the small value types that cross it.
//!
//! ## Design
//!
//! The bootstrap supervisor and the governance engine never talk to a node
//! directly. They hold an `Arc<dyn LedgerClient>` so the same orchestration
//! runs against [`JsonRpcLedgerClient`](crate::rpc_client::JsonRpcLedgerClient)
//! in production and [`MockLedger`](crate::mock_ledger::MockLedger) in tests.
//!
//! ## Provider Classification
//!
//! Transports report what kind of provider sits behind them through
//! [`ProviderKind`]. Injected wallet providers manage their own sync state,
//! so the supervisor treats them as always caught up. Classification is
//! supplied by the transport itself and never inferred from type metadata.
//!
//! ## Contract
//!
//! - Implementations MUST NOT retry internally; retry belongs to the
//!   supervisor's backoff loop.
//! - Implementations MUST NOT panic.
//! - All calls are async and may be slow.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ════════════════════════════════════════════════════════════════════════════════

/// 20-byte account or contract address.
///
/// Parsed from and rendered as `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        if trimmed.len() != 40 {
            return Err(LedgerError::Decode(format!(
                "address must be 40 hex chars, got {}",
                trimmed.len()
            )));
        }
        let bytes = hex::decode(trimmed)
            .map_err(|e| LedgerError::Decode(format!("invalid address hex: {}", e)))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl TryFrom<String> for Address {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// PROVIDER
// ════════════════════════════════════════════════════════════════════════════════

/// Kind of provider behind a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Wallet-injected provider. Always considered ready.
    InjectedWallet,
    /// Plain remote node reached over RPC.
    RemoteNode,
    /// Anything else.
    Other,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::InjectedWallet => "injected_wallet",
            ProviderKind::RemoteNode => "remote_node",
            ProviderKind::Other => "other",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider handle passed to contract bindings once the connection is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub kind: ProviderKind,
    /// Endpoint description (URL for remote nodes).
    pub endpoint: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// SYNC STATUS
// ════════════════════════════════════════════════════════════════════════════════

/// Node self-reported synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Caught up with the network head.
    Synced,
    /// Still importing blocks.
    Syncing {
        starting_block: u64,
        current_block: u64,
        highest_block: u64,
    },
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing { .. })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// CALL REQUEST
// ════════════════════════════════════════════════════════════════════════════════

/// Read-only contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Contract address.
    pub to: Address,
    /// Caller, for calls whose result depends on `msg.sender`.
    pub from: Option<Address>,
    /// ABI-encoded calldata.
    pub data: Vec<u8>,
}

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

/// Transport-level ledger errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The transport has no live connection.
    #[error("ledger not connected")]
    NotConnected,

    /// Request timed out before the node answered.
    #[error("ledger request timed out")]
    Timeout,

    /// HTTP or socket failure.
    #[error("ledger network error: {0}")]
    Network(String),

    /// Node answered with a JSON-RPC error object.
    #[error("ledger rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Response could not be decoded.
    #[error("ledger decode error: {0}")]
    Decode(String),
}

// ════════════════════════════════════════════════════════════════════════════════
// TRAITS
// ════════════════════════════════════════════════════════════════════════════════

/// Remote ledger transport.
///
/// Object-safe; shared as `Arc<dyn LedgerClient>` across tasks.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Provider classification and endpoint.
    fn provider(&self) -> ProviderInfo;

    /// Drops any cached state or subscriptions held by the transport.
    async fn reset(&self);

    /// Whether the transport currently reaches the node.
    async fn is_connected(&self) -> bool;

    /// Node synchronization status.
    async fn sync_status(&self) -> Result<SyncStatus, LedgerError>;

    /// Raw network identifier as reported by the node.
    async fn network_id(&self) -> Result<String, LedgerError>;

    /// Accounts the node (or wallet) exposes.
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError>;

    /// Current head block number.
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Executes a read-only contract call and returns the raw return data.
    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError>;
}

/// A contract binding that must be pointed at the live provider before use.
pub trait ContractBinding: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Attaches the binding to `provider`.
    fn set_provider(&self, provider: &ProviderInfo);
}
