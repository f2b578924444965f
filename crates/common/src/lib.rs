//! # ledgergov Common Crate
//!
//! Shared building blocks for the ledger bootstrap supervisor and the
//! governance engine.
//!
//! ## Modules
//! - `ledger`: `LedgerClient` trait and the types crossing it
//! - `rpc_client`: JSON-RPC implementation over HTTP
//! - `mock_ledger`: scriptable in-memory implementation for tests
//! - `abi`: minimal static-word ABI codec for contract calls
//! - `network`: static table of supported networks
//! - `store`: persisted network config (key-value)
//! - `config`: TOML client configuration
//!
//! ## Ledger Layer Architecture
//! ```text
//! ┌──────────────────┐
//! │   LedgerClient   │  <- Abstract trait
//! └────────┬─────────┘
//!          │
//!    ┌─────┴──────┐
//!    │            │
//! ┌──▼──────┐ ┌───▼──────┐
//! │JsonRpc  │ │MockLedger│
//! └─────────┘ └──────────┘
//! ```

pub mod abi;
pub mod config;
pub mod ledger;
pub mod mock_ledger;
pub mod network;
pub mod rpc_client;
pub mod store;

pub use config::{ClientConfig, ConfigError, ExecutionContext};
pub use ledger::{
    Address, CallRequest, ContractBinding, LedgerClient, LedgerError, ProviderInfo, ProviderKind,
    SyncStatus,
};
pub use mock_ledger::MockLedger;
pub use network::{parse_network_id, NetworkIdentity, NetworkTable, NetworkTableError};
pub use rpc_client::JsonRpcLedgerClient;
pub use store::{
    FileConfigStore, MemoryConfigStore, NetworkConfigStore, PersistedNetworkRecord, StoreError,
};
