//! # JSON-RPC Ledger Client
//!
//! [`LedgerClient`] over HTTP JSON-RPC using `reqwest`.
//!
//! ## Method Mapping
//!
//! | Trait method    | RPC method        |
//! |-----------------|-------------------|
//! | `is_connected`  | `net_listening`   |
//! | `sync_status`   | `eth_syncing`     |
//! | `network_id`    | `net_version`     |
//! | `accounts`      | `eth_accounts`    |
//! | `block_number`  | `eth_blockNumber` |
//! | `call`          | `eth_call`        |
//!
//! ## No Implicit Retry
//!
//! Each trait call performs exactly one HTTP request. `reset()` rebuilds the
//! HTTP client, dropping pooled connections from a previous attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ledger::{
    Address, CallRequest, LedgerClient, LedgerError, ProviderInfo, ProviderKind, SyncStatus,
};

// ════════════════════════════════════════════════════════════════════════════════
// WIRE TYPES
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncingObject {
    starting_block: String,
    current_block: String,
    highest_block: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// CLIENT
// ════════════════════════════════════════════════════════════════════════════════

pub struct JsonRpcLedgerClient {
    endpoint: String,
    kind: ProviderKind,
    timeout: Duration,
    http: RwLock<reqwest::Client>,
    next_id: AtomicU64,
}

impl JsonRpcLedgerClient {
    /// Client for a remote node at `endpoint`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        Self::with_kind(endpoint, timeout, ProviderKind::RemoteNode)
    }

    /// Client whose provider classification is supplied by the caller,
    /// e.g. a local bridge to a wallet.
    pub fn with_kind(
        endpoint: impl Into<String>,
        timeout: Duration,
        kind: ProviderKind,
    ) -> Result<Self, LedgerError> {
        let http = build_http(timeout)?;
        Ok(Self {
            endpoint: endpoint.into(),
            kind,
            timeout,
            http: RwLock::new(http),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &'static str, params: Vec<Value>) -> Result<Value, LedgerError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            method,
            params,
        };
        let http = self.http.read().clone();

        let response = http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Network(format!("{} returned HTTP {}", method, status)));
        }

        let body: JsonRpcResponse = response.json().await.map_err(map_reqwest_error)?;
        if let Some(err) = body.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        body.result
            .ok_or_else(|| LedgerError::Decode(format!("{} returned no result", method)))
    }
}

fn build_http(timeout: Duration) -> Result<reqwest::Client, LedgerError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LedgerError::Network(format!("failed to build HTTP client: {}", e)))
}

fn map_reqwest_error(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Timeout
    } else if e.is_connect() {
        LedgerError::NotConnected
    } else if e.is_decode() {
        LedgerError::Decode(e.to_string())
    } else {
        LedgerError::Network(e.to_string())
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    fn provider(&self) -> ProviderInfo {
        ProviderInfo {
            kind: self.kind,
            endpoint: self.endpoint.clone(),
        }
    }

    async fn reset(&self) {
        match build_http(self.timeout) {
            Ok(fresh) => {
                *self.http.write() = fresh;
                debug!(endpoint = %self.endpoint, "ledger transport reset");
            }
            Err(e) => warn!(error = %e, "ledger transport reset failed, keeping old client"),
        }
    }

    async fn is_connected(&self) -> bool {
        match self.request("net_listening", Vec::new()).await {
            Ok(Value::Bool(listening)) => listening,
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "connectivity probe failed");
                false
            }
        }
    }

    async fn sync_status(&self) -> Result<SyncStatus, LedgerError> {
        let value = self.request("eth_syncing", Vec::new()).await?;
        parse_sync_status(value)
    }

    async fn network_id(&self) -> Result<String, LedgerError> {
        match self.request("net_version", Vec::new()).await? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(LedgerError::Decode(format!("unexpected net_version result: {}", other))),
        }
    }

    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        let value = self.request("eth_accounts", Vec::new()).await?;
        let raw: Vec<String> = serde_json::from_value(value)
            .map_err(|e| LedgerError::Decode(format!("eth_accounts: {}", e)))?;
        raw.iter().map(|a| a.parse()).collect()
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        match self.request("eth_blockNumber", Vec::new()).await? {
            Value::String(s) => parse_quantity(&s),
            other => Err(LedgerError::Decode(format!("unexpected eth_blockNumber result: {}", other))),
        }
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        let mut tx = serde_json::Map::new();
        tx.insert("to".to_string(), Value::String(request.to.to_string()));
        if let Some(from) = request.from {
            tx.insert("from".to_string(), Value::String(from.to_string()));
        }
        tx.insert(
            "data".to_string(),
            Value::String(format!("0x{}", hex::encode(&request.data))),
        );

        let value = self
            .request("eth_call", vec![Value::Object(tx), Value::String("latest".to_string())])
            .await?;
        match value {
            Value::String(s) => parse_bytes(&s),
            other => Err(LedgerError::Decode(format!("unexpected eth_call result: {}", other))),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// PARSING
// ════════════════════════════════════════════════════════════════════════════════

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::Decode(format!("quantity without 0x prefix: {}", raw)))?;
    if digits.is_empty() {
        return Err(LedgerError::Decode("empty quantity".to_string()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Decode(format!("invalid quantity {}: {}", raw, e)))
}

/// Parses `0x`-prefixed hex data.
pub fn parse_bytes(raw: &str) -> Result<Vec<u8>, LedgerError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| LedgerError::Decode(format!("invalid hex data: {}", e)))
}

/// Interprets an `eth_syncing` result: `false` or a progress object.
pub fn parse_sync_status(value: Value) -> Result<SyncStatus, LedgerError> {
    match value {
        Value::Bool(false) => Ok(SyncStatus::Synced),
        Value::Object(_) => {
            let obj: SyncingObject = serde_json::from_value(value)
                .map_err(|e| LedgerError::Decode(format!("eth_syncing: {}", e)))?;
            Ok(SyncStatus::Syncing {
                starting_block: parse_quantity(&obj.starting_block)?,
                current_block: parse_quantity(&obj.current_block)?,
                highest_block: parse_quantity(&obj.highest_block)?,
            })
        }
        other => Err(LedgerError::Decode(format!("unexpected eth_syncing result: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_quantity_reads_hex() {
        assert_eq!(parse_quantity("0x0"), Ok(0));
        assert_eq!(parse_quantity("0x1b4"), Ok(436));
        assert!(parse_quantity("1b4").is_err());
        assert!(parse_quantity("0x").is_err());
    }

    #[test]
    fn parse_bytes_accepts_empty_result() {
        assert_eq!(parse_bytes("0x"), Ok(Vec::new()));
        assert_eq!(parse_bytes("0x0102"), Ok(vec![1, 2]));
        assert!(parse_bytes("0xzz").is_err());
    }

    #[test]
    fn parse_sync_status_false_is_synced() {
        assert_eq!(parse_sync_status(json!(false)), Ok(SyncStatus::Synced));
    }

    #[test]
    fn parse_sync_status_object_is_syncing() {
        let v = json!({
            "startingBlock": "0x0",
            "currentBlock": "0x10",
            "highestBlock": "0x20"
        });
        assert_eq!(
            parse_sync_status(v),
            Ok(SyncStatus::Syncing {
                starting_block: 0,
                current_block: 16,
                highest_block: 32
            })
        );
    }

    #[test]
    fn parse_sync_status_rejects_true() {
        assert!(matches!(parse_sync_status(json!(true)), Err(LedgerError::Decode(_))));
    }

    #[test]
    fn client_reports_remote_node_provider() {
        let client = JsonRpcLedgerClient::new("http://127.0.0.1:8545", Duration::from_secs(1))
            .unwrap_or_else(|e| panic!("client: {}", e));
        let provider = client.provider();
        assert_eq!(provider.kind, ProviderKind::RemoteNode);
        assert_eq!(provider.endpoint, "http://127.0.0.1:8545");
    }
}
