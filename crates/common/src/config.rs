//! Client configuration loaded from TOML with environment overrides.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration pointed at a local node.
//!
//! Environment overrides, applied after the file:
//!
//! - `LEDGERGOV_RPC_URL`
//! - `LEDGERGOV_CONTEXT` (`browser` | `embedded`)
//! - `LEDGERGOV_STORE`
//! - `LEDGERGOV_COMPANY`

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::{NetworkIdentity, NetworkTable, NetworkTableError};

pub const ENV_RPC_URL: &str = "LEDGERGOV_RPC_URL";
pub const ENV_CONTEXT: &str = "LEDGERGOV_CONTEXT";
pub const ENV_STORE: &str = "LEDGERGOV_STORE";
pub const ENV_COMPANY: &str = "LEDGERGOV_COMPANY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Network(#[from] NetworkTableError),
}

// ════════════════════════════════════════════════════════════════════════════════
// EXECUTION CONTEXT
// ════════════════════════════════════════════════════════════════════════════════

/// Where the client runs.
///
/// The embedded (desktop shell) context guards read-model readiness with a
/// watchdog; the browser context awaits it directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    #[default]
    Browser,
    Embedded,
}

impl ExecutionContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionContext::Browser => "browser",
            ExecutionContext::Embedded => "embedded",
        }
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExecutionContext {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "browser" => Ok(ExecutionContext::Browser),
            "embedded" | "desktop" => Ok(ExecutionContext::Embedded),
            other => Err(ConfigError::Invalid(format!("unknown execution context '{}'", other))),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// CONFIG
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Ledger node JSON-RPC endpoint.
    pub rpc_url: String,

    pub context: ExecutionContext,

    /// Persisted network config file.
    pub store_path: PathBuf,

    /// Delay before the first connection probe (ms).
    pub initial_probe_ms: u64,

    /// Readiness watchdog in the embedded context (ms).
    pub watchdog_ms: u64,

    /// Pause before restarting after a readiness failure (ms).
    pub restart_delay_ms: u64,

    /// Per-request HTTP timeout (ms).
    pub request_timeout_ms: u64,

    /// Pause between readiness and starting downstream watchers (ms).
    pub listener_delay_ms: u64,

    /// Governance (company) contract address, if known up front.
    pub company_address: Option<String>,

    /// Extra networks appended to the built-in table.
    pub networks: Vec<NetworkIdentity>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            context: ExecutionContext::Browser,
            store_path: PathBuf::from("./ledgergov-network.json"),
            initial_probe_ms: 100,
            watchdog_ms: 1000,
            restart_delay_ms: 500,
            request_timeout_ms: 10_000,
            listener_delay_ms: 1000,
            company_address: None,
            networks: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Loads a config from a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let raw = fs::read_to_string(p).map_err(|source| ConfigError::Read {
            path: p.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(ctx) = lookup(ENV_CONTEXT) {
            self.context = ctx.parse()?;
        }
        if let Some(store) = lookup(ENV_STORE) {
            self.store_path = PathBuf::from(store);
        }
        if let Some(company) = lookup(ENV_COMPANY) {
            self.company_address = Some(company);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "rpc_url must be an http(s) URL, got '{}'",
                self.rpc_url
            )));
        }
        if self.watchdog_ms == 0 {
            return Err(ConfigError::Invalid("watchdog_ms must be > 0".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Built-in networks plus the configured extras.
    pub fn network_table(&self) -> Result<NetworkTable, ConfigError> {
        let mut table = NetworkTable::default();
        for extra in &self.networks {
            table.insert(extra.clone())?;
        }
        Ok(table)
    }
}
