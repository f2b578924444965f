//! # Supported Network Table
//!
//! Static mapping from ledger network identifiers to display metadata.
//! The supervisor rejects any live network whose id is not in the table.
//!
//! ## Invariant
//!
//! Every accepted id maps to exactly one [`NetworkIdentity`]. Inserting a
//! duplicate id is an error, never a silent overwrite.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in networks: `(id, explorer subdomain, display name)`.
const BUILTIN_NETWORKS: &[(u64, &str, &str)] = &[
    (3, "ropsten.", "Ropsten"),
    (4, "rinkeby.", "Rinkeby"),
    (5, "goerli.", "Goerli"),
    (42, "kovan.", "Kovan"),
];

/// Block explorer base domain; network subdomains are prepended to it.
pub const EXPLORER_BASE_DOMAIN: &str = "etherscan.io";

// ════════════════════════════════════════════════════════════════════════════════
// IDENTITY
// ════════════════════════════════════════════════════════════════════════════════

/// Immutable description of a supported network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub id: u64,
    pub display_name: String,
    /// Explorer subdomain prefix, e.g. `"kovan."`. Empty for the main network.
    pub explorer_domain: String,
}

impl NetworkIdentity {
    /// Explorer link for an address or transaction path.
    pub fn explorer_url(&self, path: &str) -> String {
        format!(
            "https://{}{}/{}",
            self.explorer_domain,
            EXPLORER_BASE_DOMAIN,
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkTableError {
    #[error("network id {0} is already registered")]
    Duplicate(u64),
}

// ════════════════════════════════════════════════════════════════════════════════
// TABLE
// ════════════════════════════════════════════════════════════════════════════════

/// Lookup table of supported networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTable {
    entries: BTreeMap<u64, NetworkIdentity>,
}

impl NetworkTable {
    /// An empty table. Every network is unsupported.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers a network. Fails if the id is already present.
    pub fn insert(&mut self, identity: NetworkIdentity) -> Result<(), NetworkTableError> {
        if self.entries.contains_key(&identity.id) {
            return Err(NetworkTableError::Duplicate(identity.id));
        }
        self.entries.insert(identity.id, identity);
        Ok(())
    }

    pub fn lookup(&self, id: u64) -> Option<&NetworkIdentity> {
        self.entries.get(&id)
    }

    pub fn is_supported(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Display names in id order, for user-facing rejection messages.
    pub fn display_names(&self) -> Vec<&str> {
        self.entries.values().map(|n| n.display_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NetworkTable {
    fn default() -> Self {
        let entries = BUILTIN_NETWORKS
            .iter()
            .map(|(id, domain, name)| {
                (
                    *id,
                    NetworkIdentity {
                        id: *id,
                        display_name: (*name).to_string(),
                        explorer_domain: (*domain).to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

/// Parses the raw network id string reported by a node.
///
/// Returns `None` for anything that is not a plain decimal integer.
pub fn parse_network_id(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}
