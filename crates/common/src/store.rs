//! # Persisted Network Config
//!
//! Small key-value store holding the last network the client bootstrapped
//! against and the company deployed on it.
//!
//! ## Keys
//!
//! | Key              | Value                                   |
//! |------------------|-----------------------------------------|
//! | `network`        | network id, decimal string              |
//! | `companyAddress` | deployed company contract address       |
//! | `etherscanSub`   | explorer subdomain of `network`         |
//! | `networkName`    | display name of `network`               |
//!
//! Reconciliation reads `network` and `companyAddress`. A non-conflicting
//! bootstrap rewrites the three network keys. `clear()` is only called after
//! explicit user confirmation.
//!
//! ## Implementations
//!
//! - [`MemoryConfigStore`]: in-process map, for tests and ephemeral sessions.
//! - [`FileConfigStore`]: JSON file with atomic writes (tmp → rename).

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

use crate::network::NetworkIdentity;

pub const KEY_NETWORK: &str = "network";
pub const KEY_COMPANY_ADDRESS: &str = "companyAddress";
pub const KEY_EXPLORER_SUBDOMAIN: &str = "etherscanSub";
pub const KEY_NETWORK_NAME: &str = "networkName";

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config store is corrupted: {0}")]
    Corrupted(String),
}

// ════════════════════════════════════════════════════════════════════════════════
// RECORD
// ════════════════════════════════════════════════════════════════════════════════

/// The slice of persisted state reconciliation looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedNetworkRecord {
    /// Raw `network` value, trimmed.
    pub last_network: Option<String>,
    pub company_address: Option<String>,
}

impl PersistedNetworkRecord {
    /// Numeric form of `last_network`, if it parses.
    pub fn last_network_id(&self) -> Option<u64> {
        self.last_network.as_deref().and_then(|raw| raw.parse().ok())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TRAIT
// ════════════════════════════════════════════════════════════════════════════════

/// String key-value store owned by the embedding application.
pub trait NetworkConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes every key.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Reads the reconciliation record.
///
/// An unparsable `network` value is kept raw and logged; it matches no live
/// id. Empty values are treated as absent.
pub fn load_record(store: &dyn NetworkConfigStore) -> Result<PersistedNetworkRecord, StoreError> {
    let last_network = store
        .get(KEY_NETWORK)?
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty());
    if let Some(raw) = &last_network {
        if raw.parse::<u64>().is_err() {
            warn!(value = %raw, "persisted network id is not numeric");
        }
    }
    let company_address = store
        .get(KEY_COMPANY_ADDRESS)?
        .filter(|addr| !addr.trim().is_empty());

    Ok(PersistedNetworkRecord {
        last_network,
        company_address,
    })
}

/// Writes the network id and its display metadata.
pub fn persist_identity(
    store: &dyn NetworkConfigStore,
    identity: &NetworkIdentity,
) -> Result<(), StoreError> {
    store.set(KEY_NETWORK, &identity.id.to_string())?;
    store.set(KEY_EXPLORER_SUBDOMAIN, &identity.explorer_domain)?;
    store.set(KEY_NETWORK_NAME, &identity.display_name)?;
    debug!(network = identity.id, name = %identity.display_name, "persisted network identity");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════════
// MEMORY STORE
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-filled with `pairs`.
    pub fn with_entries(pairs: &[(&str, &str)]) -> Self {
        let entries = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Snapshot of all entries.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }
}

impl NetworkConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().clear();
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// FILE STORE
// ════════════════════════════════════════════════════════════════════════════════

/// JSON-file backed store.
///
/// The whole map is loaded on open and rewritten on every mutation through
/// a temporary sibling file followed by a rename, so readers never observe a
/// half-written file.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileConfigStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str::<BTreeMap<String, String>>(&raw)
                .map_err(|e| StoreError::Corrupted(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl NetworkConfigStore for FileConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.clear();
        self.flush(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kovan() -> NetworkIdentity {
        NetworkIdentity {
            id: 42,
            display_name: "Kovan".to_string(),
            explorer_domain: "kovan.".to_string(),
        }
    }

    #[test]
    fn load_record_from_empty_store() {
        let store = MemoryConfigStore::new();
        let record = load_record(&store).unwrap_or_else(|e| panic!("load: {}", e));
        assert_eq!(record, PersistedNetworkRecord::default());
    }

    #[test]
    fn load_record_reads_network_and_company() {
        let store = MemoryConfigStore::with_entries(&[
            (KEY_NETWORK, "5"),
            (KEY_COMPANY_ADDRESS, "0xabc"),
        ]);
        let record = load_record(&store).unwrap_or_else(|e| panic!("load: {}", e));
        assert_eq!(record.last_network_id(), Some(5));
        assert_eq!(record.company_address.as_deref(), Some("0xabc"));
    }

    #[test]
    fn load_record_keeps_garbage_network_and_drops_blank_company() {
        let store = MemoryConfigStore::with_entries(&[
            (KEY_NETWORK, " NaN "),
            (KEY_COMPANY_ADDRESS, "  "),
        ]);
        let record = load_record(&store).unwrap_or_else(|e| panic!("load: {}", e));
        assert_eq!(record.last_network.as_deref(), Some("NaN"));
        assert_eq!(record.last_network_id(), None);
        assert_eq!(record.company_address, None);

        let blank = MemoryConfigStore::with_entries(&[(KEY_NETWORK, "")]);
        let record = load_record(&blank).unwrap_or_else(|e| panic!("load: {}", e));
        assert_eq!(record, PersistedNetworkRecord::default());
    }

    #[test]
    fn persist_identity_writes_three_keys() {
        let store = MemoryConfigStore::new();
        persist_identity(&store, &kovan()).unwrap_or_else(|e| panic!("persist: {}", e));
        let snap = store.snapshot();
        assert_eq!(snap.get(KEY_NETWORK).map(String::as_str), Some("42"));
        assert_eq!(snap.get(KEY_EXPLORER_SUBDOMAIN).map(String::as_str), Some("kovan."));
        assert_eq!(snap.get(KEY_NETWORK_NAME).map(String::as_str), Some("Kovan"));
        assert!(!snap.contains_key(KEY_COMPANY_ADDRESS));
    }

    #[test]
    fn file_store_survives_reopen_and_clear() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {}", e));
        let path = dir.path().join("nested").join("network.json");

        {
            let store = FileConfigStore::open(&path).unwrap_or_else(|e| panic!("open: {}", e));
            store.set(KEY_COMPANY_ADDRESS, "0xabc").unwrap_or_else(|e| panic!("set: {}", e));
            persist_identity(&store, &kovan()).unwrap_or_else(|e| panic!("persist: {}", e));
        }

        let reopened = FileConfigStore::open(&path).unwrap_or_else(|e| panic!("reopen: {}", e));
        let record = load_record(&reopened).unwrap_or_else(|e| panic!("load: {}", e));
        assert_eq!(record.last_network_id(), Some(42));
        assert_eq!(record.company_address.as_deref(), Some("0xabc"));

        reopened.clear().unwrap_or_else(|e| panic!("clear: {}", e));
        let again = FileConfigStore::open(&path).unwrap_or_else(|e| panic!("reopen: {}", e));
        assert_eq!(again.get(KEY_NETWORK).ok().flatten(), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {}", e));
        let path = dir.path().join("network.json");
        fs::write(&path, "{not json").unwrap_or_else(|e| panic!("write: {}", e));
        assert!(matches!(FileConfigStore::open(&path), Err(StoreError::Corrupted(_))));
    }
}
