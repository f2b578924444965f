//! # Network Reconciliation
//!
//! Compares the live network id against the persisted record after a
//! successful connection.
//!
//! ## Decision Table
//!
//! | persisted `network` | `companyAddress` | live id  | result        |
//! |---------------------|------------------|----------|---------------|
//! | absent              | any              | any      | Persist       |
//! | == live             | any              | any      | Persist       |
//! | != live             | absent           | any      | Persist       |
//! | != live             | present          | any      | ConfirmWipe   |
//!
//! A persisted value that is not a number never equals the live id.
//! `ConfirmWipe` prompts the user. A confirmed wipe clears the whole store.
//! Both answers end in a reload; declining leaves the store untouched.

use tracing::{info, warn};

use ledgergov_common::store::{load_record, persist_identity};
use ledgergov_common::{NetworkConfigStore, NetworkIdentity, PersistedNetworkRecord, StoreError};

/// User-facing prompts owned by the embedding UI.
pub trait UserPrompt: Send + Sync {
    /// Yes/no confirmation. Returns true on "yes".
    fn confirm(&self, message: &str) -> bool;

    /// Blocking notice with no answer.
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Write the live identity over the persisted one.
    Persist,
    /// Persisted state belongs to another network. `previous` is the raw
    /// persisted value.
    ConfirmWipe { previous: String, live: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Persisted,
    /// Restart required. `wiped` is true when the store was cleared.
    Reload { wiped: bool },
}

/// Pure decision over the persisted record.
pub fn decide(record: &PersistedNetworkRecord, live: u64) -> Reconciliation {
    match (&record.last_network, &record.company_address) {
        (Some(previous), Some(_)) if record.last_network_id() != Some(live) => {
            Reconciliation::ConfirmWipe {
                previous: previous.clone(),
                live,
            }
        }
        _ => Reconciliation::Persist,
    }
}

pub fn mismatch_message(previous: &str, live: u64) -> String {
    format!(
        "The connected network ({}) differs from the one your company was deployed on ({}). \
         Clear all local data and reload?",
        live, previous
    )
}

/// Runs reconciliation against `store` for the live network.
pub fn reconcile(
    store: &dyn NetworkConfigStore,
    live: &NetworkIdentity,
    prompt: &dyn UserPrompt,
) -> Result<ReconcileOutcome, StoreError> {
    let record = load_record(store)?;

    match decide(&record, live.id) {
        Reconciliation::Persist => {
            persist_identity(store, live)?;
            info!(network = live.id, name = %live.display_name, "network reconciled");
            Ok(ReconcileOutcome::Persisted)
        }
        Reconciliation::ConfirmWipe { previous, live: live_id } => {
            warn!(previous = %previous, live = live_id, "persisted network differs from live network");
            let wiped = prompt.confirm(&mismatch_message(&previous, live_id));
            if wiped {
                store.clear()?;
                info!("persisted state cleared");
            } else {
                // mismatch stays until the user resolves it
                warn!("wipe declined, reloading with stale persisted state");
            }
            Ok(ReconcileOutcome::Reload { wiped })
        }
    }
}
