//! Mock governance contract for testing.
//!
//! Answers are keyed by their query arguments; an unscripted query returns
//! `LedgerError::Rpc`. Every query is counted so tests can check that the
//! engine re-fetches instead of caching.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use ledgergov_common::{Address, LedgerError};

use crate::contract::{ContractError, GovernanceContract};
use crate::types::{TallySnapshot, VotingPowerTuple};

#[derive(Debug, Default)]
struct Script {
    power: HashMap<(u64, Address), Result<VotingPowerTuple, ContractError>>,
    tallies: HashMap<(u64, u8), Result<TallySnapshot, ContractError>>,
    performable: HashMap<([u8; 4], Address), Result<bool, ContractError>>,
}

#[derive(Debug, Default)]
pub struct MockGovernanceContract {
    script: Mutex<Script>,
    power_queries: AtomicU64,
    tally_queries: AtomicU64,
    action_queries: AtomicU64,
}

fn unscripted<T>() -> Result<T, ContractError> {
    Err(ContractError::Ledger(LedgerError::Rpc {
        code: -32000,
        message: "no mock response".to_string(),
    }))
}

impl MockGovernanceContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_voting_power(&self, voting: u64, holder: Address, power: Result<VotingPowerTuple, ContractError>) {
        self.script.lock().power.insert((voting, holder), power);
    }

    pub fn set_tally(&self, voting: u64, option: u8, tally: Result<TallySnapshot, ContractError>) {
        self.script.lock().tallies.insert((voting, option), tally);
    }

    pub fn set_can_perform(&self, signature: [u8; 4], target: Address, answer: Result<bool, ContractError>) {
        self.script.lock().performable.insert((signature, target), answer);
    }

    pub fn power_queries(&self) -> u64 {
        self.power_queries.load(Ordering::SeqCst)
    }

    pub fn tally_queries(&self) -> u64 {
        self.tally_queries.load(Ordering::SeqCst)
    }

    pub fn action_queries(&self) -> u64 {
        self.action_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GovernanceContract for MockGovernanceContract {
    async fn voting_power_for_voting(
        &self,
        voting: u64,
        holder: Address,
    ) -> Result<VotingPowerTuple, ContractError> {
        self.power_queries.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().power.get(&(voting, holder)) {
            Some(answer) => answer.clone(),
            None => unscripted(),
        }
    }

    async fn count_votes(&self, voting: u64, option: u8) -> Result<TallySnapshot, ContractError> {
        self.tally_queries.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().tallies.get(&(voting, option)) {
            Some(answer) => answer.clone(),
            None => unscripted(),
        }
    }

    async fn can_perform_action(
        &self,
        signature: [u8; 4],
        target: Address,
    ) -> Result<bool, ContractError> {
        self.action_queries.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().performable.get(&(signature, target)) {
            Some(answer) => answer.clone(),
            None => unscripted(),
        }
    }
}
