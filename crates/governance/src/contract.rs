//! # Governance Contract Boundary
//!
//! The company contract is an opaque remote service. This module defines the
//! three queries the engine needs and decodes their raw words into typed
//! values.
//!
//! ## Queries
//!
//! | Method                              | Returns                                        |
//! |-------------------------------------|------------------------------------------------|
//! | `votingPowerForVoting(uint256)`     | `(votable, modifiable, votedOption)` for `from` |
//! | `countVotes(uint256,uint8)`         | `(current, totalCast, totalPower)`             |
//! | `canPerformAction(bytes4,address)`  | `bool`                                         |
//!
//! ## Binding
//!
//! [`RpcGovernanceContract`] refuses calls until the supervisor hands it a
//! provider through [`ContractBinding::set_provider`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, trace};

use ledgergov_common::abi::{self, AbiError, Token};
use ledgergov_common::{Address, CallRequest, ContractBinding, LedgerClient, LedgerError, ProviderInfo};

use crate::types::{Ballot, TallySnapshot, VotingPowerTuple};

pub const SIG_VOTING_POWER: &str = "votingPowerForVoting(uint256)";
pub const SIG_COUNT_VOTES: &str = "countVotes(uint256,uint8)";
pub const SIG_CAN_PERFORM: &str = "canPerformAction(bytes4,address)";

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("contract {0} has no provider bound")]
    Unbound(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("malformed return data: {0}")]
    Abi(#[from] AbiError),

    #[error("tally reports {cast} votes cast out of {power} voting power")]
    InconsistentTally { cast: u128, power: u128 },

    #[error("voting has {0} options, at most 256 are addressable")]
    TooManyOptions(usize),
}

// ════════════════════════════════════════════════════════════════════════════════
// TRAIT
// ════════════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait GovernanceContract: Send + Sync {
    async fn voting_power_for_voting(
        &self,
        voting: u64,
        holder: Address,
    ) -> Result<VotingPowerTuple, ContractError>;

    async fn count_votes(&self, voting: u64, option: u8) -> Result<TallySnapshot, ContractError>;

    async fn can_perform_action(
        &self,
        signature: [u8; 4],
        target: Address,
    ) -> Result<bool, ContractError>;
}

// ════════════════════════════════════════════════════════════════════════════════
// DECODING
// ════════════════════════════════════════════════════════════════════════════════

pub fn decode_voting_power(data: &[u8]) -> Result<VotingPowerTuple, ContractError> {
    let words = abi::decode_uints(data, 3)?;
    Ok(VotingPowerTuple {
        votable: words[0],
        modifiable: words[1],
        ballot: Ballot::from_raw(words[2]),
    })
}

pub fn decode_tally(data: &[u8]) -> Result<TallySnapshot, ContractError> {
    let words = abi::decode_uints(data, 3)?;
    let snapshot = TallySnapshot {
        current_votes: words[0],
        total_votes_cast: words[1],
        total_voting_power: words[2],
    };
    if snapshot.total_votes_cast > snapshot.total_voting_power {
        return Err(ContractError::InconsistentTally {
            cast: snapshot.total_votes_cast,
            power: snapshot.total_voting_power,
        });
    }
    Ok(snapshot)
}

// ════════════════════════════════════════════════════════════════════════════════
// RPC BINDING
// ════════════════════════════════════════════════════════════════════════════════

/// Company contract reached through a [`LedgerClient`].
pub struct RpcGovernanceContract {
    name: String,
    address: Address,
    ledger: Arc<dyn LedgerClient>,
    provider: RwLock<Option<ProviderInfo>>,
}

impl RpcGovernanceContract {
    pub fn new(name: impl Into<String>, address: Address, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            name: name.into(),
            address,
            ledger,
            provider: RwLock::new(None),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_bound(&self) -> bool {
        self.provider.read().is_some()
    }

    async fn call(&self, data: Vec<u8>, from: Option<Address>) -> Result<Vec<u8>, ContractError> {
        if !self.is_bound() {
            return Err(ContractError::Unbound(self.name.clone()));
        }
        let request = CallRequest {
            to: self.address,
            from,
            data,
        };
        let out = self.ledger.call(&request).await?;
        trace!(contract = %self.name, bytes = out.len(), "contract call returned");
        Ok(out)
    }
}

impl ContractBinding for RpcGovernanceContract {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_provider(&self, provider: &ProviderInfo) {
        debug!(contract = %self.name, endpoint = %provider.endpoint, "binding provider");
        *self.provider.write() = Some(provider.clone());
    }
}

#[async_trait]
impl GovernanceContract for RpcGovernanceContract {
    async fn voting_power_for_voting(
        &self,
        voting: u64,
        holder: Address,
    ) -> Result<VotingPowerTuple, ContractError> {
        let data = abi::encode_call(SIG_VOTING_POWER, &[Token::Uint(u128::from(voting))]);
        let out = self.call(data, Some(holder)).await?;
        decode_voting_power(&out)
    }

    async fn count_votes(&self, voting: u64, option: u8) -> Result<TallySnapshot, ContractError> {
        let data = abi::encode_call(
            SIG_COUNT_VOTES,
            &[Token::Uint(u128::from(voting)), Token::Uint(u128::from(option))],
        );
        let out = self.call(data, None).await?;
        decode_tally(&out)
    }

    async fn can_perform_action(
        &self,
        signature: [u8; 4],
        target: Address,
    ) -> Result<bool, ContractError> {
        let data = abi::encode_call(SIG_CAN_PERFORM, &[Token::Bytes4(signature), Token::Address(target)]);
        let out = self.call(data, None).await?;
        Ok(abi::decode_bool(&out)?)
    }
}
