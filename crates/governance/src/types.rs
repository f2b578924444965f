//! # Governance Types
//!
//! Decoded values crossing the contract boundary and the verdicts derived
//! from them.
//!
//! ## Ballot Encoding
//!
//! The contract reports a holder's voted option as a small integer where
//! [`NOT_VOTED_SENTINEL`] means no vote was cast. That encoding stops at
//! [`Ballot::from_raw`]; everything past the boundary matches on
//! [`Ballot`].
//!
//! ```text
//! raw  0..=9  ──▶ Ballot::VotedFor(raw)
//! raw  10     ──▶ Ballot::NotVoted
//! raw  > 10   ──▶ Ballot::Unknown(raw)
//! ```
//!
//! Unknown values pass through untouched; only the queries that look at the
//! voted option need to care about them.

use serde::{Deserialize, Serialize};

use ledgergov_common::Address;

/// Raw voted-option value meaning "no vote cast yet".
pub const NOT_VOTED_SENTINEL: u8 = 10;

/// Option index of the approve path.
pub const APPROVE_OPTION: u8 = 0;

/// Options addressable through the contract's `uint8` option argument.
pub const MAX_OPTIONS: usize = 256;

// ════════════════════════════════════════════════════════════════════════════════
// BALLOT
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ballot {
    NotVoted,
    VotedFor(u8),
    /// Raw value outside the known option range, kept as reported.
    Unknown(u128),
}

impl Ballot {
    /// Decodes the contract's voted-option word.
    pub fn from_raw(raw: u128) -> Self {
        match raw {
            r if r == u128::from(NOT_VOTED_SENTINEL) => Ballot::NotVoted,
            r if r < u128::from(NOT_VOTED_SENTINEL) => Ballot::VotedFor(r as u8),
            r => Ballot::Unknown(r),
        }
    }

    pub fn to_raw(self) -> u128 {
        match self {
            Ballot::NotVoted => u128::from(NOT_VOTED_SENTINEL),
            Ballot::VotedFor(option) => u128::from(option),
            Ballot::Unknown(raw) => raw,
        }
    }

    /// Option index, for ballots that name a known option.
    pub fn option(self) -> Option<u8> {
        match self {
            Ballot::VotedFor(option) => Some(option),
            Ballot::NotVoted | Ballot::Unknown(_) => None,
        }
    }

    /// Whether the ballot already backs the approve option.
    pub fn is_approve(self) -> bool {
        self == Ballot::VotedFor(APPROVE_OPTION)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// QUERY RESULTS
// ════════════════════════════════════════════════════════════════════════════════

/// Per-holder, per-voting power as reported by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingPowerTuple {
    /// Power the holder can still cast.
    pub votable: u128,
    /// Power already cast that may be reassigned.
    pub modifiable: u128,
    pub ballot: Ballot,
}

/// Vote count for one option.
///
/// `total_votes_cast <= total_voting_power` is checked at decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallySnapshot {
    pub current_votes: u128,
    pub total_votes_cast: u128,
    pub total_voting_power: u128,
}

// ════════════════════════════════════════════════════════════════════════════════
// VOTING
// ════════════════════════════════════════════════════════════════════════════════

/// A governance voting as indexed by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voting {
    pub index: u64,
    /// Voting contract address.
    pub address: Address,
    pub options: Vec<String>,
    pub closed: bool,
    /// Option executed, once the outcome was recorded.
    pub executed: Option<u8>,
    /// Required support ratio in `[0, 1]`.
    pub support_needed: f64,
    /// Selector of the action the voting would execute.
    pub main_signature: [u8; 4],
}

impl Voting {
    pub fn option_name(&self, option: u8) -> Option<&str> {
        self.options.get(usize::from(option)).map(String::as_str)
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// DERIVED
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasVoted {
    pub voted: bool,
    pub ballot: Ballot,
    pub modifiable: u128,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingVotes {
    /// Voting power not yet cast on any option.
    pub votes: u128,
    /// `votes / total_voting_power`; 0.0 when there is no power at all.
    pub relative: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Sentiment {
    Primary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionVerdict {
    /// The voting already recorded an execution outcome.
    NotApplicable,
    NoAction,
    Executable {
        option: u8,
        option_name: String,
        sentiment: Sentiment,
    },
}

impl ExecutionVerdict {
    pub fn is_executable(&self) -> bool {
        matches!(self, ExecutionVerdict::Executable { .. })
    }
}
