//! # ledgergov Governance Crate
//!
//! Turns raw governance contract query results into the values a voting
//! view renders: eligibility, tallies, projected outcome and executability.
//!
//! ## Modules
//! - `types`: decoded query results and verdicts (`Ballot`, `TallySnapshot`, ...)
//! - `contract`: `GovernanceContract` trait and its JSON-RPC binding
//! - `mock_contract`: scriptable contract for tests
//! - `engine`: pure derivations plus the async `GovernanceEngine`
//! - `session`: per-view `VotingSession`
//! - `actions`: vote actions handed to an external signer
//!
//! ## Voting Lifecycle (observed, never driven)
//! ```text
//! Open ──votes──▶ ApprovedExecutable ──tx──▶ Executed(option)
//!          └────▶ RejectedOrPending
//! ```

pub mod actions;
pub mod contract;
pub mod engine;
pub mod mock_contract;
pub mod session;
pub mod types;

pub use actions::{ActionDispatcher, DispatchError, VoteAction};
pub use contract::{ContractError, GovernanceContract, RpcGovernanceContract};
pub use engine::GovernanceEngine;
pub use mock_contract::MockGovernanceContract;
pub use session::VotingSession;
pub use types::{
    Ballot, ExecutionVerdict, HasVoted, PendingVotes, Sentiment, TallySnapshot, Voting,
    VotingPowerTuple, APPROVE_OPTION, MAX_OPTIONS, NOT_VOTED_SENTINEL,
};
