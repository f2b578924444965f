//! # Governance State Engine
//!
//! Derives eligibility, tally progress and executability from contract
//! query results.
//!
//! ## Layers
//!
//! ```text
//! GovernanceEngine (async)           pure functions
//! ────────────────────────           ──────────────
//! fetch voting power  ──────────▶    can_vote / has_voted / voting_power
//! fetch every option tally ─────▶    pending_votes
//! fetch power + approve tally ──▶    will_be_able_to_execute
//! ask can_perform_action ───────▶    ExecutionVerdict
//! ```
//!
//! ## Freshness
//!
//! On-chain state changes between blocks. Every engine call issues its own
//! queries; nothing is cached between calls.
//!
//! ## Zero Voting Power
//!
//! A voting with `total_voting_power == 0` has no meaningful ratio. Pending
//! votes report `relative = 0.0` and executability is always false.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::contract::{ContractError, GovernanceContract};
use crate::session::VotingSession;
use crate::types::{
    Ballot, ExecutionVerdict, HasVoted, PendingVotes, Sentiment, TallySnapshot, Voting,
    VotingPowerTuple, APPROVE_OPTION, MAX_OPTIONS,
};

// ════════════════════════════════════════════════════════════════════════════════
// PURE FUNCTIONS
// ════════════════════════════════════════════════════════════════════════════════

pub fn can_vote(power: &VotingPowerTuple, voting_closed: bool) -> bool {
    !voting_closed && power.votable > 0
}

/// `voted` is driven by modifiable power alone, not by the ballot.
pub fn has_voted(power: &VotingPowerTuple) -> HasVoted {
    HasVoted {
        voted: power.modifiable > 0,
        ballot: power.ballot,
        modifiable: power.modifiable,
    }
}

pub fn voting_power(power: &VotingPowerTuple) -> u128 {
    power.votable
}

/// Power not yet cast on any option.
///
/// Total voting power is read from the first snapshot; all options of a
/// voting share it.
pub fn pending_votes(tallies: &[TallySnapshot]) -> PendingVotes {
    let total_power = match tallies.first() {
        Some(first) => first.total_voting_power,
        None => {
            return PendingVotes {
                votes: 0,
                relative: 0.0,
            }
        }
    };
    let cast = tallies
        .iter()
        .fold(0u128, |acc, t| acc.saturating_add(t.current_votes));
    let votes = total_power.saturating_sub(cast);

    PendingVotes {
        votes,
        relative: ratio(votes, total_power),
    }
}

/// Whether the approve option would reach `support_needed` if the holder
/// put all their reachable power behind it.
///
/// Power already cast for a non-approve option counts as reachable, since
/// the holder can still move it. A ballot already on option 0 adds nothing:
/// that power sits in the approve tally already. Counting modifiable power
/// for every cast ballot, option 0 included, would count it twice.
pub fn will_be_able_to_execute(
    power: &VotingPowerTuple,
    approve: &TallySnapshot,
    support_needed: f64,
) -> bool {
    if approve.total_voting_power == 0 {
        return false;
    }
    let movable = match power.ballot {
        Ballot::VotedFor(option) if option != APPROVE_OPTION => power.modifiable,
        Ballot::Unknown(_) => power.modifiable,
        Ballot::VotedFor(_) | Ballot::NotVoted => 0,
    };
    let future_votes = approve
        .current_votes
        .saturating_add(power.votable)
        .saturating_add(movable);
    ratio(future_votes, approve.total_voting_power) >= support_needed
}

/// Display name of the option a ballot was cast for.
pub fn option_name_for(voting: &Voting, ballot: Ballot) -> Option<&str> {
    ballot.option().and_then(|option| voting.option_name(option))
}

pub fn can_modify_vote(voting: &Voting, modifiable: u128) -> bool {
    !voting.closed && modifiable > 0
}

pub fn is_executed(voting: &Voting, option: u8) -> bool {
    voting.closed && voting.executed == Some(option)
}

fn ratio(numerator: u128, denominator: u128) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

// ════════════════════════════════════════════════════════════════════════════════
// ENGINE
// ════════════════════════════════════════════════════════════════════════════════

/// Query front-end used by the UI collaborator.
pub struct GovernanceEngine {
    contract: Arc<dyn GovernanceContract>,
}

impl GovernanceEngine {
    pub fn new(contract: Arc<dyn GovernanceContract>) -> Self {
        Self { contract }
    }

    async fn fetch_power(&self, session: &VotingSession) -> Result<VotingPowerTuple, ContractError> {
        self.contract
            .voting_power_for_voting(session.voting().index, session.holder())
            .await
    }

    pub async fn can_vote(&self, session: &VotingSession) -> Result<bool, ContractError> {
        let power = self.fetch_power(session).await?;
        Ok(can_vote(&power, session.voting().closed))
    }

    /// True in modify mode without querying; otherwise [`Self::can_vote`].
    pub async fn can_vote_or_modify(&self, session: &VotingSession) -> Result<bool, ContractError> {
        if session.is_modifying() {
            return Ok(true);
        }
        self.can_vote(session).await
    }

    pub async fn has_voted(&self, session: &VotingSession) -> Result<HasVoted, ContractError> {
        Ok(has_voted(&self.fetch_power(session).await?))
    }

    pub async fn voting_power(&self, session: &VotingSession) -> Result<u128, ContractError> {
        Ok(voting_power(&self.fetch_power(session).await?))
    }

    /// Fetches every option's tally concurrently.
    ///
    /// Options are addressed by `uint8`; a voting with more than
    /// [`MAX_OPTIONS`] options is rejected before any query.
    pub async fn tallies(&self, voting: &Voting) -> Result<Vec<TallySnapshot>, ContractError> {
        let count = voting.option_count();
        if count > MAX_OPTIONS {
            return Err(ContractError::TooManyOptions(count));
        }
        let index = voting.index;
        let queries = (0..=u8::MAX)
            .take(count)
            .map(|option| self.contract.count_votes(index, option));
        try_join_all(queries).await
    }

    pub async fn pending_votes(&self, voting: &Voting) -> Result<PendingVotes, ContractError> {
        let tallies = self.tallies(voting).await?;
        let pending = pending_votes(&tallies);
        debug!(voting = voting.index, pending = pending.votes, "pending votes");
        Ok(pending)
    }

    pub async fn will_be_able_to_execute(&self, session: &VotingSession) -> Result<bool, ContractError> {
        let voting = session.voting();
        let (power, approve) = futures::try_join!(
            self.fetch_power(session),
            self.contract.count_votes(voting.index, APPROVE_OPTION),
        )?;
        Ok(will_be_able_to_execute(&power, &approve, voting.support_needed))
    }

    /// Executability as decided by the contract.
    ///
    /// Tally arithmetic is not consulted here; the contract is the source of
    /// truth for whether the action can be performed.
    pub async fn can_execute(&self, voting: &Voting) -> Result<ExecutionVerdict, ContractError> {
        if voting.executed.is_some() {
            return Ok(ExecutionVerdict::NotApplicable);
        }

        let performable = self
            .contract
            .can_perform_action(voting.main_signature, voting.address)
            .await?;
        if !performable {
            return Ok(ExecutionVerdict::NoAction);
        }

        Ok(ExecutionVerdict::Executable {
            option: APPROVE_OPTION,
            option_name: voting.option_name(APPROVE_OPTION).unwrap_or_default().to_string(),
            sentiment: Sentiment::Primary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn power(votable: u128, modifiable: u128, ballot: Ballot) -> VotingPowerTuple {
        VotingPowerTuple {
            votable,
            modifiable,
            ballot,
        }
    }

    fn tally(current: u128, cast: u128, total: u128) -> TallySnapshot {
        TallySnapshot {
            current_votes: current,
            total_votes_cast: cast,
            total_voting_power: total,
        }
    }

    #[test]
    fn closed_voting_never_allows_voting() {
        for votable in [0u128, 1, 1_000_000] {
            assert!(!can_vote(&power(votable, 0, Ballot::NotVoted), true));
        }
        assert!(can_vote(&power(1, 0, Ballot::NotVoted), false));
    }

    #[test]
    fn voted_depends_only_on_modifiable() {
        for ballot in [Ballot::NotVoted, Ballot::VotedFor(0), Ballot::VotedFor(4)] {
            assert!(has_voted(&power(0, 1, ballot)).voted);
            assert!(!has_voted(&power(9, 0, ballot)).voted);
        }
    }

    #[test]
    fn holder_with_only_modifiable_power() {
        let p = power(0, 5, Ballot::NotVoted);
        assert!(!can_vote(&p, false));
        assert_eq!(
            has_voted(&p),
            HasVoted {
                voted: true,
                ballot: Ballot::NotVoted,
                modifiable: 5
            }
        );
        assert_eq!(has_voted(&p).ballot.to_raw(), 10);
        assert_eq!(voting_power(&p), 0);
    }

    #[test]
    fn pending_votes_is_power_minus_cast() {
        let tallies = [tally(40, 60, 100), tally(20, 60, 100)];
        let pending = pending_votes(&tallies);
        assert_eq!(pending.votes, 40);
        assert!((pending.relative * 100.0 - 40.0).abs() < 1e-9);
    }

    #[test]
    fn pending_votes_relative_times_power_is_votes() {
        for (c, t, p) in [(0u128, 0u128, 7u128), (3, 5, 9), (10, 10, 10), (1, 2, 3)] {
            let tallies = [tally(c, t, p), tally(t - c, t, p)];
            let pending = pending_votes(&tallies);
            assert_eq!(pending.votes, p - t);
            assert!((pending.relative * p as f64 - pending.votes as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_power_voting_is_degenerate_not_nan() {
        let pending = pending_votes(&[tally(0, 0, 0)]);
        assert_eq!(pending.votes, 0);
        assert_eq!(pending.relative, 0.0);
        assert!(!will_be_able_to_execute(&power(5, 5, Ballot::VotedFor(1)), &tally(0, 0, 0), 0.0));
        assert_eq!(pending_votes(&[]).votes, 0);
    }

    #[test]
    fn non_approve_voter_can_swing_modifiable_power() {
        let p = power(10, 5, Ballot::VotedFor(3));
        // 40 + 10 + 5 = 55 of 100
        assert!(will_be_able_to_execute(&p, &tally(40, 100, 100), 0.5));
        assert!(!will_be_able_to_execute(&p, &tally(40, 100, 100), 0.56));
    }

    #[test]
    fn approve_voter_power_is_already_counted() {
        let p = power(10, 5, Ballot::VotedFor(APPROVE_OPTION));
        // 40 + 10 = 50 of 100
        assert!(will_be_able_to_execute(&p, &tally(40, 100, 100), 0.5));
        assert!(!will_be_able_to_execute(&p, &tally(40, 100, 100), 0.51));
    }

    #[test]
    fn unknown_ballot_keeps_power_queries_working() {
        let p = power(7, 3, Ballot::Unknown(11));
        assert!(can_vote(&p, false));
        assert_eq!(voting_power(&p), 7);
        assert_eq!(has_voted(&p).ballot, Ballot::Unknown(11));
        // 40 + 7 + 3 = 50 of 100
        assert!(will_be_able_to_execute(&p, &tally(40, 100, 100), 0.5));
    }

    #[test]
    fn option_helpers() {
        let voting = Voting {
            index: 1,
            address: ledgergov_common::Address([1; 20]),
            options: vec!["Approve".into(), "Reject".into()],
            closed: true,
            executed: Some(1),
            support_needed: 0.5,
            main_signature: [0; 4],
        };
        assert_eq!(option_name_for(&voting, Ballot::VotedFor(1)), Some("Reject"));
        assert_eq!(option_name_for(&voting, Ballot::NotVoted), None);
        assert!(is_executed(&voting, 1));
        assert!(!is_executed(&voting, 0));
        assert!(!can_modify_vote(&voting, 5));

        let open = Voting {
            closed: false,
            ..voting
        };
        assert!(can_modify_vote(&open, 5));
        assert!(!can_modify_vote(&open, 0));
        assert!(!is_executed(&open, 1));
    }
}
