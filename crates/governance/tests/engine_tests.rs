//! Engine tests against a scripted contract.

use std::sync::Arc;

use ledgergov_common::{Address, LedgerError};
use ledgergov_governance::{
    Ballot, ContractError, ExecutionVerdict, GovernanceEngine, MockGovernanceContract, Sentiment,
    TallySnapshot, Voting, VotingPowerTuple, VotingSession,
};

const HOLDER: Address = Address([0xaa; 20]);
const VOTING_ADDR: Address = Address([0xbb; 20]);
const SIGNATURE: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

fn voting(executed: Option<u8>) -> Voting {
    Voting {
        index: 7,
        address: VOTING_ADDR,
        options: vec!["Approve".into(), "Reject".into(), "Abstain".into()],
        closed: false,
        executed,
        support_needed: 0.5,
        main_signature: SIGNATURE,
    }
}

fn tally(current: u128, cast: u128, total: u128) -> Result<TallySnapshot, ContractError> {
    Ok(TallySnapshot {
        current_votes: current,
        total_votes_cast: cast,
        total_voting_power: total,
    })
}

fn setup() -> (Arc<MockGovernanceContract>, GovernanceEngine) {
    let contract = Arc::new(MockGovernanceContract::new());
    let engine = GovernanceEngine::new(contract.clone());
    (contract, engine)
}

// ── Test 1 ──

#[tokio::test]
async fn every_call_refetches_voting_power() {
    let (contract, engine) = setup();
    let session = VotingSession::new(voting(None), HOLDER);
    contract.set_voting_power(
        7,
        HOLDER,
        Ok(VotingPowerTuple {
            votable: 3,
            modifiable: 0,
            ballot: Ballot::NotVoted,
        }),
    );

    assert_eq!(engine.can_vote(&session).await, Ok(true));
    assert_eq!(engine.voting_power(&session).await, Ok(3));

    contract.set_voting_power(
        7,
        HOLDER,
        Ok(VotingPowerTuple {
            votable: 0,
            modifiable: 3,
            ballot: Ballot::VotedFor(1),
        }),
    );
    assert_eq!(engine.can_vote(&session).await, Ok(false));
    let voted = engine
        .has_voted(&session)
        .await
        .unwrap_or_else(|e| panic!("has_voted failed: {}", e));
    assert!(voted.voted);
    assert_eq!(voted.ballot, Ballot::VotedFor(1));
    assert_eq!(contract.power_queries(), 4);
}

// ── Test 2 ──

#[tokio::test]
async fn modify_mode_short_circuits_can_vote() {
    let (contract, engine) = setup();
    let mut session = VotingSession::new(voting(None), HOLDER);
    session.set_modifying(true);

    assert_eq!(engine.can_vote_or_modify(&session).await, Ok(true));
    assert_eq!(contract.power_queries(), 0);
}

// ── Test 3 ──

#[tokio::test]
async fn pending_votes_queries_every_option() {
    let (contract, engine) = setup();
    contract.set_tally(7, 0, tally(30, 50, 200));
    contract.set_tally(7, 1, tally(15, 50, 200));
    contract.set_tally(7, 2, tally(5, 50, 200));

    let pending = engine
        .pending_votes(&voting(None))
        .await
        .unwrap_or_else(|e| panic!("pending_votes failed: {}", e));

    assert_eq!(pending.votes, 150);
    assert!((pending.relative - 0.75).abs() < 1e-9);
    assert_eq!(contract.tally_queries(), 3);
}

// ── Test 4 ──

#[tokio::test]
async fn pending_votes_fails_if_any_option_fails() {
    let (contract, engine) = setup();
    contract.set_tally(7, 0, tally(30, 50, 200));
    contract.set_tally(7, 1, Err(ContractError::Ledger(LedgerError::Timeout)));
    contract.set_tally(7, 2, tally(5, 50, 200));

    assert_eq!(
        engine.pending_votes(&voting(None)).await,
        Err(ContractError::Ledger(LedgerError::Timeout))
    );
}

// ── Test 5 ──

#[tokio::test]
async fn will_be_able_to_execute_uses_approve_tally() {
    let (contract, engine) = setup();
    let session = VotingSession::new(voting(None), HOLDER);
    contract.set_voting_power(
        7,
        HOLDER,
        Ok(VotingPowerTuple {
            votable: 10,
            modifiable: 5,
            ballot: Ballot::VotedFor(2),
        }),
    );
    contract.set_tally(7, 0, tally(40, 100, 100));

    assert_eq!(engine.will_be_able_to_execute(&session).await, Ok(true));
}

// ── Test 6 ──

#[tokio::test]
async fn executed_voting_is_not_applicable_without_query() {
    let (contract, engine) = setup();
    contract.set_can_perform(SIGNATURE, VOTING_ADDR, Ok(true));

    for executed in [Some(0u8), Some(1), Some(2)] {
        assert_eq!(
            engine.can_execute(&voting(executed)).await,
            Ok(ExecutionVerdict::NotApplicable)
        );
    }
    assert_eq!(contract.action_queries(), 0);
}

// ── Test 7 ──

#[tokio::test]
async fn contract_decides_executability() {
    let (contract, engine) = setup();

    contract.set_can_perform(SIGNATURE, VOTING_ADDR, Ok(true));
    assert_eq!(
        engine.can_execute(&voting(None)).await,
        Ok(ExecutionVerdict::Executable {
            option: 0,
            option_name: "Approve".into(),
            sentiment: Sentiment::Primary,
        })
    );

    contract.set_can_perform(SIGNATURE, VOTING_ADDR, Ok(false));
    assert_eq!(
        engine.can_execute(&voting(None)).await,
        Ok(ExecutionVerdict::NoAction)
    );
}

// ── Test 8 ──

#[tokio::test]
async fn voting_with_unaddressable_options_is_rejected_before_querying() {
    let (contract, engine) = setup();
    let mut oversized = voting(None);
    oversized.options = (0..257).map(|i| format!("Option {}", i)).collect();

    assert_eq!(
        engine.pending_votes(&oversized).await,
        Err(ContractError::TooManyOptions(257))
    );
    assert_eq!(contract.tally_queries(), 0);
}
