//! End-to-end bootstrap tests: mock ledger, real read models, file store.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use ledgergov_common::abi;
use ledgergov_common::store::{KEY_COMPANY_ADDRESS, KEY_NETWORK, KEY_NETWORK_NAME};
use ledgergov_common::{
    Address, ExecutionContext, FileConfigStore, MockLedger, NetworkConfigStore, NetworkTable,
};
use ledgergov_governance::contract::SIG_VOTING_POWER;
use ledgergov_governance::{GovernanceEngine, RpcGovernanceContract, Voting, VotingSession};
use ledgergov_node::{
    BootstrapOutcome, CollectionSyncGate, ConnectionSupervisor, LedgerReadModel, ReadModel,
    SupervisorConfig, UserPrompt,
};

const COMPANY: Address = Address([0xc0; 20]);

struct ScriptedPrompt {
    answer: bool,
    confirms: Mutex<u32>,
}

impl UserPrompt for ScriptedPrompt {
    fn confirm(&self, _message: &str) -> bool {
        *self.confirms.lock() += 1;
        self.answer
    }

    fn alert(&self, _message: &str) {}
}

fn supervisor(
    ledger: Arc<MockLedger>,
    store: Arc<FileConfigStore>,
    prompt: Arc<ScriptedPrompt>,
) -> (ConnectionSupervisor, Arc<RpcGovernanceContract>) {
    let accounts: Arc<dyn ReadModel> =
        Arc::new(LedgerReadModel::accounts(ledger.clone(), Duration::from_secs(3600)));
    let blocks: Arc<dyn ReadModel> =
        Arc::new(LedgerReadModel::blocks(ledger.clone(), Duration::from_secs(3600)));
    let gate = Arc::new(CollectionSyncGate::new(accounts, blocks));
    let company = Arc::new(RpcGovernanceContract::new("Company", COMPANY, ledger.clone()));

    let config = SupervisorConfig {
        context: ExecutionContext::Embedded,
        ..SupervisorConfig::default()
    };
    let supervisor = ConnectionSupervisor::new(
        ledger,
        gate,
        store,
        prompt,
        NetworkTable::default(),
        config,
    )
    .with_binding(company.clone());
    (supervisor, company)
}

// ── Test 1 ──

#[tokio::test(start_paused = true)]
async fn confirmed_wipe_then_reload_lands_on_live_network() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {}", e));
    let path = dir.path().join("network.json");
    {
        let store = FileConfigStore::open(&path).unwrap_or_else(|e| panic!("open: {}", e));
        store.set(KEY_NETWORK, "5").unwrap_or_else(|e| panic!("set: {}", e));
        store
            .set(KEY_COMPANY_ADDRESS, "0xabc")
            .unwrap_or_else(|e| panic!("set: {}", e));
    }

    let ledger = Arc::new(MockLedger::new());
    ledger.set_network_id("42");
    let prompt = Arc::new(ScriptedPrompt {
        answer: true,
        confirms: Mutex::new(0),
    });

    // first process: mismatch, wipe confirmed
    let store = Arc::new(FileConfigStore::open(&path).unwrap_or_else(|e| panic!("open: {}", e)));
    let (first, _) = supervisor(ledger.clone(), store, prompt.clone());
    let outcome = first.connect().await;
    assert!(matches!(outcome, Ok(BootstrapOutcome::Reload { wiped: true })));
    assert_eq!(*prompt.confirms.lock(), 1);

    // restarted process reads the cleared file
    let store = Arc::new(FileConfigStore::open(&path).unwrap_or_else(|e| panic!("open: {}", e)));
    let (second, _) = supervisor(ledger, store.clone(), prompt.clone());
    let outcome = second.connect().await;
    assert!(outcome.as_ref().map(BootstrapOutcome::is_ready).unwrap_or(false));
    assert_eq!(*prompt.confirms.lock(), 1);

    let reopened = FileConfigStore::open(&path).unwrap_or_else(|e| panic!("open: {}", e));
    assert_eq!(reopened.get(KEY_NETWORK).ok().flatten().as_deref(), Some("42"));
    assert_eq!(reopened.get(KEY_NETWORK_NAME).ok().flatten().as_deref(), Some("Kovan"));
    assert_eq!(reopened.get(KEY_COMPANY_ADDRESS).ok().flatten(), None);
}

// ── Test 2 ──

#[tokio::test(start_paused = true)]
async fn bound_company_contract_feeds_engine() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {}", e));
    let store = Arc::new(
        FileConfigStore::open(dir.path().join("network.json"))
            .unwrap_or_else(|e| panic!("open: {}", e)),
    );
    let ledger = Arc::new(MockLedger::new());
    ledger.set_selector_response(
        abi::selector(SIG_VOTING_POWER),
        Ok(abi::encode_uints(&[25, 0, 10])),
    );
    let prompt = Arc::new(ScriptedPrompt {
        answer: false,
        confirms: Mutex::new(0),
    });

    let (supervisor, company) = supervisor(ledger, store, prompt);
    assert!(!company.is_bound());

    let outcome = supervisor.connect().await;
    assert!(matches!(outcome, Ok(BootstrapOutcome::Ready { ready: true, .. })));
    assert!(company.is_bound());

    let engine = GovernanceEngine::new(company);
    let session = VotingSession::new(
        Voting {
            index: 0,
            address: Address([0xbb; 20]),
            options: vec!["Approve".into(), "Reject".into()],
            closed: false,
            executed: None,
            support_needed: 0.5,
            main_signature: [0; 4],
        },
        Address([0xaa; 20]),
    );
    assert_eq!(engine.can_vote(&session).await, Ok(true));
    assert_eq!(engine.voting_power(&session).await, Ok(25));
}
