//! # ledgergov Node Entry Point
//!
//! Bootstraps a connection to a ledger node and keeps following it.
//!
//! ## Usage
//! ```text
//! ledgergov-node [--config FILE] [--rpc-url URL] [--context browser|embedded]
//!                [--store FILE] [--assume-yes]
//! ```
//!
//! Precedence: CLI flags > `LEDGERGOV_*` environment > config file > defaults.
//!
//! ## Exit Codes
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | ready, stopped with Ctrl+C                       |
//! | 1    | configuration or transport error                 |
//! | 2    | connected network is not supported               |
//! | 3    | reload required (network switch or state wipe)   |

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ledgergov_common::store::{load_record, KEY_COMPANY_ADDRESS};
use ledgergov_common::{
    Address, ClientConfig, ExecutionContext, FileConfigStore, JsonRpcLedgerClient, LedgerClient,
    NetworkConfigStore,
};
use ledgergov_governance::RpcGovernanceContract;
use ledgergov_node::read_model::DEFAULT_POLL_INTERVAL;
use ledgergov_node::{
    BlockWatcher, BootstrapOutcome, CollectionSyncGate, ConnectionSupervisor, LedgerHealth,
    LedgerReadModel, ReadModel, SupervisorConfig, UserPrompt,
};

const EXIT_ERROR: i32 = 1;
const EXIT_UNSUPPORTED: i32 = 2;
const EXIT_RELOAD: i32 = 3;

// ════════════════════════════════════════════════════════════════════════════
// CLI
// ════════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "ledgergov-node", about = "Ledger governance client bootstrap", version)]
struct Cli {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ledger node JSON-RPC endpoint.
    #[arg(long)]
    rpc_url: Option<String>,

    /// Execution context: browser or embedded.
    #[arg(long)]
    context: Option<ExecutionContext>,

    /// Persisted network config file.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Answer yes to every confirmation prompt.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    assume_yes: bool,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ClientConfig::default(),
        };
        config.apply_env().context("applying environment overrides")?;

        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(context) = self.context {
            config.context = context;
        }
        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PROMPT
// ════════════════════════════════════════════════════════════════════════════

/// Terminal prompt on stdin/stdout.
struct StdioPrompt {
    assume_yes: bool,
}

impl UserPrompt for StdioPrompt {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            info!("{} [assumed yes]", message);
            return true;
        }
        let mut stdout = io::stdout();
        if write!(stdout, "{} [y/N] ", message).and_then(|_| stdout.flush()).is_err() {
            return false;
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MAIN
// ════════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.resolve_config()?;

    info!("═══════════════════════════════════════════════════════════════");
    info!("                    ledgergov node                              ");
    info!("═══════════════════════════════════════════════════════════════");
    info!("RPC Endpoint: {}", config.rpc_url);
    info!("Context:      {}", config.context);
    info!("Store:        {}", config.store_path.display());
    info!("═══════════════════════════════════════════════════════════════");

    let networks = config.network_table().context("building network table")?;

    let ledger: Arc<dyn LedgerClient> = Arc::new(
        JsonRpcLedgerClient::new(
            config.rpc_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
        .context("creating JSON-RPC client")?,
    );

    let store = Arc::new(
        FileConfigStore::open(&config.store_path)
            .with_context(|| format!("opening {}", config.store_path.display()))?,
    );

    let accounts: Arc<dyn ReadModel> =
        Arc::new(LedgerReadModel::accounts(Arc::clone(&ledger), DEFAULT_POLL_INTERVAL));
    let blocks: Arc<dyn ReadModel> =
        Arc::new(LedgerReadModel::blocks(Arc::clone(&ledger), DEFAULT_POLL_INTERVAL));
    let gate = Arc::new(CollectionSyncGate::new(accounts, Arc::clone(&blocks)));

    let mut supervisor = ConnectionSupervisor::new(
        Arc::clone(&ledger),
        gate,
        store.clone(),
        Arc::new(StdioPrompt {
            assume_yes: cli.assume_yes,
        }),
        networks,
        SupervisorConfig::from(&config),
    );

    if let Some(company) = company_address(&config, store.as_ref())? {
        info!("Company:      {}", company);
        supervisor = supervisor.with_binding(Arc::new(RpcGovernanceContract::new(
            "Company",
            company,
            Arc::clone(&ledger),
        )));
    }

    let outcome = supervisor.connect().await.context("bootstrap failed")?;
    let network = match outcome {
        BootstrapOutcome::Ready { ready, network } => {
            if !ready {
                warn!("⚠️ Read models not confirmed ready, continuing");
            }
            network
        }
        BootstrapOutcome::Unsupported { raw_id } => {
            error!("Network {} is not supported", raw_id);
            return Ok(EXIT_UNSUPPORTED);
        }
        BootstrapOutcome::Reload { wiped } => {
            info!(wiped, "Reload required, exiting for restart");
            return Ok(EXIT_RELOAD);
        }
    };

    let health = LedgerHealth::check(ledger.as_ref(), &network).await;
    info!("Ledger:       {}", health);

    let watcher = BlockWatcher::new(blocks, Duration::from_millis(config.listener_delay_ms));
    watcher.start()?;

    info!("Client ready. Press Ctrl+C to shutdown.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    watcher.stop();

    info!("Stopped at block {}", watcher.last_height());
    Ok(0)
}

/// Company contract address from config, or the one persisted by an earlier
/// deployment.
fn company_address(
    config: &ClientConfig,
    store: &dyn NetworkConfigStore,
) -> anyhow::Result<Option<Address>> {
    let raw = match &config.company_address {
        Some(raw) => Some(raw.clone()),
        None => load_record(store)
            .with_context(|| format!("reading {}", KEY_COMPANY_ADDRESS))?
            .company_address,
    };
    raw.map(|r| r.parse::<Address>().with_context(|| format!("invalid company address '{}'", r)))
        .transpose()
}
