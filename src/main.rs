use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use evm_loadgen::{
    Account, ArtifactCompiler, Compiler, InMemoryChain, JobRegistry, JobSettings, LoadConfig,
    LoadController, LoadGenServer, SolcCompiler,
    common::{DEV_CHAIN_ID, ONE_ETHER},
    transaction::FeePolicy,
};

const DEFAULT_HOST: &str = "http://127.0.0.1:8545";
const DEFAULT_RPC_ADDR: &str = "127.0.0.1:9545";
const DRY_RUN_GENESIS_ETHER: u64 = 1_000_000_000;

#[derive(Debug, Parser)]
#[command(name = "evm-loadgen", version, about = "Synthetic transaction load for EVM endpoints")]
struct Cli {
    /// JSON load config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Execution-layer JSON-RPC endpoint
    #[arg(long)]
    host: Option<String>,

    /// Users started per second
    #[arg(long)]
    spawn_rate: Option<u32>,

    /// Job class to run, replaces the classes of the config file
    #[arg(long = "job")]
    jobs: Vec<String>,

    /// Users per job class given with --job
    #[arg(long, default_value_t = 1)]
    users: usize,

    /// Address of the control RPC server
    #[arg(long, default_value = DEFAULT_RPC_ADDR)]
    rpc_addr: SocketAddr,

    /// Directory holding the Solidity sources
    #[arg(long, default_value = "contracts")]
    contracts_dir: PathBuf,

    /// solc binary used to compile contracts
    #[arg(long, default_value = "solc")]
    solc: PathBuf,

    /// Use precompiled <Name>.json artifacts from this directory instead of solc
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Ether sent to every new user account
    #[arg(long, default_value_t = 1000)]
    funding_ether: u64,

    /// Never query the node for gas prices
    #[arg(long)]
    fixed_fees: bool,

    /// Run against an in-memory chain instead of `host`
    #[arg(long)]
    dry_run: bool,

    /// Start the load immediately instead of waiting for loadgen_start
    #[arg(long)]
    autostart: bool,
}

impl Cli {
    fn load_config(&self) -> Result<LoadConfig> {
        let mut config = match &self.config {
            Some(path) => LoadConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => LoadConfig::new(DEFAULT_HOST, 1),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(rate) = self.spawn_rate {
            config.spawn_rate = rate;
        }
        if !self.jobs.is_empty() {
            config.job_classes.clear();
            for job in &self.jobs {
                config = config.with_job(job.clone(), self.users);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn settings(&self) -> JobSettings {
        JobSettings {
            funding_amount: U256::from(self.funding_ether) * U256::from(ONE_ETHER),
            fee_policy: if self.fixed_fees {
                FeePolicy::Fixed
            } else {
                FeePolicy::Live
            },
            contracts_dir: self.contracts_dir.clone(),
            ..Default::default()
        }
    }

    fn compiler(&self) -> Arc<dyn Compiler> {
        match &self.artifacts {
            Some(dir) => Arc::new(ArtifactCompiler::new(dir)),
            None => Arc::new(SolcCompiler::new(&self.solc, &self.contracts_dir)),
        }
    }
}

fn print_banner() {
    println!(
        "
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║                    ⚡ EVM LOADGEN ⚡                       ║
║                                                           ║
║           Synthetic load for EVM JSON-RPC nodes           ║
║                    Built with Rust                        ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    print_banner();

    let config = cli.load_config()?;
    let settings = cli.settings();

    // the in-memory chain only knows the genesis account, funded generously
    let dry_run_chain = if cli.dry_run {
        let chain = InMemoryChain::new(DEV_CHAIN_ID);
        let genesis = Account::from_private_key(&settings.genesis_key)?;
        chain.fund(genesis.address(), U256::from(DRY_RUN_GENESIS_ETHER) * U256::from(ONE_ETHER));
        info!(genesis = %genesis.address(), "dry run, using in-memory chain");
        Some(Arc::new(chain))
    } else {
        None
    };

    let mut controller =
        LoadController::new(config, JobRegistry::with_builtins(), settings, cli.compiler());
    if let Some(chain) = dry_run_chain {
        controller = controller.with_client(chain);
    }

    let server = LoadGenServer::new(Arc::new(controller), cli.rpc_addr);
    server.run(cli.autostart).await
}
