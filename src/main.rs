//! Multisig custody runner.
//!
//! ```text
//! multisig-custody --config custody.toml run [--wallet <addr>] [--resume-index <n>]
//! multisig-custody --config custody.toml status --wallet <addr>
//! ```
//!
//! Owner keys come from `CUSTODY_OWNER_KEY_1..N`; the RPC endpoint may be
//! overridden with `CUSTODY_RPC_URL`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::primitives::utils::format_ether;
use alloy::primitives::Address;
use clap::{Parser, Subcommand};

use multisig_custody::blockchain::BlockchainClient;
use multisig_custody::config::{self, CustodyConfig};
use multisig_custody::contract::{ContractArtifact, WalletContract};
use multisig_custody::flow::{CustodyFlow, FlowPlan, WalletSource};
use multisig_custody::lifecycle::{spawn_ctrl_c_handler, Shutdown};
use multisig_custody::observability::{init_logging, init_metrics};
use multisig_custody::submission::{SubmissionDriver, SubmissionPolicy};

#[derive(Parser)]
#[command(name = "multisig-custody")]
#[command(about = "Deploy and drive a multi-signature custody wallet", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when absent.
    #[arg(short, long, default_value = "custody.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy (or attach), fund, propose, confirm and execute
    Run {
        /// Attach to this wallet instead of deploying
        #[arg(long)]
        wallet: Option<Address>,

        /// Continue an existing proposal instead of creating one
        #[arg(long)]
        resume_index: Option<u64>,
    },
    /// Show threshold, transaction count and balance of a wallet
    Status {
        #[arg(long)]
        wallet: Address,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli.config)?;

    init_logging(&config.observability);
    tracing::info!("multisig-custody v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(metrics_address = %addr, error = %e, "Failed to parse metrics address"),
        }
    }

    let shutdown = Shutdown::new();
    spawn_ctrl_c_handler(shutdown.clone());

    let client = Arc::new(BlockchainClient::new(config.network.clone()).await?);
    let policy = SubmissionPolicy::from_config(&config.submission, &config.network);
    let driver = Arc::new(SubmissionDriver::new(client, policy).with_shutdown(shutdown));

    match cli.command {
        Commands::Run { wallet, resume_index } => {
            let keys = config::load_owner_keys(&config.wallet)?;
            config::validate_flow_owners(&config.flow, keys.len()).map_err(config::ConfigError::Validation)?;
            let plan = FlowPlan::from_config(&config.flow)?;
            let flow = CustodyFlow::new(driver, keys, config.wallet.threshold)?;

            let wallet = wallet.or(config.wallet.contract_address);
            let report = match (wallet, resume_index) {
                (Some(wallet), Some(index)) => flow.resume(wallet, index, &plan).await?,
                (Some(wallet), None) => flow.run(WalletSource::Attach(wallet), &plan).await?,
                (None, Some(_)) => {
                    return Err("--resume-index needs --wallet or wallet.contract_address".into());
                }
                (None, None) => {
                    let artifact = ContractArtifact::load(Path::new(&config.wallet.artifact_path))?;
                    flow.run(WalletSource::Deploy(artifact), &plan).await?
                }
            };

            println!("wallet:        {}", report.wallet);
            println!("transaction:   {}", report.index);
            println!("confirmations: {}", report.confirmations);
            println!("executed:      {}", report.executed);
            println!("wallet balance:    {} ETH", format_ether(report.wallet_balance));
            println!("recipient balance: {} ETH", format_ether(report.recipient_balance));
            for (step, hash) in &report.operations {
                println!("{:<8} {}", step, hash);
            }
        }
        Commands::Status { wallet } => {
            let contract = WalletContract::at(driver, wallet);
            let status = contract.status().await?;
            println!("wallet:        {}", status.address);
            println!("threshold:     {}", status.required_confirmations);
            println!("transactions:  {}", status.transaction_count);
            println!("balance:       {} ETH", format_ether(status.balance));
        }
    }

    tracing::info!("Done");
    Ok(())
}

/// The file is optional; without it every setting takes its default.
fn load(path: &Path) -> Result<CustodyConfig, config::ConfigError> {
    if path.exists() {
        return config::load_config(path);
    }
    let mut config = CustodyConfig::default();
    config::loader::apply_env_overrides(&mut config);
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    Ok(config)
}
