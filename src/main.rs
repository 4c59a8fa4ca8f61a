use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mav_distributor::allocation::{compute_snapshot, identify_diamond_paws, SnapshotParams};
use mav_distributor::config::{self, Config};
use mav_distributor::events::fetch_transfers;
use mav_distributor::owners::collect_owners;
use mav_distributor::tiers::{compute_rewards, rewards_by_owner, rewards_json, token_histories, TierParams};
use mav_distributor::{
    Address, BatchSubmitter, CsvProcessor, ExplorerClient, FaucetChain, FaucetReader,
    ProviderConfig, ProviderManager, SubmitterConfig, U256,
};

#[derive(Parser, Debug)]
#[command(name = "mav-distributor")]
#[command(about = "MAV reward snapshots and batched claimable registration", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.yaml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register CSV allocations as claimable on the faucet
    Distribute {
        /// Input CSV (overrides distribution.csv_path)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Initial batch size (overrides distribution.initial_batch_size)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Skip the entries before this index
        #[arg(long, default_value_t = 0)]
        start_index: usize,

        /// Write the submission report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Compute allocations from explorer NFT transfer history
    Snapshot {
        /// Output CSV (overrides snapshot.output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute tiered rewards from on-chain Transfer logs
    Tiers {
        /// Output JSON (overrides tiers.output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write rewards summed per current owner as CSV
        #[arg(long)]
        owners_csv: Option<PathBuf>,
    },

    /// List the current holders of a collection via totalSupply/ownerOf
    Owners {
        /// Output CSV (overrides owners.output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a wallet's claimable amount and the faucet token balance
    Check {
        /// Wallet to query
        #[arg(short, long)]
        wallet: Option<Address>,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from_file(&cli.config)
        .await
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Command::Distribute {
            input,
            batch_size,
            start_index,
            report,
        } => distribute(&config, input, batch_size, start_index, report).await,
        Command::Snapshot { output } => snapshot(&config, output).await,
        Command::Tiers { output, owners_csv } => tiers(&config, output, owners_csv).await,
        Command::Owners { output } => owners(&config, output).await,
        Command::Check { wallet } => check(&config, wallet).await,
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

async fn distribute(
    config: &Config,
    input: Option<PathBuf>,
    batch_size: Option<usize>,
    start_index: usize,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let chain_config = config.chain()?;
    let faucet = config.faucet()?;
    let private_key = config::private_key_from_env()?;

    let manager = ProviderManager::new(ProviderConfig::from(chain_config))?
        .with_signer(&private_key)?;
    let sender = manager
        .signer_address()
        .context("signer not configured")?;
    info!("Deployer address: {}", sender);

    let block = manager.check_connection().await?;
    info!("Connected to chain {} at block {}", manager.chain_id(), block);

    let csv_path = input.unwrap_or_else(|| PathBuf::from(&config.distribution.csv_path));
    let entries = CsvProcessor::read_claims(&csv_path)?;
    let total = CsvProcessor::total_amount(&entries);
    info!("Loaded {} entries totalling {} from {}", entries.len(), total, csv_path.display());

    let reader = FaucetReader::new(manager.provider(), faucet.address, faucet.token_address);
    if let Some(missing) = reader.balance_shortfall(total).await {
        warn!("Faucet token balance is {} short of the distributed total {}", missing, total);
    }

    let chain = FaucetChain::new(
        manager.provider(),
        faucet.address,
        sender,
        manager.chain_id(),
        Duration::from_millis(config.distribution.receipt_poll_interval_ms),
    );
    let submitter = BatchSubmitter::new(chain, SubmitterConfig::from(&config.distribution));

    let initial_batch_size = batch_size.unwrap_or(config.distribution.initial_batch_size);
    let report = submitter
        .submit_from(&entries, initial_batch_size, start_index)
        .await?;

    info!(
        "Distribution complete: {} entries in {} batches, {} gas used, final batch size {}",
        report.entries_submitted(),
        report.total_batches,
        report.total_gas_used(),
        report.final_batch_size
    );

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}

async fn snapshot(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let snapshot = config.snapshot()?;
    let client = ExplorerClient::new(config.explorer()?.clone())?;

    info!("Fetching MVX NFT transactions...");
    let mvx_txs = client.fetch_nft_transfers(snapshot.mavericks_contract).await?;
    info!("Total MVX transactions fetched: {}", mvx_txs.len());

    info!("Fetching Panda NFT transactions...");
    let panda_txs = client.fetch_nft_transfers(snapshot.pandas_contract).await?;
    info!("Total Panda transactions fetched: {}", panda_txs.len());

    let mvx_paws = identify_diamond_paws(&mvx_txs);
    let panda_paws = identify_diamond_paws(&panda_txs);
    info!("MVX DiamondPaws: {}", mvx_paws.len());
    info!("Panda DiamondPaws: {}", panda_paws.len());

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let allocations = compute_snapshot(&mvx_paws, &panda_paws, now, &SnapshotParams::from(snapshot));

    let path = output.unwrap_or_else(|| PathBuf::from(&snapshot.output_path));
    CsvProcessor::write_allocations(&path, &allocations)?;
    info!("Distribution CSV generated: {} ({} wallets)", path.display(), allocations.len());

    Ok(())
}

async fn tiers(config: &Config, output: Option<PathBuf>, owners_csv: Option<PathBuf>) -> Result<()> {
    let tiers = config.tiers()?;

    let manager = ProviderManager::new(ProviderConfig {
        rpc_url: tiers.rpc_url.clone(),
        chain_id: tiers.chain_id,
        timeout_seconds: tiers.request_timeout_secs,
    })?;
    let current_block = manager.check_connection().await?;

    let transfers = fetch_transfers(
        &manager.provider(),
        tiers.contract,
        tiers.from_block,
        current_block,
        tiers.log_chunk_size,
    )
    .await?;
    info!("Fetched {} Transfer events", transfers.len());

    let histories = token_histories(&transfers);
    let rewards = compute_rewards(&histories, current_block, &TierParams::from(tiers));
    if rewards.scaled {
        info!("Non-diamond rewards scaled down to fit the remaining supply");
    }

    let path = output.unwrap_or_else(|| PathBuf::from(&tiers.output_path));
    let json = serde_json::to_string_pretty(&rewards_json(&rewards))?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write rewards to {}", path.display()))?;
    info!("Diamond-paws: {}, rewards saved to {}", rewards.diamond_count, path.display());

    if let Some(csv_path) = owners_csv {
        let owners = rewards_by_owner(&histories, &rewards);
        CsvProcessor::write_allocations(&csv_path, &owners)?;
        info!("Owner allocations written to {} ({} owners)", csv_path.display(), owners.len());
    }

    Ok(())
}

async fn owners(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let owners = config.owners()?;

    let manager = ProviderManager::new(ProviderConfig {
        rpc_url: owners.rpc_url.clone(),
        chain_id: owners.chain_id,
        timeout_seconds: owners.request_timeout_secs,
    })?;

    let snapshot = collect_owners(&manager.provider(), owners.contract).await?;

    let path = output.unwrap_or_else(|| PathBuf::from(&owners.output_path));
    CsvProcessor::write_wallets(&path, &snapshot.owners)?;
    info!("CSV file created: {} ({} wallets)", path.display(), snapshot.owners.len());

    Ok(())
}

async fn check(config: &Config, wallet: Option<Address>) -> Result<()> {
    let faucet = config.faucet()?;
    let manager = ProviderManager::new(ProviderConfig::from(config.chain()?))?;
    let reader = FaucetReader::new(manager.provider(), faucet.address, faucet.token_address);

    let status = reader.status(wallet).await?;

    if let (Some(wallet), Some(claimable)) = (wallet, status.claimable) {
        info!("Claimable amount (raw) for {}: {}", wallet, claimable);
    }
    match (status.token_balance, status.formatted_balance()) {
        (Some(raw), Some(formatted)) => {
            info!("Faucet token balance: {} (raw {})", formatted, raw)
        }
        (Some(raw), None) => info!("Faucet token balance (raw): {}", raw),
        _ => info!("faucet.token_address not configured, skipping balance"),
    }
    if status.token_balance == Some(U256::ZERO) {
        warn!("Faucet holds no tokens, claims will fail");
    }

    Ok(())
}
