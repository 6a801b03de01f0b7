use crate::constants;
use std::{fs, path::PathBuf, time::Duration};

use alloy_primitives::{hex, Address, TxHash};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use bridge_history_l1::L1Contracts;
use bridge_history_primitives::{EtaConfig, Network};
use bridge_history_providers::DEFAULT_CHUNK_SIZE;
use bridge_history_reconciler::{ClaimVariant, ReconcilerConfig};
use bridge_history_watcher::WatcherConfig;

/// The command line interface of the bridge history tracker.
#[derive(Debug, clap::Parser)]
#[command(name = "bridge-history", about = "Tracks the bridge transfers of a wallet")]
pub struct Cli {
    /// The tracker configuration.
    #[command(flatten)]
    pub config: BridgeHistoryConfig,
    /// The command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// The commands of the bridge history tracker.
#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Polls the history of the wallet and prints the first page on every change.
    Watch {
        /// The wallet to watch.
        #[arg(long)]
        wallet: Address,
        /// The page size.
        #[arg(long = "page-size", default_value_t = constants::DEFAULT_PAGE_SIZE)]
        page_size: u64,
    },
    /// Runs one pass over a page of the wallet's history and prints it as JSON.
    List {
        /// The wallet to list.
        #[arg(long)]
        wallet: Address,
        /// The 1-based page index.
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// The page size.
        #[arg(long = "page-size", default_value_t = constants::DEFAULT_PAGE_SIZE)]
        page_size: u64,
    },
    /// Claims a withdrawal and waits for the outcome.
    Claim {
        /// The origin hash of the withdrawal.
        #[arg(long)]
        hash: TxHash,
    },
}

/// The configuration of the bridge history tracker.
#[derive(Debug, Clone, clap::Args)]
pub struct BridgeHistoryConfig {
    /// The network arguments.
    #[command(flatten)]
    pub network_args: NetworkArgs,
    /// The L1 provider arguments.
    #[command(flatten)]
    pub l1_provider_args: L1ProviderArgs,
    /// The L2 provider arguments.
    #[command(flatten)]
    pub l2_provider_args: L2ProviderArgs,
    /// The history backend arguments.
    #[command(flatten)]
    pub backend_args: BackendArgs,
    /// The database arguments.
    #[command(flatten)]
    pub database_args: DatabaseArgs,
    /// The polling arguments.
    #[command(flatten)]
    pub poll_args: PollArgs,
    /// The claim arguments.
    #[command(flatten)]
    pub claim_args: ClaimArgs,
}

impl BridgeHistoryConfig {
    /// Validates the configuration for the provided command.
    pub fn validate(&self, command: &Command) -> Result<(), String> {
        if matches!(command, Command::Claim { .. }) && self.claim_args.key_file.is_none() {
            return Err("The claim command requires a signer key file".to_string());
        }

        if self.claim_args.variant == ClaimVariant::Direct &&
            self.claim_args.key_file.is_some() &&
            self.claim_args.bridge.is_none()
        {
            return Err("Direct finalization claims require the bridge address".to_string());
        }

        if self.backend_args.chunk_size == 0 {
            return Err("The backend chunk size must be positive".to_string());
        }

        let PollArgs { heights_ms, finality_ms, history_ms } = self.poll_args;
        if heights_ms == 0 || finality_ms == 0 || history_ms == 0 {
            return Err("Poll intervals must be positive".to_string());
        }

        if let Command::Watch { page_size, .. } | Command::List { page_size, .. } = command {
            if *page_size == 0 {
                return Err("The page size must be positive".to_string());
            }
        }

        Ok(())
    }

    /// Returns the configuration of the reconciler.
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        let interval = Duration::from_millis(self.poll_args.history_ms);
        ReconcilerConfig {
            network: self.network_args.network,
            eta: EtaConfig::default(),
            claim_variant: self.claim_args.variant,
            history_interval: interval,
            withdrawal_status_interval: interval,
            ..Default::default()
        }
    }

    /// Returns the configuration of the chain watcher.
    pub const fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            heights_interval: Duration::from_millis(self.poll_args.heights_ms),
            finality_interval: Duration::from_millis(self.poll_args.finality_ms),
        }
    }
}

/// The network arguments.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct NetworkArgs {
    /// The network to track.
    #[arg(long = "network", value_name = "NETWORK", default_value = "mainnet")]
    pub network: Network,
}

/// The arguments for the L1 provider.
#[derive(Debug, Clone, clap::Args)]
pub struct L1ProviderArgs {
    /// The URL for the L1 RPC.
    #[arg(long = "l1.url", id = "l1_url", value_name = "L1_URL")]
    pub url: reqwest::Url,
    /// The compute units per second for the provider.
    #[arg(long = "l1.cups", id = "l1_compute_units_per_second", value_name = "L1_COMPUTE_UNITS_PER_SECOND", default_value_t = constants::PROVIDER_COMPUTE_UNITS_PER_SECOND)]
    pub compute_units_per_second: u64,
    /// The max amount of retries for the provider.
    #[arg(long = "l1.max-retries", id = "l1_max_retries", value_name = "L1_MAX_RETRIES", default_value_t = constants::PROVIDER_MAX_RETRIES)]
    pub max_retries: u32,
    /// The initial backoff for the provider.
    #[arg(long = "l1.initial-backoff", id = "l1_initial_backoff", value_name = "L1_INITIAL_BACKOFF", default_value_t = constants::PROVIDER_INITIAL_BACKOFF)]
    pub initial_backoff: u64,
}

/// The arguments for the L2 provider.
#[derive(Debug, Clone, clap::Args)]
pub struct L2ProviderArgs {
    /// The URL for the L2 RPC.
    #[arg(long = "l2.url", id = "l2_url", value_name = "L2_URL")]
    pub url: reqwest::Url,
    /// The compute units per second for the provider.
    #[arg(long = "l2.cups", id = "l2_compute_units_per_second", value_name = "L2_COMPUTE_UNITS_PER_SECOND", default_value_t = constants::PROVIDER_COMPUTE_UNITS_PER_SECOND)]
    pub compute_units_per_second: u64,
    /// The max amount of retries for the provider.
    #[arg(long = "l2.max-retries", id = "l2_max_retries", value_name = "L2_MAX_RETRIES", default_value_t = constants::PROVIDER_MAX_RETRIES)]
    pub max_retries: u32,
    /// The initial backoff for the provider.
    #[arg(long = "l2.initial-backoff", id = "l2_initial_backoff", value_name = "L2_INITIAL_BACKOFF", default_value_t = constants::PROVIDER_INITIAL_BACKOFF)]
    pub initial_backoff: u64,
}

/// The arguments for the history backend.
#[derive(Debug, Clone, clap::Args)]
pub struct BackendArgs {
    /// The base URL of the history backend.
    #[arg(long = "backend.url", id = "backend_url", value_name = "BACKEND_URL")]
    pub url: reqwest::Url,
    /// The max amount of hashes per by-hash request.
    #[arg(long = "backend.chunk-size", id = "backend_chunk_size", value_name = "BACKEND_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

/// The database arguments.
#[derive(Debug, Clone, clap::Args)]
pub struct DatabaseArgs {
    /// The path of the database file.
    #[arg(long = "db.path", id = "db_path", value_name = "DB_PATH", default_value = constants::DEFAULT_DATABASE_PATH)]
    pub path: PathBuf,
}

impl DatabaseArgs {
    /// Returns the connection URL of the database, creating the file if missing.
    pub fn url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path.to_string_lossy())
    }
}

/// The polling arguments.
#[derive(Debug, Clone, Copy, clap::Args)]
pub struct PollArgs {
    /// The interval between block height refreshes in milliseconds.
    #[arg(long = "poll.heights-ms", id = "poll_heights_ms", value_name = "POLL_HEIGHTS_MS", default_value_t = 3_000)]
    pub heights_ms: u64,
    /// The interval between finality refreshes in milliseconds.
    #[arg(long = "poll.finality-ms", id = "poll_finality_ms", value_name = "POLL_FINALITY_MS", default_value_t = 1_000)]
    pub finality_ms: u64,
    /// The interval between history passes in milliseconds.
    #[arg(long = "poll.history-ms", id = "poll_history_ms", value_name = "POLL_HISTORY_MS", default_value_t = 5_000)]
    pub history_ms: u64,
}

/// The claim arguments.
#[derive(Debug, Clone, clap::Args)]
pub struct ClaimArgs {
    /// The claim flow of the bridge.
    #[arg(long = "claim.variant", id = "claim_variant", value_name = "CLAIM_VARIANT", default_value_t = ClaimVariant::Batch)]
    pub variant: ClaimVariant,
    /// Path to the hex-encoded private key file used to sign claims.
    #[arg(long = "claim.key-file", id = "claim_key_file", value_name = "CLAIM_KEY_FILE")]
    pub key_file: Option<PathBuf>,
    /// The L1 messenger relaying batch-proof withdrawals. Defaults to the network's messenger.
    #[arg(long = "claim.messenger", id = "claim_messenger", value_name = "CLAIM_MESSENGER")]
    pub messenger: Option<Address>,
    /// The rollup contract exposing finalized batches. Defaults to the network's rollup.
    #[arg(long = "claim.rollup", id = "claim_rollup", value_name = "CLAIM_ROLLUP")]
    pub rollup: Option<Address>,
    /// The bridge finalizing withdrawals directly.
    #[arg(long = "claim.bridge", id = "claim_bridge", value_name = "CLAIM_BRIDGE")]
    pub bridge: Option<Address>,
}

impl ClaimArgs {
    /// Loads the claim signer from the key file, if one is configured.
    pub fn signer(&self, chain_id: u64) -> eyre::Result<Option<PrivateKeySigner>> {
        let Some(key_file_path) = &self.key_file else { return Ok(None) };

        let key_content = fs::read_to_string(key_file_path)
            .map_err(|e| {
                eyre::eyre!("Failed to read claim key file {}: {}", key_file_path.display(), e)
            })?
            .trim()
            .to_string();

        let hex_str = key_content.strip_prefix("0x").unwrap_or(&key_content);
        let key_bytes = hex::decode(hex_str).map_err(|e| {
            eyre::eyre!(
                "Failed to decode hex private key from file {}: {}",
                key_file_path.display(),
                e
            )
        })?;

        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| eyre::eyre!("Failed to create signer from key file: {}", e))?
            .with_chain_id(Some(chain_id));

        tracing::info!(target: "bridge_history::node", address = %signer.address(), chain_id, "Created claim signer");
        Ok(Some(signer))
    }

    /// The messenger address on the provided network.
    pub fn messenger(&self, network: Network) -> Address {
        self.messenger.unwrap_or(L1Contracts::for_network(network).messenger)
    }

    /// The rollup address on the provided network.
    pub fn rollup(&self, network: Network) -> Address {
        self.rollup.unwrap_or(L1Contracts::for_network(network).rollup)
    }
}
