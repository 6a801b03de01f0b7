use crate::{args::BridgeHistoryConfig, Command};
use std::sync::Arc;

use alloy_network::EthereumWallet;
use alloy_provider::ProviderBuilder;
use alloy_rpc_client::RpcClient;
use alloy_transport::layers::RetryBackoffLayer;
use bridge_history_db::{Database, DatabaseConnectionProvider};
use bridge_history_migration::{Migrator, MigratorTrait};
use bridge_history_providers::{
    AlloyBlockHeightOracle, ClaimClient, DirectFinalizationClaimClient, FinalityOracle,
    HttpHistoryFetcher, L2FinalizedStatusOracle, MessengerClaimClient, RollupFinalityOracle,
    WithdrawalStatusOracle,
};
use bridge_history_reconciler::{
    BridgeHistory, BridgeHistoryService, ClaimVariant, HistoryPage, WatchedPage,
};
use bridge_history_watcher::ChainWatcher;

/// The engine run by the node.
pub type NodeEngine = BridgeHistory<HttpHistoryFetcher, Arc<Database>>;

/// Builds the collaborators of the engine from the configuration.
#[derive(Debug)]
pub struct BridgeHistoryNode {
    config: BridgeHistoryConfig,
}

impl BridgeHistoryNode {
    /// Returns a new [`BridgeHistoryNode`].
    pub const fn new(config: BridgeHistoryConfig) -> Self {
        Self { config }
    }

    /// Connects the providers and the database, spawns the chain watcher and returns the
    /// engine.
    pub async fn launch(&self) -> eyre::Result<Arc<NodeEngine>> {
        let config = &self.config;
        let network = config.network_args.network;
        let reconciler_config = config.reconciler_config();
        let variant = reconciler_config.claim_variant;

        // Instantiate the database
        let database_url = config.database_args.url();
        tracing::info!(target: "bridge_history::node", url = %database_url, "Connecting to database");
        let database = Database::new(&database_url).await?;
        Migrator::up(database.get_connection(), None).await?;
        let database = Arc::new(database);

        // Init the retry providers to both chains.
        let l1_args = &config.l1_provider_args;
        let l1_client = RpcClient::builder()
            .layer(RetryBackoffLayer::new(
                l1_args.max_retries,
                l1_args.initial_backoff,
                l1_args.compute_units_per_second,
            ))
            .http(l1_args.url.clone());
        let l1_provider = ProviderBuilder::new().connect_client(l1_client.clone());

        let l2_args = &config.l2_provider_args;
        let l2_client = RpcClient::builder()
            .layer(RetryBackoffLayer::new(
                l2_args.max_retries,
                l2_args.initial_backoff,
                l2_args.compute_units_per_second,
            ))
            .http(l2_args.url.clone());
        let l2_provider = ProviderBuilder::new().connect_client(l2_client);

        let heights = Arc::new(AlloyBlockHeightOracle::new(l1_provider.clone(), l2_provider.clone()));
        let finality: Option<Arc<dyn FinalityOracle>> = match variant {
            ClaimVariant::Batch => Some(Arc::new(RollupFinalityOracle::new(
                l1_provider,
                config.claim_args.rollup(network),
            ))),
            ClaimVariant::Direct => None,
        };
        let chain = ChainWatcher::spawn(heights, finality, config.watcher_config()).await;

        let fetcher = HttpHistoryFetcher::new(config.backend_args.url.as_str())?
            .with_chunk_size(config.backend_args.chunk_size);

        let mut engine = BridgeHistory::new(fetcher, database, chain, reconciler_config).await?;

        if variant == ClaimVariant::Direct {
            let oracle: Arc<dyn WithdrawalStatusOracle> =
                Arc::new(L2FinalizedStatusOracle::new(l2_provider));
            engine = engine.with_withdrawal_status_oracle(oracle);
        }

        if let Some(signer) = config.claim_args.signer(network.l1_chain_id())? {
            let sender = signer.address();
            let provider =
                ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_client(l1_client);
            let client: Arc<dyn ClaimClient> = match variant {
                ClaimVariant::Batch => Arc::new(MessengerClaimClient::new(
                    provider,
                    sender,
                    config.claim_args.messenger(network),
                )),
                ClaimVariant::Direct => {
                    let bridge = config
                        .claim_args
                        .bridge
                        .ok_or_else(|| eyre::eyre!("Direct finalization claims require the bridge address"))?;
                    Arc::new(DirectFinalizationClaimClient::new(provider, sender, bridge))
                }
            };
            tracing::info!(target: "bridge_history::node", %sender, %variant, "Claims enabled");
            engine = engine.with_claim_client(client);
        }

        tracing::info!(target: "bridge_history::node", %network, "Bridge history engine launched");
        Ok(Arc::new(engine))
    }

    /// Runs the command to completion.
    pub async fn run(&self, command: Command) -> eyre::Result<()> {
        let engine = self.launch().await?;

        match command {
            Command::List { wallet, page, page_size } => {
                let page = engine
                    .sync_page(wallet, page, page_size)
                    .await?
                    .into_page()
                    .unwrap_or_else(|| engine.list_page(wallet, page, page_size));
                println!("{}", serde_json::to_string_pretty(&page)?);
            }
            Command::Claim { hash } => {
                let result = engine.claim(hash).await?;
                tracing::info!(target: "bridge_history::node", %hash, ?result, "Claim settled");
            }
            Command::Watch { wallet, page_size } => {
                let watched = WatchedPage { wallet, page: 1, page_size };
                let handle = BridgeHistoryService::spawn(engine, Some(watched));
                let mut pages = handle.subscribe().await?;
                let shutdown = tokio::signal::ctrl_c();
                tokio::pin!(shutdown);

                loop {
                    tokio::select! {
                        changed = pages.changed() => {
                            if changed.is_err() {
                                break
                            }
                            let page = pages.borrow_and_update().clone();
                            if let Some(page) = page {
                                log_page(&page);
                                println!("{}", serde_json::to_string(&page)?);
                            }
                        }
                        _ = &mut shutdown => {
                            tracing::info!(target: "bridge_history::node", "Received shutdown signal");
                            break
                        }
                    }
                }
                handle.shutdown().await;
            }
        }

        Ok(())
    }
}

fn log_page(page: &HistoryPage) {
    for entry in &page.transactions {
        tracing::debug!(
            target: "bridge_history::node",
            hash = %entry.transaction.hash,
            direction = %entry.direction,
            position = %entry.position,
            status = ?entry.status,
            claim = ?entry.claim,
            "History entry"
        );
    }
    tracing::info!(target: "bridge_history::node", total = page.total, shown = page.transactions.len(), "History page refreshed");
}
