//! The service driving the engine: periodic passes over the watched page, withdrawal status
//! refreshes and the commands of [`BridgeHistoryHandle`]s.

use crate::{
    engine::{BridgeHistory, SyncOutcome},
    handle::{BridgeHistoryCommand, BridgeHistoryHandle},
    ClaimVariant, HistoryPage,
};

use alloy_primitives::Address;
use bridge_history_providers::HistoryFetcher;
use bridge_history_store::SnapshotStorage;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    time::{interval, MissedTickBehavior},
};

/// The capacity of the command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 100;

/// A page of a wallet's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedPage {
    /// The wallet.
    pub wallet: Address,
    /// The 1-based page index.
    pub page: u64,
    /// The page size.
    pub page_size: u64,
}

/// Drives a [`BridgeHistory`].
#[derive(Debug)]
pub struct BridgeHistoryService<F, S> {
    engine: Arc<BridgeHistory<F, S>>,
    handle_rx: mpsc::Receiver<BridgeHistoryCommand>,
    pages: watch::Sender<Option<HistoryPage>>,
    watched: Option<WatchedPage>,
}

impl<F, S> BridgeHistoryService<F, S>
where
    F: HistoryFetcher + 'static,
    S: SnapshotStorage + 'static,
{
    /// Spawns the service on the current runtime, returning its handle.
    pub fn spawn(
        engine: Arc<BridgeHistory<F, S>>,
        watched: Option<WatchedPage>,
    ) -> BridgeHistoryHandle {
        let (handle_tx, handle_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (pages, _) = watch::channel(None);
        let service = Self { engine, handle_rx, pages, watched };
        tokio::spawn(service.run());
        BridgeHistoryHandle::new(handle_tx)
    }

    async fn run(mut self) {
        let config = self.engine.config().clone();
        let mut history = interval(config.history_interval);
        history.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut status = interval(config.withdrawal_status_interval);
        status.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let refresh_status =
            config.claim_variant == ClaimVariant::Direct && self.engine.status_oracle.is_some();
        let mut heights = self.engine.chain.heights.clone();

        tracing::info!(target: "bridge_history::service", network = %self.engine.network(), "bridge history service started");

        loop {
            tokio::select! {
                command = self.handle_rx.recv() => match command {
                    Some(BridgeHistoryCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                _ = history.tick() => self.sync_watched().await,
                _ = status.tick(), if refresh_status => {
                    if self.engine.refresh_withdrawal_status().await > 0 {
                        self.render_watched();
                    }
                }
                Ok(()) = heights.changed() => self.render_watched(),
            }
        }

        tracing::info!(target: "bridge_history::service", "bridge history service stopped");
    }

    async fn handle_command(&mut self, command: BridgeHistoryCommand) {
        match command {
            BridgeHistoryCommand::ListPage { page, response } => {
                self.watched = Some(page);
                let result = self
                    .engine
                    .sync_page(page.wallet, page.page, page.page_size)
                    .await
                    .map(|outcome| match outcome {
                        SyncOutcome::Completed(rendered) => rendered,
                        SyncOutcome::Skipped => {
                            self.engine.list_page(page.wallet, page.page, page.page_size)
                        }
                    });
                if let Ok(rendered) = &result {
                    self.pages.send_replace(Some(rendered.clone()));
                }
                let _ = response.send(result);
            }
            BridgeHistoryCommand::Watch(page) => {
                self.watched = Some(page);
                self.sync_watched().await;
            }
            BridgeHistoryCommand::Claim { hash, response } => {
                let engine = self.engine.clone();
                tokio::spawn(async move {
                    let _ = response.send(engine.claim(hash).await);
                });
            }
            BridgeHistoryCommand::MarkSubmitted { wallet, transaction, response } => {
                let result = self.engine.mark_submitted(wallet, *transaction).await;
                self.render_watched();
                let _ = response.send(result);
            }
            BridgeHistoryCommand::MarkAbnormal { wallet, transaction, reason, response } => {
                let result = self.engine.mark_abnormal(wallet, *transaction, reason).await;
                self.render_watched();
                let _ = response.send(result);
            }
            BridgeHistoryCommand::SwitchNetwork { network, response } => {
                let result = self.engine.switch_network(network).await;
                self.render_watched();
                let _ = response.send(result);
            }
            BridgeHistoryCommand::Subscribe(response) => {
                let _ = response.send(self.pages.subscribe());
            }
            BridgeHistoryCommand::Shutdown => {}
        }
    }

    /// Runs a pass over the watched page and publishes it.
    async fn sync_watched(&mut self) {
        let Some(page) = self.watched else { return };
        match self.engine.sync_page(page.wallet, page.page, page.page_size).await {
            Ok(SyncOutcome::Completed(rendered)) => {
                self.pages.send_replace(Some(rendered));
            }
            Ok(SyncOutcome::Skipped) => {}
            Err(err) => {
                tracing::warn!(target: "bridge_history::service", %err, "history pass failed");
            }
        }
    }

    /// Renders the watched page from the cached records and publishes it.
    fn render_watched(&self) {
        let Some(page) = self.watched else { return };
        let rendered = self.engine.list_page(page.wallet, page.page, page.page_size);
        self.pages.send_replace(Some(rendered));
    }
}
