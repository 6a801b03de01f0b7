//! The handle to the bridge history service.

mod command;
pub use command::BridgeHistoryCommand;

mod metrics;
use metrics::HandleMetrics;

use crate::{ClaimError, ClaimResult, HistoryPage, ReconcileError, WatchedPage};

use alloy_primitives::{Address, TxHash};
use bridge_history_primitives::{BridgeTransaction, FailureReason, Network};
use tokio::sync::{mpsc, oneshot, watch};

/// The handle used to send commands to the bridge history service.
#[derive(Debug, Clone)]
pub struct BridgeHistoryHandle {
    /// The channel used to send commands to the service.
    to_service_tx: mpsc::Sender<BridgeHistoryCommand>,
    handle_metrics: HandleMetrics,
}

impl BridgeHistoryHandle {
    /// Create a new bridge history handle.
    pub fn new(to_service_tx: mpsc::Sender<BridgeHistoryCommand>) -> Self {
        Self { to_service_tx, handle_metrics: HandleMetrics::default() }
    }

    /// Sends a command to the service, returning false if the service stopped.
    pub async fn send_command(&self, command: BridgeHistoryCommand) -> bool {
        if let Err(err) = self.to_service_tx.send(command).await {
            self.handle_metrics.handle_send_command_failed.increment(1);
            tracing::error!(target: "bridge_history::handle", %err, "Failed to send command to bridge history service");
            return false
        }
        true
    }

    /// Runs a pass over the page of the wallet and returns it. The page is watched afterwards.
    pub async fn list_page(
        &self,
        wallet: Address,
        page: u64,
        page_size: u64,
    ) -> Result<HistoryPage, ReconcileError> {
        let (tx, rx) = oneshot::channel();
        let page = WatchedPage { wallet, page, page_size };
        self.send_command(BridgeHistoryCommand::ListPage { page, response: tx }).await;
        rx.await.map_err(|_| ReconcileError::ServiceStopped)?
    }

    /// Sets the page refreshed by the periodic passes.
    pub async fn watch(&self, wallet: Address, page: u64, page_size: u64) {
        self.send_command(BridgeHistoryCommand::Watch(WatchedPage { wallet, page, page_size }))
            .await;
    }

    /// Claims the withdrawal and waits for the outcome.
    pub async fn claim(&self, hash: TxHash) -> Result<ClaimResult, ClaimError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(BridgeHistoryCommand::Claim { hash, response: tx }).await;
        rx.await.map_err(|_| ClaimError::ServiceStopped)?
    }

    /// Records a transaction the wallet just submitted.
    pub async fn mark_submitted(
        &self,
        wallet: Address,
        transaction: BridgeTransaction,
    ) -> Result<(), ReconcileError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(BridgeHistoryCommand::MarkSubmitted {
            wallet,
            transaction: Box::new(transaction),
            response: tx,
        })
        .await;
        rx.await.map_err(|_| ReconcileError::ServiceStopped)?
    }

    /// Records a transaction of the wallet detected as failed.
    pub async fn mark_abnormal(
        &self,
        wallet: Address,
        transaction: BridgeTransaction,
        reason: FailureReason,
    ) -> Result<(), ReconcileError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(BridgeHistoryCommand::MarkAbnormal {
            wallet,
            transaction: Box::new(transaction),
            reason,
            response: tx,
        })
        .await;
        rx.await.map_err(|_| ReconcileError::ServiceStopped)?
    }

    /// Switches the active network.
    pub async fn switch_network(&self, network: Network) -> Result<(), ReconcileError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(BridgeHistoryCommand::SwitchNetwork { network, response: tx }).await;
        rx.await.map_err(|_| ReconcileError::ServiceStopped)?
    }

    /// Returns a receiver of the rendered pages of the watched page.
    pub async fn subscribe(
        &self,
    ) -> Result<watch::Receiver<Option<HistoryPage>>, oneshot::error::RecvError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(BridgeHistoryCommand::Subscribe(tx)).await;
        rx.await
    }

    /// Stops the service.
    pub async fn shutdown(&self) {
        self.send_command(BridgeHistoryCommand::Shutdown).await;
    }
}
