use crate::{ClaimError, ClaimResult, HistoryPage, ReconcileError, WatchedPage};

use alloy_primitives::{Address, TxHash};
use bridge_history_primitives::{BridgeTransaction, FailureReason, Network};
use tokio::sync::{oneshot, watch};

/// The commands that can be sent to the bridge history service.
#[derive(Debug)]
pub enum BridgeHistoryCommand {
    /// Runs a pass over the page and watches it.
    ListPage {
        /// The page to render.
        page: WatchedPage,
        /// The rendered page.
        response: oneshot::Sender<Result<HistoryPage, ReconcileError>>,
    },
    /// Sets the page refreshed by the periodic passes.
    Watch(WatchedPage),
    /// Claims a withdrawal.
    Claim {
        /// The origin hash of the withdrawal.
        hash: TxHash,
        /// The claim result.
        response: oneshot::Sender<Result<ClaimResult, ClaimError>>,
    },
    /// Records a transaction the wallet just submitted.
    MarkSubmitted {
        /// The wallet that submitted the transaction.
        wallet: Address,
        /// The submitted transaction.
        transaction: Box<BridgeTransaction>,
        /// Completion of the write.
        response: oneshot::Sender<Result<(), ReconcileError>>,
    },
    /// Records a transaction detected as failed.
    MarkAbnormal {
        /// The wallet of the transaction.
        wallet: Address,
        /// The failed transaction.
        transaction: Box<BridgeTransaction>,
        /// The failure reason.
        reason: FailureReason,
        /// Completion of the write.
        response: oneshot::Sender<Result<(), ReconcileError>>,
    },
    /// Switches the active network.
    SwitchNetwork {
        /// The network to switch to.
        network: Network,
        /// Completion of the switch.
        response: oneshot::Sender<Result<(), ReconcileError>>,
    },
    /// Returns a receiver of the rendered pages of the watched page.
    Subscribe(oneshot::Sender<watch::Receiver<Option<HistoryPage>>>),
    /// Stops the service.
    Shutdown,
}
