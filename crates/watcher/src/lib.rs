//! Chain watcher for the bridge history tracker.
//!
//! The [`ChainWatcher`] polls the block height and finality oracles on independent intervals
//! and publishes the latest observations over [`tokio::sync::watch`] channels.

mod metrics;
pub use metrics::WatcherMetrics;

use bridge_history_primitives::ChainHeights;
use bridge_history_providers::{BlockHeightOracle, FinalityOracle};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};

/// The default interval between block height refreshes.
pub const DEFAULT_HEIGHTS_INTERVAL: Duration = Duration::from_secs(3);

/// The default interval between finalized batch refreshes.
pub const DEFAULT_FINALITY_INTERVAL: Duration = Duration::from_secs(1);

/// The configuration of the [`ChainWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// The interval between block height refreshes.
    pub heights_interval: Duration,
    /// The interval between finalized batch refreshes.
    pub finality_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { heights_interval: DEFAULT_HEIGHTS_INTERVAL, finality_interval: DEFAULT_FINALITY_INTERVAL }
    }
}

/// The latest chain observations published by a [`ChainWatcher`].
#[derive(Debug, Clone)]
pub struct ChainView {
    /// The latest block heights, `None` until the first successful refresh.
    pub heights: watch::Receiver<Option<ChainHeights>>,
    /// The last finalized batch index, `None` until the first successful refresh or if no
    /// finality oracle is watched.
    pub finalized_batch: watch::Receiver<Option<u64>>,
}

impl ChainView {
    /// Returns the latest block heights.
    pub fn heights(&self) -> Option<ChainHeights> {
        *self.heights.borrow()
    }

    /// Returns the last finalized batch index.
    pub fn last_finalized_batch(&self) -> Option<u64> {
        *self.finalized_batch.borrow()
    }
}

/// Polls the chain oracles and publishes their observations.
pub struct ChainWatcher {
    /// The block height oracle.
    heights_oracle: Arc<dyn BlockHeightOracle>,
    /// The finality oracle, if claims are gated on batch finality.
    finality_oracle: Option<Arc<dyn FinalityOracle>>,
    /// The watcher configuration.
    config: WatcherConfig,
    /// The sender of the block heights.
    heights: watch::Sender<Option<ChainHeights>>,
    /// The sender of the last finalized batch index.
    finalized_batch: watch::Sender<Option<u64>>,
    /// The watcher metrics.
    metrics: WatcherMetrics,
}

impl std::fmt::Debug for ChainWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainWatcher")
            .field("config", &self.config)
            .field("watches_finality", &self.finality_oracle.is_some())
            .finish_non_exhaustive()
    }
}

impl ChainWatcher {
    /// Returns a new [`ChainWatcher`] along with the [`ChainView`] it publishes to.
    pub fn new(
        heights_oracle: Arc<dyn BlockHeightOracle>,
        finality_oracle: Option<Arc<dyn FinalityOracle>>,
        config: WatcherConfig,
    ) -> (Self, ChainView) {
        let (heights, heights_rx) = watch::channel(None);
        let (finalized_batch, finalized_batch_rx) = watch::channel(None);
        let watcher = Self {
            heights_oracle,
            finality_oracle,
            config,
            heights,
            finalized_batch,
            metrics: WatcherMetrics::default(),
        };
        (watcher, ChainView { heights: heights_rx, finalized_batch: finalized_batch_rx })
    }

    /// Spawns a new [`ChainWatcher`], returning the [`ChainView`] it publishes to. The watcher
    /// stops once every block heights receiver is dropped.
    pub async fn spawn(
        heights_oracle: Arc<dyn BlockHeightOracle>,
        finality_oracle: Option<Arc<dyn FinalityOracle>>,
        config: WatcherConfig,
    ) -> ChainView {
        tracing::trace!(target: "bridge_history::watcher", ?config, "spawning chain watcher");
        let (mut watcher, view) = Self::new(heights_oracle, finality_oracle, config);

        // publish a first observation before handing out the view.
        watcher.refresh_heights().await;
        watcher.refresh_finality().await;

        tokio::spawn(watcher.run());
        view
    }

    /// Main execution loop for the [`ChainWatcher`].
    pub async fn run(mut self) {
        let mut heights_interval = interval(self.config.heights_interval);
        heights_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut finality_interval = interval(self.config.finality_interval);
        finality_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let watches_finality = self.finality_oracle.is_some();

        loop {
            tokio::select! {
                _ = heights_interval.tick() => self.refresh_heights().await,
                _ = finality_interval.tick(), if watches_finality => self.refresh_finality().await,
                _ = self.heights.closed() => break,
            }
        }
        tracing::info!(target: "bridge_history::watcher", "chain view dropped, stopping the watcher");
    }

    /// Refreshes the block heights, publishing them if they changed.
    pub async fn refresh_heights(&mut self) {
        match self.heights_oracle.block_numbers().await {
            Ok(heights) => {
                self.metrics.height_refreshes.increment(1);
                self.heights.send_if_modified(|current| {
                    let modified = *current != Some(heights);
                    if modified {
                        tracing::trace!(target: "bridge_history::watcher", l1 = heights.l1, l2 = heights.l2, "new block heights");
                        *current = Some(heights);
                    }
                    modified
                });
            }
            Err(err) => {
                self.metrics.refresh_failures.increment(1);
                tracing::warn!(target: "bridge_history::watcher", %err, "failed to refresh block heights");
            }
        }
    }

    /// Refreshes the last finalized batch index, publishing it if it changed. A no-op without a
    /// finality oracle.
    pub async fn refresh_finality(&mut self) {
        let Some(oracle) = self.finality_oracle.as_ref() else { return };
        match oracle.last_finalized_batch_index().await {
            Ok(index) => {
                self.metrics.finality_refreshes.increment(1);
                self.finalized_batch.send_if_modified(|current| {
                    let modified = *current != Some(index);
                    if modified {
                        tracing::debug!(target: "bridge_history::watcher", index, "new finalized batch");
                        *current = Some(index);
                    }
                    modified
                });
            }
            Err(err) => {
                self.metrics.refresh_failures.increment(1);
                tracing::warn!(target: "bridge_history::watcher", %err, "failed to refresh finalized batch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_history_providers::test_utils::{MockBlockHeightOracle, MockFinalityOracle};

    fn fast_config() -> WatcherConfig {
        WatcherConfig {
            heights_interval: Duration::from_millis(5),
            finality_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_spawn_publishes_first_observation() -> eyre::Result<()> {
        let heights = Arc::new(MockBlockHeightOracle::new(100, 2000));
        let finality: Arc<dyn FinalityOracle> = Arc::new(MockFinalityOracle::new(5));

        let view = ChainWatcher::spawn(heights, Some(finality), fast_config()).await;

        assert_eq!(view.heights(), Some(ChainHeights::new(100, 2000)));
        assert_eq!(view.last_finalized_batch(), Some(5));
        Ok(())
    }

    #[tokio::test]
    async fn test_watcher_publishes_changes() -> eyre::Result<()> {
        let heights = Arc::new(MockBlockHeightOracle::new(1, 1));
        let finality = Arc::new(MockFinalityOracle::new(1));
        let mut view = ChainWatcher::spawn(
            heights.clone(),
            Some(finality.clone() as Arc<dyn FinalityOracle>),
            fast_config(),
        )
        .await;

        heights.set(2, 3);
        finality.set(4);

        tokio::time::timeout(
            Duration::from_secs(5),
            view.heights.wait_for(|h| *h == Some(ChainHeights::new(2, 3))),
        )
        .await??;
        tokio::time::timeout(Duration::from_secs(5), view.finalized_batch.wait_for(|i| *i == Some(4)))
            .await??;
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_observation() {
        let heights = Arc::new(MockBlockHeightOracle::new(10, 20));
        let (mut watcher, view) = ChainWatcher::new(heights.clone(), None, fast_config());

        watcher.refresh_heights().await;
        heights.set_failing(true);
        heights.set(11, 21);
        watcher.refresh_heights().await;
        watcher.refresh_finality().await;

        assert_eq!(view.heights(), Some(ChainHeights::new(10, 20)));
        assert_eq!(view.last_finalized_batch(), None);
    }
}
