//! Integration tests of the bridge history service and its handle.

mod common;
use common::*;

use bridge_history_primitives::{ChainHeights, TxPosition};
use bridge_history_providers::{
    test_utils::{MockClaimClient, MockHistoryFetcher},
    ClaimOutcome,
};
use bridge_history_reconciler::{
    BridgeHistoryService, ClaimResult, ReconcileError, ReconcilerConfig, WatchedPage,
};
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn test_handle_round_trip() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let config = ReconcilerConfig {
        claim_poll_interval: Duration::from_millis(10),
        history_interval: Duration::from_millis(50),
        ..Default::default()
    };
    let harness = Harness::build(config, Arc::new(MockHistoryFetcher::default()), |engine| {
        engine.with_claim_client(client.clone())
    })
    .await?;
    let handle = BridgeHistoryService::spawn(harness.engine.clone(), None);

    handle.mark_submitted(wallet(), submitted_deposit(1, NOW)).await?;
    let page = handle.list_page(wallet(), 1, 10).await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.transactions[0].position, TxPosition::Frontend);

    // the listed page is watched and refreshed by the periodic passes
    let mut pages = handle.subscribe().await?;
    harness.fetcher.insert(indexed_deposit(1, 90));
    let refreshed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            pages.changed().await?;
            let page = pages.borrow_and_update().clone();
            if page.as_ref().and_then(|p| p.get(&hash(1))).map(|e| e.position) ==
                Some(TxPosition::Backend)
            {
                return Ok::<_, eyre::Report>(page)
            }
        }
    })
    .await??;
    assert!(refreshed.is_some());

    // withdrawals are claimed through the handle
    let withdrawal = indexed_withdrawal(2, alloy_primitives::U256::from(1), Some(3));
    handle
        .mark_submitted(wallet(), submitted_withdrawal(2, withdrawal.amount, NOW + 1))
        .await?;
    harness.fetcher.insert(withdrawal);
    harness.finalized_batch.send_replace(Some(3));
    handle.list_page(wallet(), 1, 10).await?;

    client.push_outcomes([ClaimOutcome::Success { block_number: 5 }]);
    let result = handle.claim(hash(2)).await?;
    assert_eq!(result, ClaimResult::Claimed { claim_hash: MockClaimClient::claim_hash(0) });

    handle.shutdown().await;
    let err = handle.list_page(wallet(), 1, 10).await.unwrap_err();
    assert!(matches!(err, ReconcileError::ServiceStopped));

    Ok(())
}

#[tokio::test]
async fn test_height_change_rerenders_watched_page() -> eyre::Result<()> {
    let config =
        ReconcilerConfig { history_interval: Duration::from_secs(3_600), ..Default::default() };
    let harness = Harness::new(config).await?;
    harness.engine.mark_submitted(wallet(), submitted_deposit(1, NOW)).await?;
    harness.fetcher.insert(indexed_deposit(1, 90));
    harness.engine.sync_page(wallet(), 1, 10).await?;

    let watched = WatchedPage { wallet: wallet(), page: 1, page_size: 10 };
    let handle = BridgeHistoryService::spawn(harness.engine.clone(), Some(watched));
    let mut pages = handle.subscribe().await?;

    // the target block of the deposit is reached, the estimates are dropped
    harness.heights.send_replace(Some(ChainHeights::new(154, 1_000)));
    let page = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            pages.changed().await?;
            let page = pages.borrow_and_update().clone();
            if let Some(page) = page {
                if page.transactions.first().is_some_and(|e| e.eta.from.is_none()) {
                    return Ok::<_, eyre::Report>(page)
                }
            }
        }
    })
    .await??;
    assert_eq!(page.total, 1);

    handle.shutdown().await;
    Ok(())
}
