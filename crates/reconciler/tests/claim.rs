//! Integration tests of the claim flows.

mod common;
use common::*;

use alloy_primitives::U256;
use bridge_history_primitives::{BridgeTransaction, EtaKey, FailureReason, TxPosition};
use bridge_history_providers::{
    test_utils::{MockClaimClient, MockHistoryFetcher, MockWithdrawalStatusOracle},
    ClaimOutcome,
};
use bridge_history_reconciler::{
    BatchClaimState, ClaimError, ClaimResult, ClaimState, ClaimVariant, DirectClaimState,
    ReconcilerConfig,
};
use std::{sync::Arc, time::Duration};

const AMOUNT: U256 = U256::from_limbs([9_000_000_000_000_000, 0, 0, 0]);

fn config(variant: ClaimVariant) -> ReconcilerConfig {
    ReconcilerConfig {
        claim_variant: variant,
        claim_poll_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

async fn claim_harness(variant: ClaimVariant, client: Arc<MockClaimClient>) -> eyre::Result<Harness> {
    Harness::build(config(variant), Arc::new(MockHistoryFetcher::default()), |engine| {
        engine.with_claim_client(client)
    })
    .await
}

/// Submits the withdrawal, indexes it in the backend and runs a pass.
async fn index(harness: &Harness, tx: BridgeTransaction) -> eyre::Result<()> {
    let submitted = submitted_withdrawal(tx.hash[31], tx.amount, NOW);
    harness.engine.mark_submitted(wallet(), submitted).await?;
    harness.fetcher.insert(tx);
    harness.engine.sync_page_at(wallet(), 1, 10, NOW).await?;
    Ok(())
}

fn claim_state(harness: &Harness, byte: u8) -> Option<ClaimState> {
    harness.engine.list_page_at(wallet(), 1, 10, NOW).get(&hash(byte)).and_then(|entry| entry.claim)
}

#[tokio::test]
async fn test_batch_claimable_once_batch_finalized() -> eyre::Result<()> {
    let harness = Harness::new(config(ClaimVariant::Batch)).await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;

    harness.finalized_batch.send_replace(Some(4));
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Batch(BatchClaimState::NotReady)));

    harness.finalized_batch.send_replace(Some(5));
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Batch(BatchClaimState::Claimable)));

    Ok(())
}

#[tokio::test]
async fn test_claim_success_clears_claim_eta() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let harness = Harness::build(
        ReconcilerConfig { claim_poll_interval: Duration::from_millis(100), ..Default::default() },
        Arc::new(MockHistoryFetcher::default()),
        |engine| engine.with_claim_client(client.clone()),
    )
    .await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;
    harness.finalized_batch.send_replace(Some(5));

    client.push_outcomes([
        ClaimOutcome::Pending,
        ClaimOutcome::Pending,
        ClaimOutcome::Success { block_number: 7 },
    ]);
    let claim = {
        let engine = harness.engine.clone();
        tokio::spawn(async move { engine.claim(hash(1)).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Batch(BatchClaimState::Claiming)));
    assert!(harness.engine.eta(&EtaKey::Claim(hash(1))).is_some());

    let result = claim.await??;
    assert_eq!(result, ClaimResult::Claimed { claim_hash: MockClaimClient::claim_hash(0) });
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Batch(BatchClaimState::Claimed)));
    assert_eq!(harness.engine.eta(&EtaKey::Claim(hash(1))), None);
    assert_eq!(client.submissions(), vec![hash(1)]);

    // a second claim is refused without submitting
    let err = harness.engine.claim(hash(1)).await.unwrap_err();
    assert!(matches!(
        err,
        ClaimError::NotClaimable { state: ClaimState::Batch(BatchClaimState::Claimed), .. }
    ));
    assert_eq!(client.submissions().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_reverted_claim_is_demoted() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let harness = claim_harness(ClaimVariant::Batch, client.clone()).await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;
    harness.finalized_batch.send_replace(Some(5));

    client.push_outcomes([ClaimOutcome::Reverted]);
    let result = harness.engine.claim(hash(1)).await?;
    assert_eq!(result, ClaimResult::Failed(FailureReason::Reverted));

    let page = harness.engine.list_page_at(wallet(), 1, 10, NOW);
    let entry = page.get(&hash(1)).unwrap();
    assert_eq!(entry.position, TxPosition::Abnormal);
    assert_eq!(entry.claim, Some(ClaimState::Batch(BatchClaimState::Failed)));
    assert_eq!(entry.eta.claim, None);

    // later passes keep the failure
    let page = harness.engine.sync_page_at(wallet(), 1, 10, NOW).await?.into_page().unwrap();
    let entry = page.get(&hash(1)).unwrap();
    assert_eq!(entry.position, TxPosition::Abnormal);
    assert_eq!(entry.claim, Some(ClaimState::Batch(BatchClaimState::Failed)));

    Ok(())
}

#[tokio::test]
async fn test_cancelled_claim_fails() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let harness = claim_harness(ClaimVariant::Batch, client.clone()).await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;
    harness.finalized_batch.send_replace(Some(5));

    client.push_outcomes([ClaimOutcome::Pending, ClaimOutcome::Cancelled]);
    let result = harness.engine.claim(hash(1)).await?;
    assert_eq!(result, ClaimResult::Failed(FailureReason::Cancelled));
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Batch(BatchClaimState::Failed)));

    Ok(())
}

#[tokio::test]
async fn test_replaced_claim_is_followed() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let harness = claim_harness(ClaimVariant::Batch, client.clone()).await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;
    harness.finalized_batch.send_replace(Some(5));

    let replacement = hash(0xee);
    client.push_outcomes([
        ClaimOutcome::Replaced { hash: replacement },
        ClaimOutcome::Pending,
        ClaimOutcome::Success { block_number: 9 },
    ]);
    let result = harness.engine.claim(hash(1)).await?;
    assert_eq!(result, ClaimResult::Claimed { claim_hash: replacement });
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Batch(BatchClaimState::Claimed)));
    assert_eq!(harness.engine.eta(&EtaKey::Claim(hash(1))), None);

    Ok(())
}

#[tokio::test]
async fn test_claim_on_wrong_network_is_refused() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(11_155_111));
    let harness = claim_harness(ClaimVariant::Batch, client.clone()).await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;
    harness.finalized_batch.send_replace(Some(5));

    let err = harness.engine.claim(hash(1)).await.unwrap_err();
    assert!(matches!(err, ClaimError::WrongNetwork { expected: 1, actual: 11_155_111 }));
    assert!(client.submissions().is_empty());
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Batch(BatchClaimState::Claimable)));

    Ok(())
}

#[tokio::test]
async fn test_claim_preconditions() -> eyre::Result<()> {
    let harness = Harness::new(config(ClaimVariant::Batch)).await?;
    let err = harness.engine.claim(hash(1)).await.unwrap_err();
    assert!(matches!(err, ClaimError::ClaimsDisabled));

    let client = Arc::new(MockClaimClient::new(1));
    let harness = claim_harness(ClaimVariant::Batch, client.clone()).await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;

    let err = harness.engine.claim(hash(0x99)).await.unwrap_err();
    assert!(matches!(err, ClaimError::UnknownWithdrawal(h) if h == hash(0x99)));

    harness.finalized_batch.send_replace(Some(4));
    let err = harness.engine.claim(hash(1)).await.unwrap_err();
    assert!(matches!(
        err,
        ClaimError::NotClaimable { state: ClaimState::Batch(BatchClaimState::NotReady), .. }
    ));
    assert!(client.submissions().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rejected_submission_leaves_withdrawal_claimable() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let harness = claim_harness(ClaimVariant::Batch, client.clone()).await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;
    harness.finalized_batch.send_replace(Some(5));

    client.reject_submissions(true);
    let err = harness.engine.claim(hash(1)).await.unwrap_err();
    assert!(matches!(err, ClaimError::Provider(_)));
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Batch(BatchClaimState::Claimable)));
    assert_eq!(harness.engine.eta(&EtaKey::Claim(hash(1))), None);

    Ok(())
}

#[tokio::test]
async fn test_claim_record_survives_reload() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let harness = claim_harness(ClaimVariant::Batch, client.clone()).await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, Some(5))).await?;
    harness.finalized_batch.send_replace(Some(5));

    client.push_outcomes([ClaimOutcome::Success { block_number: 7 }]);
    harness.engine.claim(hash(1)).await?;

    let reloaded = harness.reload(config(ClaimVariant::Batch)).await?;
    let page = reloaded.sync_page_at(wallet(), 1, 10, NOW).await?.into_page().unwrap();
    assert_eq!(
        page.get(&hash(1)).unwrap().claim,
        Some(ClaimState::Batch(BatchClaimState::Claimed))
    );

    Ok(())
}

#[tokio::test]
async fn test_direct_claim_already_finalized() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let oracle = Arc::new(MockWithdrawalStatusOracle::default());
    let harness =
        Harness::build(config(ClaimVariant::Direct), Arc::new(MockHistoryFetcher::default()), |engine| {
            engine.with_claim_client(client.clone()).with_withdrawal_status_oracle(oracle.clone())
        })
        .await?;
    index(&harness, indexed_withdrawal(1, AMOUNT, None)).await?;
    oracle.verify(hash(1));
    harness.engine.refresh_withdrawal_status().await;
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Direct(DirectClaimState::Claimable)));

    client.set_finalized(true);
    let result = harness.engine.claim(hash(1)).await?;
    assert_eq!(result, ClaimResult::AlreadyFinalized);
    assert!(client.submissions().is_empty());
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Direct(DirectClaimState::Claimed)));

    Ok(())
}

#[tokio::test]
async fn test_direct_claim_until_indexed() -> eyre::Result<()> {
    let client = Arc::new(MockClaimClient::new(1));
    let oracle = Arc::new(MockWithdrawalStatusOracle::default());
    let harness =
        Harness::build(config(ClaimVariant::Direct), Arc::new(MockHistoryFetcher::default()), |engine| {
            engine.with_claim_client(client.clone()).with_withdrawal_status_oracle(oracle.clone())
        })
        .await?;
    let swept = U256::from(20_000_000_000_000_000u64);
    index(&harness, indexed_withdrawal(1, AMOUNT, None)).await?;
    index(&harness, indexed_withdrawal(2, swept, None)).await?;
    oracle.verify(hash(1));
    oracle.verify(hash(2));
    harness.engine.refresh_withdrawal_status().await;

    // swept automatically, no manual claim
    let err = harness.engine.claim(hash(2)).await.unwrap_err();
    assert!(matches!(
        err,
        ClaimError::NotClaimable { state: ClaimState::Direct(DirectClaimState::Pending), .. }
    ));

    client.push_outcomes([ClaimOutcome::Success { block_number: 3 }]);
    harness.engine.claim(hash(1)).await?;
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Direct(DirectClaimState::Claimed)));

    let mut finalized = indexed_withdrawal(1, AMOUNT, None);
    finalized.counterpart_hash = Some(MockClaimClient::claim_hash(0));
    harness.fetcher.insert(finalized);
    harness.engine.sync_page_at(wallet(), 1, 10, NOW).await?;
    assert_eq!(claim_state(&harness, 1), Some(ClaimState::Direct(DirectClaimState::Success)));

    Ok(())
}
