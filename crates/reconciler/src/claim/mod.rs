//! Withdrawal claims.

pub mod batch;
pub mod direct;

use batch::BatchClaimState;
use direct::DirectClaimState;

use crate::{engine::BridgeHistory, ClaimError, ClaimVariant};

use alloy_primitives::{TxHash, U256};
use bridge_history_primitives::{
    unix_millis, BridgeTransaction, ClaimRecord, ClaimRecordStatus, EtaKey, FailureReason,
    Network, TxPosition,
};
use bridge_history_providers::{
    ClaimClient, ClaimOutcome, HistoryFetcher, ProviderError, SubmittedClaim,
};
use bridge_history_store::{BridgeStore, SnapshotStorage};
use serde::Serialize;

/// The claim state of a withdrawal under one of the claim variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
#[serde(untagged)]
pub enum ClaimState {
    /// The state of a batch-proof claim.
    Batch(BatchClaimState),
    /// The state of a direct-finalization claim.
    Direct(DirectClaimState),
}

impl ClaimState {
    /// Derives the claim state of the withdrawal under `variant`.
    pub fn derive(
        variant: ClaimVariant,
        tx: &BridgeTransaction,
        record: Option<&ClaimRecord>,
        last_finalized_batch: Option<u64>,
        verified: bool,
        manual_claim_threshold: U256,
    ) -> Self {
        match variant {
            ClaimVariant::Batch => Self::Batch(BatchClaimState::derive(tx, record, last_finalized_batch)),
            ClaimVariant::Direct => Self::Direct(DirectClaimState::derive(
                tx,
                record,
                verified,
                manual_claim_threshold,
            )),
        }
    }

    /// Returns true if a claim can be submitted.
    pub const fn is_claimable(&self) -> bool {
        matches!(
            self,
            Self::Batch(BatchClaimState::Claimable) | Self::Direct(DirectClaimState::Claimable)
        )
    }
}

/// The result of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// The claim was confirmed.
    Claimed {
        /// The hash of the confirmed claim transaction.
        claim_hash: TxHash,
    },
    /// The claim failed.
    Failed(FailureReason),
    /// The withdrawal was already finalized on the bridge, nothing was submitted.
    AlreadyFinalized,
}

impl<F: HistoryFetcher, S: SnapshotStorage> BridgeHistory<F, S> {
    /// Claims the withdrawal and waits for the outcome of the claim.
    ///
    /// The claim is only submitted if the client is connected to the L1 of the active network
    /// and the withdrawal is claimable. Replacements of the claim transaction are followed,
    /// and the claim estimate is reset on each replacement.
    pub async fn claim(&self, hash: TxHash) -> Result<ClaimResult, ClaimError> {
        let client = self.claim_client.clone().ok_or(ClaimError::ClaimsDisabled)?;
        let network = self.network();

        let expected = network.l1_chain_id();
        let actual = client.chain_id().await?;
        if actual != expected {
            tracing::warn!(target: "bridge_history::claim", %hash, expected, actual, "claim client connected to the wrong network");
            return Err(ClaimError::WrongNetwork { expected, actual })
        }

        let tx = self.withdrawal(hash).await?;
        if self.config.claim_variant == ClaimVariant::Direct {
            self.verify_withdrawal(hash).await?;
        }
        self.ensure_claimable(&tx)?;
        let claim_info = tx.claim_info.clone().ok_or(ProviderError::MissingClaimProof(hash))?;

        if self.config.claim_variant == ClaimVariant::Direct &&
            client.is_withdrawal_finalized(&claim_info).await?
        {
            tracing::info!(target: "bridge_history::claim", %hash, "withdrawal already finalized");
            self.claim_metrics.already_finalized.increment(1);
            return self.finish_claim(network, hash, ClaimResult::AlreadyFinalized).await
        }

        // re-check under the lock so concurrent claims of the hash submit once
        {
            let mut state = self.state.lock();
            if state.store.network() != network {
                return Err(ClaimError::NetworkSwitched(hash))
            }
            let current = self.claim_state_of(&state, &tx, self.chain.last_finalized_batch());
            if !current.is_claimable() {
                return Err(ClaimError::NotClaimable { hash, state: current })
            }
            let now = unix_millis();
            state.store.upsert_claim_record(ClaimRecord::claiming(hash, now));
            state.store.set_eta(EtaKey::Claim(hash), self.claim_eta(now));
        }
        self.persist().await?;

        let submitted = match client.submit_claim(hash, &claim_info).await {
            Ok(submitted) => submitted,
            Err(err) => {
                tracing::warn!(target: "bridge_history::claim", %hash, %err, "claim submission failed");
                // nothing reached the chain, the withdrawal is claimable again
                self.update_store(network, hash, |store| {
                    store.remove_claim_record(&hash);
                    store.clear_eta(&EtaKey::Claim(hash));
                })?;
                // a failed write is logged and retried with the next pass
                let _ = self.persist().await;
                return Err(err.into())
            }
        };

        self.claim_metrics.submitted.increment(1);
        tracing::info!(target: "bridge_history::claim", %hash, claim_hash = %submitted.hash, nonce = submitted.nonce, "claim submitted");
        self.set_claim_hash(network, hash, submitted.hash)?;
        self.persist().await?;

        let result = self.await_claim_outcome(client.as_ref(), network, hash, submitted).await?;
        self.finish_claim(network, hash, result).await
    }

    /// Returns the withdrawal from the backend cache, querying the backend on a miss.
    async fn withdrawal(&self, hash: TxHash) -> Result<BridgeTransaction, ClaimError> {
        let cached = self.state.lock().backend.get(&hash).cloned();
        let tx = match cached {
            Some(tx) => tx,
            None => {
                let outcome = self.fetcher.fetch_by_hashes(&[hash]).await;
                if let Some(chunk) = outcome.failed_chunks.into_iter().next() {
                    return Err(chunk.error.into())
                }
                let tx = outcome
                    .records
                    .into_iter()
                    .find(|tx| tx.hash == hash)
                    .ok_or(ClaimError::UnknownWithdrawal(hash))?;
                self.state.lock().backend.insert(hash, tx.clone());
                tx
            }
        };

        if tx.origin_is_l1 {
            return Err(ClaimError::UnknownWithdrawal(hash))
        }
        Ok(tx)
    }

    /// Queries the verification status of the withdrawal if it is not known to be verified.
    async fn verify_withdrawal(&self, hash: TxHash) -> Result<(), ClaimError> {
        let Some(oracle) = &self.status_oracle else { return Ok(()) };
        if self.state.lock().verified.contains(&hash) {
            return Ok(())
        }
        let (_, verified) = oracle.withdrawal_status(hash).await?;
        if verified {
            self.state.lock().verified.insert(hash);
        }
        Ok(())
    }

    fn ensure_claimable(&self, tx: &BridgeTransaction) -> Result<(), ClaimError> {
        let state = self.state.lock();
        let current = self.claim_state_of(&state, tx, self.chain.last_finalized_batch());
        if current.is_claimable() {
            Ok(())
        } else {
            Err(ClaimError::NotClaimable { hash: tx.hash, state: current })
        }
    }

    /// Polls the outcome of the claim until it settles, following replacements.
    async fn await_claim_outcome(
        &self,
        client: &dyn ClaimClient,
        network: Network,
        hash: TxHash,
        mut claim: SubmittedClaim,
    ) -> Result<ClaimResult, ClaimError> {
        loop {
            match client.claim_outcome(&claim).await {
                Ok(ClaimOutcome::Pending) => {}
                Ok(ClaimOutcome::Success { block_number }) => {
                    tracing::info!(target: "bridge_history::claim", %hash, claim_hash = %claim.hash, block_number, "claim confirmed");
                    return Ok(ClaimResult::Claimed { claim_hash: claim.hash })
                }
                Ok(ClaimOutcome::Reverted) => return Ok(ClaimResult::Failed(FailureReason::Reverted)),
                Ok(ClaimOutcome::Cancelled) => {
                    return Ok(ClaimResult::Failed(FailureReason::Cancelled))
                }
                Ok(ClaimOutcome::Replaced { hash: replacement }) => {
                    tracing::info!(target: "bridge_history::claim", %hash, replaced = %claim.hash, %replacement, "claim replaced");
                    self.claim_metrics.replaced.increment(1);
                    claim = claim.replaced(replacement);
                    self.set_claim_hash(network, hash, replacement)?;
                    let eta = self.claim_eta(unix_millis());
                    self.update_store(network, hash, |store| store.set_eta(EtaKey::Claim(hash), eta))?;
                    let _ = self.persist().await;
                    continue
                }
                Err(err) => {
                    tracing::warn!(target: "bridge_history::claim", %hash, claim_hash = %claim.hash, %err, "claim outcome query failed, retrying");
                }
            }
            tokio::time::sleep(self.config.claim_poll_interval).await;
        }
    }

    /// Records the settled claim, clears its estimate and persists the store.
    async fn finish_claim(
        &self,
        network: Network,
        hash: TxHash,
        result: ClaimResult,
    ) -> Result<ClaimResult, ClaimError> {
        self.update_store(network, hash, |store| {
            store.clear_eta(&EtaKey::Claim(hash));
            let mut record = store
                .claim_record(&hash)
                .cloned()
                .unwrap_or_else(|| ClaimRecord::claiming(hash, unix_millis()));
            match result {
                ClaimResult::Claimed { claim_hash } => {
                    record.status = ClaimRecordStatus::Claimed;
                    record.claim_hash = Some(claim_hash);
                }
                ClaimResult::AlreadyFinalized => record.status = ClaimRecordStatus::Claimed,
                ClaimResult::Failed(reason) => {
                    record.status = ClaimRecordStatus::Failed(reason);
                    if let Some((wallet, entry)) = store.locate(&hash) {
                        store.mark_position(&wallet, &hash, TxPosition::Abnormal, entry.direction);
                    }
                }
            }
            store.upsert_claim_record(record);
        })?;

        match result {
            ClaimResult::Claimed { .. } => self.claim_metrics.succeeded.increment(1),
            ClaimResult::Failed(reason) => {
                self.claim_metrics.failed.increment(1);
                tracing::warn!(target: "bridge_history::claim", %hash, %reason, "claim failed");
            }
            ClaimResult::AlreadyFinalized => {}
        }

        self.persist().await?;
        Ok(result)
    }

    fn set_claim_hash(
        &self,
        network: Network,
        hash: TxHash,
        claim_hash: TxHash,
    ) -> Result<(), ClaimError> {
        self.update_store(network, hash, |store| {
            let mut record = store
                .claim_record(&hash)
                .cloned()
                .unwrap_or_else(|| ClaimRecord::claiming(hash, unix_millis()));
            record.claim_hash = Some(claim_hash);
            store.upsert_claim_record(record);
        })
    }

    /// Applies `f` to the store, if it still belongs to the network the claim started on.
    fn update_store<R>(
        &self,
        network: Network,
        hash: TxHash,
        f: impl FnOnce(&mut BridgeStore) -> R,
    ) -> Result<R, ClaimError> {
        let mut state = self.state.lock();
        if state.store.network() != network {
            tracing::warn!(target: "bridge_history::claim", %hash, %network, "network switched during claim");
            return Err(ClaimError::NetworkSwitched(hash))
        }
        Ok(f(&mut state.store))
    }

    const fn claim_eta(&self, now: u64) -> u64 {
        now.saturating_add(self.config.eta.l1_block_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_history_primitives::{TokenInfo, TxDirection};

    #[test]
    fn test_claim_state_serializes_inner_state() {
        let state = ClaimState::Batch(BatchClaimState::Claimable);
        assert_eq!(serde_json::to_value(state).unwrap(), "CLAIMABLE");
        assert_eq!(state.to_string(), "CLAIMABLE");

        let state = ClaimState::Direct(DirectClaimState::Pending);
        assert_eq!(serde_json::to_value(state).unwrap(), "pending");
    }

    #[test]
    fn test_derive_dispatches_on_variant() {
        let mut tx = BridgeTransaction::submitted(
            TxHash::with_last_byte(1),
            TxDirection::Withdraw,
            U256::from(9_000_000_000_000_000u64),
            TokenInfo::native(),
            0,
        );
        tx.origin_block_number = Some(10);

        let batch = ClaimState::derive(ClaimVariant::Batch, &tx, None, Some(5), true, U256::ZERO);
        assert_eq!(batch, ClaimState::Batch(BatchClaimState::NotReady));

        let direct = ClaimState::derive(
            ClaimVariant::Direct,
            &tx,
            None,
            None,
            true,
            crate::MANUAL_CLAIM_THRESHOLD,
        );
        assert_eq!(direct, ClaimState::Direct(DirectClaimState::Claimable));
        assert!(direct.is_claimable());
    }
}
