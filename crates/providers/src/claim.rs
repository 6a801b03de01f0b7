//! Claim clients submitting the destination leg of a withdrawal.

use crate::ProviderError;

use alloy_consensus::Transaction as ConsensusTransaction;
use alloy_network::{ReceiptResponse, TransactionBuilder, TransactionResponse};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockNumberOrTag, TransactionRequest};
use bridge_history_l1::abi::calls::{
    decode_is_withdrawal_finalized, finalize_withdrawal_calldata, is_withdrawal_finalized_calldata,
    relay_message_with_proof_calldata,
};
use bridge_history_primitives::ClaimInfo;

/// The default count of blocks scanned for a transaction consuming a dropped claim's nonce.
pub const DEFAULT_REPLACEMENT_SCAN_DEPTH: u64 = 32;

/// A claim transaction sent to the destination chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedClaim {
    /// The claim transaction hash.
    pub hash: TxHash,
    /// The sender of the claim.
    pub sender: Address,
    /// The nonce used by the claim.
    pub nonce: u64,
    /// The called contract.
    pub to: Address,
    /// The claim calldata.
    pub input: Bytes,
}

impl SubmittedClaim {
    /// Returns the claim with its hash replaced.
    pub fn replaced(&self, hash: TxHash) -> Self {
        Self { hash, ..self.clone() }
    }
}

/// The observed outcome of a claim transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim is not yet included.
    Pending,
    /// The claim was included and succeeded.
    Success {
        /// The block including the claim.
        block_number: u64,
    },
    /// The claim was included and reverted.
    Reverted,
    /// The claim was dropped and its nonce used by an unrelated transaction.
    Cancelled,
    /// The claim was replaced by an equivalent transaction with a different hash.
    Replaced {
        /// The hash of the replacement.
        hash: TxHash,
    },
}

/// Submits claims and observes their outcome.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait ClaimClient: Send + Sync {
    /// Returns the chain id of the network the client submits to.
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Submits the claim of the withdrawal `hash`.
    async fn submit_claim(
        &self,
        hash: TxHash,
        claim: &ClaimInfo,
    ) -> Result<SubmittedClaim, ProviderError>;

    /// Returns the current outcome of a submitted claim.
    async fn claim_outcome(&self, claim: &SubmittedClaim) -> Result<ClaimOutcome, ProviderError>;

    /// Returns true if the withdrawal is already finalized on the destination chain.
    async fn is_withdrawal_finalized(&self, _claim: &ClaimInfo) -> Result<bool, ProviderError> {
        Ok(false)
    }
}

/// Sends claim transactions from a fixed sender and tracks them by nonce.
#[derive(Debug, Clone)]
struct ClaimSender<P> {
    provider: P,
    sender: Address,
    target: Address,
    scan_depth: u64,
}

impl<P: Provider> ClaimSender<P> {
    async fn send(&self, input: Bytes) -> Result<SubmittedClaim, ProviderError> {
        let nonce = self.provider.get_transaction_count(self.sender).pending().await?;
        let request = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(self.target)
            .with_nonce(nonce)
            .with_input(input.clone());
        let pending = self.provider.send_transaction(request).await?;
        let hash = *pending.tx_hash();

        tracing::info!(target: "bridge_history::providers", ?hash, nonce, to = ?self.target, "submitted claim");
        Ok(SubmittedClaim { hash, sender: self.sender, nonce, to: self.target, input })
    }

    async fn outcome(&self, claim: &SubmittedClaim) -> Result<ClaimOutcome, ProviderError> {
        if let Some(receipt) = self.provider.get_transaction_receipt(claim.hash).await? {
            if !receipt.status() {
                return Ok(ClaimOutcome::Reverted)
            }
            let block_number = receipt.block_number().unwrap_or_default();
            return Ok(ClaimOutcome::Success { block_number })
        }
        if self.provider.get_transaction_by_hash(claim.hash).await?.is_some() {
            return Ok(ClaimOutcome::Pending)
        }

        // The claim left the pool. Until its nonce is consumed it may still be propagating.
        let mined_nonce = self.provider.get_transaction_count(claim.sender).await?;
        if mined_nonce <= claim.nonce {
            return Ok(ClaimOutcome::Pending)
        }

        let head = self.provider.get_block_number().await?;
        for number in (head.saturating_sub(self.scan_depth)..=head).rev() {
            let Some(block) =
                self.provider.get_block_by_number(BlockNumberOrTag::Number(number)).full().await?
            else {
                continue
            };
            let replacement = block
                .transactions
                .txns()
                .find(|tx| tx.from() == claim.sender && ConsensusTransaction::nonce(*tx) == claim.nonce);
            if let Some(tx) = replacement {
                let equivalent = ConsensusTransaction::to(tx) == Some(claim.to) &&
                    ConsensusTransaction::input(tx) == &claim.input;
                tracing::debug!(target: "bridge_history::providers", original = ?claim.hash, replacement = ?tx.tx_hash(), equivalent, "claim nonce consumed");
                return Ok(if equivalent {
                    ClaimOutcome::Replaced { hash: tx.tx_hash() }
                } else {
                    ClaimOutcome::Cancelled
                })
            }
        }

        tracing::debug!(target: "bridge_history::providers", hash = ?claim.hash, depth = self.scan_depth, "claim nonce consumed outside of scan window");
        Ok(ClaimOutcome::Cancelled)
    }
}

/// A [`ClaimClient`] relaying withdrawals through the L1 messenger with a batch proof.
#[derive(Debug, Clone)]
pub struct MessengerClaimClient<P> {
    inner: ClaimSender<P>,
}

impl<P> MessengerClaimClient<P> {
    /// Returns a new [`MessengerClaimClient`] sending from `sender` to the `messenger` contract.
    pub const fn new(provider: P, sender: Address, messenger: Address) -> Self {
        Self {
            inner: ClaimSender {
                provider,
                sender,
                target: messenger,
                scan_depth: DEFAULT_REPLACEMENT_SCAN_DEPTH,
            },
        }
    }

    /// Sets the count of blocks scanned for replacements.
    pub fn with_scan_depth(mut self, scan_depth: u64) -> Self {
        self.inner.scan_depth = scan_depth;
        self
    }
}

#[async_trait::async_trait]
impl<P: Provider + Send + Sync> ClaimClient for MessengerClaimClient<P> {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.inner.provider.get_chain_id().await?)
    }

    async fn submit_claim(
        &self,
        hash: TxHash,
        claim: &ClaimInfo,
    ) -> Result<SubmittedClaim, ProviderError> {
        let input =
            relay_message_with_proof_calldata(claim).ok_or(ProviderError::MissingClaimProof(hash))?;
        self.inner.send(input).await
    }

    async fn claim_outcome(&self, claim: &SubmittedClaim) -> Result<ClaimOutcome, ProviderError> {
        self.inner.outcome(claim).await
    }
}

/// A [`ClaimClient`] finalizing withdrawals directly on the L1 bridge.
#[derive(Debug, Clone)]
pub struct DirectFinalizationClaimClient<P> {
    inner: ClaimSender<P>,
}

impl<P> DirectFinalizationClaimClient<P> {
    /// Returns a new [`DirectFinalizationClaimClient`] sending from `sender` to the `bridge`
    /// contract.
    pub const fn new(provider: P, sender: Address, bridge: Address) -> Self {
        Self {
            inner: ClaimSender {
                provider,
                sender,
                target: bridge,
                scan_depth: DEFAULT_REPLACEMENT_SCAN_DEPTH,
            },
        }
    }

    /// Sets the count of blocks scanned for replacements.
    pub fn with_scan_depth(mut self, scan_depth: u64) -> Self {
        self.inner.scan_depth = scan_depth;
        self
    }
}

#[async_trait::async_trait]
impl<P: Provider + Send + Sync> ClaimClient for DirectFinalizationClaimClient<P> {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.inner.provider.get_chain_id().await?)
    }

    async fn submit_claim(
        &self,
        hash: TxHash,
        claim: &ClaimInfo,
    ) -> Result<SubmittedClaim, ProviderError> {
        let input = finalize_withdrawal_calldata(claim).ok_or(ProviderError::MissingClaimProof(hash))?;
        self.inner.send(input).await
    }

    async fn claim_outcome(&self, claim: &SubmittedClaim) -> Result<ClaimOutcome, ProviderError> {
        self.inner.outcome(claim).await
    }

    async fn is_withdrawal_finalized(&self, claim: &ClaimInfo) -> Result<bool, ProviderError> {
        let Some(params) = claim.finalize_params.as_ref() else { return Ok(false) };
        let request = TransactionRequest::default()
            .with_to(self.inner.target)
            .with_input(is_withdrawal_finalized_calldata(params));
        let output = self.inner.provider.call(request).await?;
        Ok(decode_is_withdrawal_finalized(&output)?)
    }
}
