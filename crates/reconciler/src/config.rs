use alloy_primitives::U256;
use bridge_history_primitives::{EtaConfig, Network};
use core::str::FromStr;
use std::time::Duration;

/// The age after which an unconfirmed optimistic transaction is assumed failed.
pub const DEFAULT_UNCONFIRMED_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// The default interval between claim outcome polls.
pub const DEFAULT_CLAIM_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// The default interval between history passes.
pub const DEFAULT_HISTORY_INTERVAL: Duration = Duration::from_secs(5);

/// The default interval between withdrawal status refreshes.
pub const DEFAULT_WITHDRAWAL_STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Native withdrawals below this amount (0.01 ETH) are not swept automatically and must be
/// claimed manually on a direct-finalization bridge.
pub const MANUAL_CLAIM_THRESHOLD: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

/// The claim flow of the bridge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ClaimVariant {
    /// Withdrawals are relayed with a batch proof once their batch is finalized.
    #[default]
    #[display("batch")]
    Batch,
    /// Withdrawals are finalized directly on the bridge once verified on L2.
    #[display("direct")]
    Direct,
}

impl FromStr for ClaimVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch" => Ok(Self::Batch),
            "direct" => Ok(Self::Direct),
            other => Err(format!("unknown claim variant: {other}")),
        }
    }
}

/// The configuration of the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// The network the reconciler starts on.
    pub network: Network,
    /// The estimated-time engine configuration.
    pub eta: EtaConfig,
    /// The age after which an unconfirmed optimistic transaction is assumed failed.
    pub unconfirmed_timeout: Duration,
    /// The claim flow of the bridge.
    pub claim_variant: ClaimVariant,
    /// The interval between claim outcome polls.
    pub claim_poll_interval: Duration,
    /// The interval between history passes of the service.
    pub history_interval: Duration,
    /// The interval between withdrawal status refreshes of the service.
    pub withdrawal_status_interval: Duration,
    /// The native amount below which a direct-finalization withdrawal requires a manual claim.
    pub manual_claim_threshold: U256,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            eta: EtaConfig::default(),
            unconfirmed_timeout: DEFAULT_UNCONFIRMED_TIMEOUT,
            claim_variant: ClaimVariant::default(),
            claim_poll_interval: DEFAULT_CLAIM_POLL_INTERVAL,
            history_interval: DEFAULT_HISTORY_INTERVAL,
            withdrawal_status_interval: DEFAULT_WITHDRAWAL_STATUS_INTERVAL,
            manual_claim_threshold: MANUAL_CLAIM_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_claim_threshold_is_one_hundredth_ether() {
        assert_eq!(MANUAL_CLAIM_THRESHOLD, U256::from(10).pow(U256::from(16)));
    }

    #[test]
    fn test_claim_variant_from_str() {
        assert_eq!("batch".parse::<ClaimVariant>(), Ok(ClaimVariant::Batch));
        assert_eq!("direct".parse::<ClaimVariant>(), Ok(ClaimVariant::Direct));
        assert!("proof".parse::<ClaimVariant>().is_err());
        assert_eq!(ClaimVariant::Direct.to_string(), "direct");
    }
}
