//! The estimated-time engine converts block deltas into bounded wall-clock ETAs.

use alloy_primitives::TxHash;
use core::{fmt, str::FromStr};

/// Offsets above this bound are considered untrustworthy and reported as `0` ("estimating").
pub const ETA_VALIDITY_BOUND_MS: u64 = 30 * 60 * 1000;

/// Estimates when `tx_block` will be reached given the chain is at `current_block`.
///
/// Returns `None` once the target block is reached, in which case the ETA entry should be
/// dropped. Returns `Some(0)` if the offset exceeds [`ETA_VALIDITY_BOUND_MS`].
pub const fn estimate(
    now_ms: u64,
    current_block: u64,
    tx_block: u64,
    block_interval_ms: u64,
) -> Option<u64> {
    if tx_block <= current_block {
        return None
    }

    let offset = (tx_block - current_block).saturating_mul(block_interval_ms);
    if offset > ETA_VALIDITY_BOUND_MS {
        return Some(0)
    }
    Some(now_ms.saturating_add(offset))
}

/// The configuration of the estimated-time engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EtaConfig {
    /// The L1 block interval in milliseconds.
    pub l1_block_interval_ms: u64,
    /// The L2 block interval in milliseconds.
    pub l2_block_interval_ms: u64,
    /// The L1 blocks a deposit waits for before it is relayed to L2.
    pub deposit_confirmations: u64,
    /// The L2 blocks a withdrawal waits for before its origin leg is considered settled.
    pub withdraw_confirmations: u64,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            l1_block_interval_ms: 12_000,
            l2_block_interval_ms: 3_000,
            deposit_confirmations: 64,
            withdraw_confirmations: 0,
        }
    }
}

/// A scoped key of the estimated-time map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EtaKey {
    /// The origin leg of a transfer.
    From(TxHash),
    /// The destination leg of a transfer.
    To(TxHash),
    /// The claim of a withdrawal.
    Claim(TxHash),
}

impl EtaKey {
    /// The hash the key is scoped to.
    pub const fn hash(&self) -> TxHash {
        match self {
            Self::From(hash) | Self::To(hash) | Self::Claim(hash) => *hash,
        }
    }

    const fn scope(&self) -> &'static str {
        match self {
            Self::From(_) => "from",
            Self::To(_) => "to",
            Self::Claim(_) => "claim",
        }
    }
}

impl fmt::Display for EtaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope(), self.hash())
    }
}

/// The string is not a valid [`EtaKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid estimated time key: {0}")]
pub struct EtaKeyParseError(String);

impl FromStr for EtaKey {
    type Err = EtaKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || EtaKeyParseError(s.to_owned());
        let (scope, hash) = s.split_once(':').ok_or_else(err)?;
        let hash = hash.parse::<TxHash>().map_err(|_| err())?;
        match scope {
            "from" => Ok(Self::From(hash)),
            "to" => Ok(Self::To(hash)),
            "claim" => Ok(Self::Claim(hash)),
            _ => Err(err()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn test_estimate_within_bound() {
        assert_eq!(estimate(NOW, 100, 200, 12_000), Some(NOW + 1_200_000));
    }

    #[test]
    fn test_estimate_beyond_bound_is_estimating() {
        assert_eq!(estimate(NOW, 100, 100_000, 12_000), Some(0));
    }

    #[test]
    fn test_estimate_at_bound_is_valid() {
        // 150 blocks of 12s is exactly 30 minutes.
        assert_eq!(estimate(NOW, 0, 150, 12_000), Some(NOW + ETA_VALIDITY_BOUND_MS));
    }

    #[test]
    fn test_estimate_reached_target() {
        assert_eq!(estimate(NOW, 200, 200, 12_000), None);
        assert_eq!(estimate(NOW, 201, 200, 12_000), None);
    }

    #[test]
    fn test_eta_key_display_round_trip() {
        let hash = TxHash::with_last_byte(0xab);
        for key in [EtaKey::From(hash), EtaKey::To(hash), EtaKey::Claim(hash)] {
            assert_eq!(key.to_string().parse::<EtaKey>(), Ok(key));
        }
        assert!(EtaKey::Claim(hash).to_string().starts_with("claim:0x"));
        assert!("bogus:0x00".parse::<EtaKey>().is_err());
    }
}
