//! Merge of the transaction sources into a wallet's ordered page.

use alloy_primitives::TxHash;
use bridge_history_primitives::{BridgeTransaction, OrderedIndexEntry, TxPosition};
use std::collections::HashMap;

/// A transaction tagged with the source it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcedTransaction {
    /// Indexed by the history backend.
    Backend(BridgeTransaction),
    /// Locally detected failure.
    Abnormal(BridgeTransaction),
    /// Optimistically recorded on submission.
    Frontend(BridgeTransaction),
}

impl SourcedTransaction {
    /// Returns the transaction.
    pub const fn transaction(&self) -> &BridgeTransaction {
        match self {
            Self::Backend(tx) | Self::Abnormal(tx) | Self::Frontend(tx) => tx,
        }
    }

    /// Consumes the source, returning the transaction.
    pub fn into_transaction(self) -> BridgeTransaction {
        match self {
            Self::Backend(tx) | Self::Abnormal(tx) | Self::Frontend(tx) => tx,
        }
    }

    /// Returns the log position matching the source.
    pub const fn position(&self) -> TxPosition {
        match self {
            Self::Backend(_) => TxPosition::Backend,
            Self::Abnormal(_) => TxPosition::Abnormal,
            Self::Frontend(_) => TxPosition::Frontend,
        }
    }

    /// The merge priority of the source, higher wins.
    const fn priority(&self) -> u8 {
        match self {
            Self::Backend(_) => 2,
            Self::Abnormal(_) => 1,
            Self::Frontend(_) => 0,
        }
    }
}

/// The result of a merge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Merged {
    /// The resolved transactions in log order.
    pub transactions: Vec<(OrderedIndexEntry, SourcedTransaction)>,
    /// The logged hashes no source resolved.
    pub unresolved: Vec<TxHash>,
}

/// Merges the sources into the order of `log`.
///
/// For a hash provided by several sources the backend record wins over the abnormal record,
/// which wins over the optimistic record. Hashes of the log no source resolves are reported as
/// unresolved and left out of the result.
pub fn merge(
    log: &[OrderedIndexEntry],
    sources: impl IntoIterator<Item = SourcedTransaction>,
) -> Merged {
    let mut resolved: HashMap<TxHash, SourcedTransaction> = HashMap::new();
    for source in sources {
        let hash = source.transaction().hash;
        match resolved.get(&hash) {
            Some(existing) if existing.priority() >= source.priority() => {}
            _ => {
                resolved.insert(hash, source);
            }
        }
    }

    let mut merged = Merged::default();
    for entry in log {
        match resolved.remove(&entry.hash) {
            Some(source) => merged.transactions.push((*entry, source)),
            None => merged.unresolved.push(entry.hash),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use bridge_history_primitives::{TokenInfo, TxDirection};

    fn tx(n: u8, amount: u64) -> BridgeTransaction {
        BridgeTransaction::submitted(
            TxHash::with_last_byte(n),
            TxDirection::Deposit,
            U256::from(amount),
            TokenInfo::native(),
            n as u64,
        )
    }

    fn entry(n: u8) -> OrderedIndexEntry {
        OrderedIndexEntry::new(TxHash::with_last_byte(n), n as u64, TxPosition::Frontend, TxDirection::Deposit)
    }

    #[test]
    fn test_backend_wins_over_other_sources() {
        let log = [entry(1)];
        let merged = merge(
            &log,
            [
                SourcedTransaction::Frontend(tx(1, 1)),
                SourcedTransaction::Backend(tx(1, 3)),
                SourcedTransaction::Abnormal(tx(1, 2)),
            ],
        );

        assert_eq!(merged.transactions.len(), 1);
        assert_eq!(merged.transactions[0].1, SourcedTransaction::Backend(tx(1, 3)));
    }

    #[test]
    fn test_abnormal_wins_over_frontend() {
        let merged = merge(
            &[entry(1)],
            [SourcedTransaction::Abnormal(tx(1, 2)), SourcedTransaction::Frontend(tx(1, 1))],
        );
        assert_eq!(merged.transactions[0].1.position(), TxPosition::Abnormal);
    }

    #[test]
    fn test_log_order_and_unresolved() {
        let log = [entry(3), entry(2), entry(1)];
        let merged = merge(
            &log,
            [
                SourcedTransaction::Backend(tx(1, 1)),
                SourcedTransaction::Frontend(tx(3, 3)),
                SourcedTransaction::Frontend(tx(9, 9)),
            ],
        );

        let hashes: Vec<_> = merged.transactions.iter().map(|(e, _)| e.hash).collect();
        assert_eq!(hashes, vec![TxHash::with_last_byte(3), TxHash::with_last_byte(1)]);
        assert_eq!(merged.unresolved, vec![TxHash::with_last_byte(2)]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let log = [entry(2), entry(1)];
        let sources =
            vec![SourcedTransaction::Frontend(tx(1, 1)), SourcedTransaction::Backend(tx(2, 2))];

        let first = merge(&log, sources.clone());
        let second = merge(&log, sources);
        assert_eq!(first, second);
    }
}
