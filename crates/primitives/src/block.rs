use crate::TxDirection;

/// The current block numbers of both chains.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ChainHeights {
    /// The latest L1 block number.
    pub l1: u64,
    /// The latest L2 block number.
    pub l2: u64,
}

impl ChainHeights {
    /// Returns a new instance of [`ChainHeights`].
    pub const fn new(l1: u64, l2: u64) -> Self {
        Self { l1, l2 }
    }

    /// Returns the `(origin, destination)` block numbers for a transfer in the given direction.
    pub const fn origin_and_destination(&self, direction: TxDirection) -> (u64, u64) {
        match direction {
            TxDirection::Deposit => (self.l1, self.l2),
            TxDirection::Withdraw => (self.l2, self.l1),
        }
    }
}
