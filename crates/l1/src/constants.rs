use alloy_primitives::{address, Address};
use bridge_history_primitives::Network;

/// The address of the rollup contract on Ethereum mainnet.
pub const MAINNET_ROLLUP_CONTRACT_ADDRESS: Address =
    address!("0xa13BAF47339d63B743e7Da8741db5456DAc1E556");

/// The address of the rollup contract on Sepolia.
pub const TESTNET_ROLLUP_CONTRACT_ADDRESS: Address =
    address!("0x2D567EcE699Eabe5afCd141eDB7A4f2D0D6ce8a0");

/// The address of the L1 messenger on Ethereum mainnet.
pub const MAINNET_L1_MESSENGER_ADDRESS: Address =
    address!("0x6774Bcbd5ceCeF1336b5300fb5186a12DDD8b367");

/// The address of the L1 messenger on Sepolia.
pub const TESTNET_L1_MESSENGER_ADDRESS: Address =
    address!("0x50c7d3e7f7c656493D1D76aaa1a836CedfCBB16A");

/// The L1 contracts relevant to claims on a network.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct L1Contracts {
    /// The rollup contract exposing the last finalized batch index.
    pub rollup: Address,
    /// The messenger relaying proven L2 to L1 messages.
    pub messenger: Address,
}

impl L1Contracts {
    /// Returns the contracts deployed on the provided network.
    pub const fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self {
                rollup: MAINNET_ROLLUP_CONTRACT_ADDRESS,
                messenger: MAINNET_L1_MESSENGER_ADDRESS,
            },
            Network::Testnet => Self {
                rollup: TESTNET_ROLLUP_CONTRACT_ADDRESS,
                messenger: TESTNET_L1_MESSENGER_ADDRESS,
            },
        }
    }
}
