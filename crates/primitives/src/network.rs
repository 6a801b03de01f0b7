use core::str::FromStr;

/// The network a store instance is bound to. Entries of different networks never mix.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Ethereum mainnet and its rollup.
    #[default]
    Mainnet,
    /// Sepolia and the rollup testnet.
    Testnet,
}

impl Network {
    /// The chain id of the base chain.
    pub const fn l1_chain_id(&self) -> u64 {
        match self {
            Self::Mainnet => 1,
            Self::Testnet => 11_155_111,
        }
    }

    /// The chain id of the rollup.
    pub const fn l2_chain_id(&self) -> u64 {
        match self {
            Self::Mainnet => 534_352,
            Self::Testnet => 534_351,
        }
    }

    /// The key under which the store snapshot for this network is persisted.
    pub const fn storage_key(&self) -> &'static str {
        match self {
            Self::Mainnet => "bridge-history/mainnet",
            Self::Testnet => "bridge-history/testnet",
        }
    }

    /// Returns the network name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The provided string is not a known network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct NetworkParseError(String);

impl FromStr for Network {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" | "sepolia" => Ok(Self::Testnet),
            other => Err(NetworkParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_storage_keys_are_distinct() {
        assert_ne!(Network::Mainnet.storage_key(), Network::Testnet.storage_key());
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("Sepolia".parse::<Network>(), Ok(Network::Testnet));
        assert_eq!("mainnet".parse::<Network>(), Ok(Network::Mainnet));
        assert!("devnet".parse::<Network>().is_err());
    }
}
