//! 静态链表：链 ID、原生代币、精度与默认 RPC。

use std::fmt;
use std::str::FromStr;

use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize, Serializer};

/// 所有原生代币均为 18 位精度。
pub const NATIVE_TOKEN_DECIMALS: u32 = 18;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Chain {
    Ethereum,
    Optimism,
    Bsc,
    Gnosis,
    Polygon,
    Fantom,
    Arbitrum,
    Avalanche,
    ZkSync,
    ZkEvm,
}

impl Chain {
    pub const ALL: [Chain; 10] = [
        Chain::Ethereum,
        Chain::Optimism,
        Chain::Bsc,
        Chain::Gnosis,
        Chain::Polygon,
        Chain::Fantom,
        Chain::Arbitrum,
        Chain::Avalanche,
        Chain::ZkSync,
        Chain::ZkEvm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Chain::Ethereum => "Ethereum",
            Chain::Optimism => "Optimism",
            Chain::Bsc => "BSC",
            Chain::Gnosis => "Gnosis",
            Chain::Polygon => "Polygon",
            Chain::Fantom => "Fantom",
            Chain::Arbitrum => "Arbitrum",
            Chain::Avalanche => "Avalanche",
            Chain::ZkSync => "zkSync",
            Chain::ZkEvm => "zkEVM",
        }
    }

    pub fn chain_id(self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Optimism => 10,
            Chain::Bsc => 56,
            Chain::Gnosis => 100,
            Chain::Polygon => 137,
            Chain::Fantom => 250,
            Chain::Arbitrum => 42_161,
            Chain::Avalanche => 43_114,
            Chain::ZkSync => 324,
            Chain::ZkEvm => 1_101,
        }
    }

    pub fn from_chain_id(id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|chain| chain.chain_id() == id)
    }

    pub fn native_token(self) -> &'static str {
        match self {
            Chain::Bsc => "BNB",
            Chain::Gnosis => "xDAI",
            Chain::Polygon => "MATIC",
            Chain::Fantom => "FTM",
            Chain::Avalanche => "AVAX",
            Chain::Ethereum
            | Chain::Optimism
            | Chain::Arbitrum
            | Chain::ZkSync
            | Chain::ZkEvm => "ETH",
        }
    }

    pub fn decimals(self) -> u32 {
        NATIVE_TOKEN_DECIMALS
    }

    /// 金额随机取整时保留的最少小数位，越贵的代币保留越多。
    pub fn valuable_decimals(self) -> u32 {
        match self {
            Chain::Ethereum
            | Chain::Optimism
            | Chain::Arbitrum
            | Chain::ZkSync
            | Chain::ZkEvm => 4,
            Chain::Bsc => 3,
            Chain::Avalanche => 2,
            Chain::Gnosis | Chain::Polygon | Chain::Fantom => 1,
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Chain::Ethereum => "https://eth.llamarpc.com",
            Chain::Optimism => "https://rpc.ankr.com/optimism",
            Chain::Bsc => "https://rpc.ankr.com/bsc",
            Chain::Gnosis => "https://rpc.gnosischain.com",
            Chain::Polygon => "https://polygon.llamarpc.com",
            Chain::Fantom => "https://rpc.fantom.network",
            Chain::Arbitrum => "https://arb1.arbitrum.io/rpc",
            Chain::Avalanche => "https://avalanche-c-chain.publicnode.com",
            Chain::ZkSync => "https://mainnet.era.zksync.io",
            Chain::ZkEvm => "https://rpc.ankr.com/polygon_zkevm",
        }
    }

    pub fn explorer_url(self) -> &'static str {
        match self {
            Chain::Ethereum => "https://etherscan.io",
            Chain::Optimism => "https://optimistic.etherscan.io",
            Chain::Bsc => "https://bscscan.com",
            Chain::Gnosis => "https://gnosisscan.io",
            Chain::Polygon => "https://polygonscan.com",
            Chain::Fantom => "https://ftmscan.com",
            Chain::Arbitrum => "https://arbiscan.io",
            Chain::Avalanche => "https://snowtrace.io",
            Chain::ZkSync => "https://explorer.zksync.io",
            Chain::ZkEvm => "https://zkevm.polygonscan.com",
        }
    }

    pub fn tx_link(self, tx_hash: impl fmt::Display) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url())
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chain `{0}`")]
pub struct UnknownChain(pub String);

impl FromStr for Chain {
    type Err = UnknownChain;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|chain| chain.name().eq_ignore_ascii_case(needle))
            .or_else(|| needle.parse::<u64>().ok().and_then(Self::from_chain_id))
            .ok_or_else(|| UnknownChain(value.to_string()))
    }
}

impl<'de> Deserialize<'de> for Chain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

impl Serialize for Chain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}
