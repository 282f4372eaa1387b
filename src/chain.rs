// src/chain.rs

use crate::error::UniswapError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Public Infura project id used for the managed default endpoints.
/// Production deployments should override endpoints through `Settings.rpc`.
const INFURA_PROJECT_ID: &str = "9aa3d95b3bc440fa88ea12eaa4456161";

/// Networks a pair can be resolved on. Anything else is rejected before a
/// connection is attempted.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u64", try_from = "u64")]
pub enum ChainId {
    /// Ethereum mainnet (chain ID 1).
    Mainnet = 1,
    /// Ropsten testnet (chain ID 3).
    Ropsten = 3,
    /// Rinkeby testnet (chain ID 4).
    Rinkeby = 4,
    /// Görli testnet (chain ID 5).
    Goerli = 5,
    /// Kovan testnet (chain ID 42).
    Kovan = 42,
}

impl ChainId {
    /// Return all supported [`ChainId`] variants.
    pub fn variants() -> &'static [ChainId] {
        &[
            ChainId::Mainnet,
            ChainId::Ropsten,
            ChainId::Rinkeby,
            ChainId::Goerli,
            ChainId::Kovan,
        ]
    }

    pub fn id(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            ChainId::Mainnet => "mainnet",
            ChainId::Ropsten => "ropsten",
            ChainId::Rinkeby => "rinkeby",
            ChainId::Goerli => "goerli",
            ChainId::Kovan => "kovan",
        }
    }

    /// Managed JSON-RPC endpoint used when only a chain id is supplied.
    pub fn default_rpc_url(self) -> String {
        format!("https://{}.infura.io/v3/{}", self.name(), INFURA_PROJECT_ID)
    }

    pub fn is_supported(id: u64) -> bool {
        Self::try_from(id).is_ok()
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

impl From<ChainId> for u64 {
    fn from(chain: ChainId) -> Self {
        chain.id()
    }
}

impl TryFrom<u64> for ChainId {
    type Error = UniswapError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ChainId::Mainnet),
            3 => Ok(ChainId::Ropsten),
            4 => Ok(ChainId::Rinkeby),
            5 => Ok(ChainId::Goerli),
            42 => Ok(ChainId::Kovan),
            other => Err(UniswapError::ChainNotSupported(other)),
        }
    }
}

/// Accepts either the network name (`"goerli"`) or the numeric id (`"5"`).
impl FromStr for ChainId {
    type Err = UniswapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<u64>() {
            return Self::try_from(id);
        }
        let lower = trimmed.to_lowercase();
        Self::variants()
            .iter()
            .copied()
            .find(|chain| chain.name() == lower || (lower == "görli" && *chain == ChainId::Goerli))
            .ok_or(UniswapError::UnknownChainName(trimmed.to_string()))
    }
}
