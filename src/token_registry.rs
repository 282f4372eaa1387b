// src/token_registry.rs

use crate::address::ChecksumAddress;
use crate::chain::ChainId;
use crate::token_metadata::TokenDescriptor;
use log::warn;
use std::collections::HashMap;

/// (chain, address, decimals, symbol, name)
type WellKnownToken = (ChainId, &'static str, u8, &'static str, &'static str);

const WELL_KNOWN: &[WellKnownToken] = &[
    (ChainId::Mainnet, "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18, "WETH", "Wrapped Ether"),
    (ChainId::Ropsten, "0xc778417E063141139Fce010982780140Aa0cD5Ab", 18, "WETH", "Wrapped Ether"),
    (ChainId::Rinkeby, "0xc778417E063141139Fce010982780140Aa0cD5Ab", 18, "WETH", "Wrapped Ether"),
    (ChainId::Goerli, "0xB4FBF271143F4FBf7B91A5ded31805e42b2208d6", 18, "WETH", "Wrapped Ether"),
    (ChainId::Kovan, "0xd0A1E359811322d97991E03f863a0C30C2cF029C", 18, "WETH", "Wrapped Ether"),
    (ChainId::Mainnet, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6, "USDC", "USD Coin"),
    (ChainId::Mainnet, "0x6B175474E89094C44Da98b954EedeAC495271d0F", 18, "DAI", "Dai Stablecoin"),
    (ChainId::Mainnet, "0xdAC17F958D2ee523a2206206994597C13D831ec7", 6, "USDT", "Tether USD"),
];

/// Static token metadata, consulted before going on-chain.
///
/// Keyed by numeric chain id so lookups work for any network, supported or
/// not.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<(u64, ChecksumAddress), TokenDescriptor>,
}

impl TokenRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrapped ether on every supported chain plus the main mainnet stablecoins.
    pub fn well_known() -> Self {
        let mut registry = Self::empty();
        for &(chain, raw, decimals, symbol, name) in WELL_KNOWN {
            match ChecksumAddress::parse(raw) {
                Ok(address) => registry.insert(TokenDescriptor {
                    chain_id: chain.id(),
                    contract_address: address,
                    decimals,
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                }),
                Err(e) => warn!("Skipping registry entry {} on {}: {}", raw, chain, e),
            }
        }
        registry
    }

    pub fn insert(&mut self, token: TokenDescriptor) {
        self.tokens
            .insert((token.chain_id, token.contract_address), token);
    }

    pub fn lookup(&self, chain_id: u64, address: &ChecksumAddress) -> Option<&TokenDescriptor> {
        self.tokens.get(&(chain_id, *address))
    }

    /// The wrapped native token of `chain`.
    pub fn weth(&self, chain: ChainId) -> Option<&TokenDescriptor> {
        self.tokens
            .values()
            .find(|token| token.chain_id == chain.id() && token.symbol == "WETH")
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
