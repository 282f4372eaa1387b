use crate::address::{self, ChecksumAddress};
use crate::error::UniswapError;
use crate::metrics;
use crate::multicall::{Call, CallResult, Multicall, MULTICALL3};
use crate::network::{NetworkHandle, NetworkProvider};
use crate::settings::{FetchStrategy, TokenFetch};
use crate::token_registry::TokenRegistry;
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes};
use futures::future::try_join_all;
use indexmap::IndexSet;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// On-chain identity of an ERC-20 token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub chain_id: u64,
    pub contract_address: ChecksumAddress,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

/// The three ERC-20 reads needed for a descriptor.
///
/// Calldata and return data are handled raw rather than through an `abigen!`
/// binding, whose `string` outputs would reject `bytes32` symbols and names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Erc20Read {
    Symbol,
    Decimals,
    Name,
}

impl Erc20Read {
    const ALL: [Erc20Read; 3] = [Erc20Read::Symbol, Erc20Read::Decimals, Erc20Read::Name];

    fn signature(self) -> &'static str {
        match self {
            Erc20Read::Symbol => "symbol()",
            Erc20Read::Decimals => "decimals()",
            Erc20Read::Name => "name()",
        }
    }

    fn calldata(self) -> Bytes {
        Bytes::from(ethers::utils::id(self.signature()).to_vec())
    }
}

/// Raw return data for one token; `None` where the read failed.
#[derive(Debug, Default)]
struct RawMetadata {
    symbol: Option<Bytes>,
    decimals: Option<Bytes>,
    name: Option<Bytes>,
}

/// Fetches [`TokenDescriptor`]s for a set of addresses.
#[derive(Debug, Clone)]
pub struct TokenMetadataResolver {
    strategy: FetchStrategy,
    multicall_address: Address,
    batch_size: usize,
    registry: Option<Arc<TokenRegistry>>,
}

impl Default for TokenMetadataResolver {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::Multicall,
            multicall_address: MULTICALL3,
            batch_size: TokenFetch::default().multicall_batch_size,
            registry: Some(Arc::new(TokenRegistry::well_known())),
        }
    }
}

impl TokenMetadataResolver {
    pub fn from_settings(settings: &TokenFetch) -> Result<Self, UniswapError> {
        let multicall_address = address::validate(&settings.multicall_address).map_err(|e| {
            UniswapError::InvalidConfiguration(format!(
                "tokens.multicall_address `{}`: {}",
                settings.multicall_address, e
            ))
        })?;

        Ok(Self {
            strategy: settings.strategy,
            multicall_address: multicall_address.as_address(),
            batch_size: settings.multicall_batch_size,
            registry: settings
                .use_registry
                .then(|| Arc::new(TokenRegistry::well_known())),
        })
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_registry(mut self, registry: Option<Arc<TokenRegistry>>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    /// Resolves every address in `addresses` or fails on the first one that is
    /// not an ERC-20 contract. Duplicates are fetched once.
    pub async fn fetch_all(
        &self,
        network: &NetworkHandle,
        addresses: &[ChecksumAddress],
    ) -> Result<HashMap<ChecksumAddress, TokenDescriptor>, UniswapError> {
        let unique: IndexSet<ChecksumAddress> = addresses.iter().copied().collect();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let chain_id = network.chain_id().await?;

        let mut descriptors = HashMap::with_capacity(unique.len());
        let mut to_fetch = Vec::with_capacity(unique.len());
        for address in unique {
            match self
                .registry
                .as_ref()
                .and_then(|registry| registry.lookup(chain_id, &address))
            {
                Some(known) => {
                    descriptors.insert(address, known.clone());
                }
                None => to_fetch.push(address),
            }
        }

        if !descriptors.is_empty() {
            debug!("Served {} tokens from the registry", descriptors.len());
            metrics::increment_registry_hits(descriptors.len() as u64);
        }
        if to_fetch.is_empty() {
            return Ok(descriptors);
        }

        info!(
            "Fetching metadata for {} tokens on chain {} ({:?})",
            to_fetch.len(),
            chain_id,
            self.strategy
        );

        let raw = match self.strategy {
            FetchStrategy::Multicall => self.fetch_multicall(network, &to_fetch).await?,
            FetchStrategy::Individual => fetch_individual(network.provider(), &to_fetch).await?,
        };

        for (address, metadata) in to_fetch.into_iter().zip(raw) {
            let descriptor = decode_descriptor(chain_id, address, metadata)?;
            descriptors.insert(address, descriptor);
        }

        Ok(descriptors)
    }

    async fn fetch_multicall(
        &self,
        network: &NetworkHandle,
        tokens: &[ChecksumAddress],
    ) -> Result<Vec<RawMetadata>, UniswapError> {
        let multicall = Multicall::new(
            network.provider().clone(),
            self.multicall_address,
            self.batch_size,
        );

        let mut calls = Vec::with_capacity(tokens.len() * Erc20Read::ALL.len());
        for token in tokens {
            for read in Erc20Read::ALL {
                calls.push(Call {
                    target: token.as_address(),
                    call_data: read.calldata(),
                });
            }
        }

        let results = multicall.run(calls).await?;

        // Results come back as (symbol, decimals, name) triples
        Ok(results
            .chunks(Erc20Read::ALL.len())
            .map(|triple| {
                let mut fields = triple.iter().map(successful_data);
                RawMetadata {
                    symbol: fields.next().flatten(),
                    decimals: fields.next().flatten(),
                    name: fields.next().flatten(),
                }
            })
            .collect())
    }
}

fn successful_data(result: &CallResult) -> Option<Bytes> {
    result.success.then(|| result.return_data.clone())
}

async fn fetch_individual(
    provider: &Arc<dyn NetworkProvider>,
    tokens: &[ChecksumAddress],
) -> Result<Vec<RawMetadata>, UniswapError> {
    let fetches = tokens.iter().map(|token| async move {
        let (symbol, decimals, name) = futures::try_join!(
            read_erc20(provider, *token, Erc20Read::Symbol),
            read_erc20(provider, *token, Erc20Read::Decimals),
            read_erc20(provider, *token, Erc20Read::Name),
        )?;
        Ok::<_, UniswapError>(RawMetadata {
            symbol: Some(symbol),
            decimals: Some(decimals),
            name: Some(name),
        })
    });
    try_join_all(fetches).await
}

async fn read_erc20(
    provider: &Arc<dyn NetworkProvider>,
    token: ChecksumAddress,
    read: Erc20Read,
) -> Result<Bytes, UniswapError> {
    metrics::increment_rpc_call("token_metadata", "eth_call");
    provider
        .call(token.as_address(), read.calldata())
        .await
        .map_err(|source| UniswapError::transport("token metadata fetch", token, source))
}

fn decode_descriptor(
    chain_id: u64,
    address: ChecksumAddress,
    raw: RawMetadata,
) -> Result<TokenDescriptor, UniswapError> {
    let symbol = raw.symbol.as_deref().and_then(decode_text);
    let decimals = raw.decimals.as_deref().and_then(decode_decimals);
    let name = raw.name.as_deref().and_then(decode_text);

    match (symbol, decimals, name) {
        (Some(symbol), Some(decimals), Some(name)) => Ok(TokenDescriptor {
            chain_id,
            contract_address: address,
            decimals,
            symbol,
            name,
        }),
        _ => {
            warn!("No ERC-20 metadata at {} on chain {}", address, chain_id);
            Err(UniswapError::TokenNotFound(address))
        }
    }
}

/// Decodes an ABI `string`, falling back to a zero-padded `bytes32` (MKR, SAI).
fn decode_text(data: &[u8]) -> Option<String> {
    if let Ok(mut tokens) = abi::decode(&[ParamType::String], data) {
        if let Some(Token::String(text)) = tokens.pop() {
            return Some(text);
        }
    }

    if data.len() == 32 {
        let end = data.iter().rposition(|b| *b != 0)? + 1;
        return String::from_utf8(data[..end].to_vec()).ok();
    }

    None
}

fn decode_decimals(data: &[u8]) -> Option<u8> {
    abi::decode(&[ParamType::Uint(8)], data)
        .ok()
        .and_then(|mut tokens| tokens.pop())
        .and_then(Token::into_uint)
        .and_then(|u| u.try_into().ok())
}
