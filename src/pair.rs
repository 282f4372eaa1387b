// src/pair.rs
//
// Pair-context construction. Input checks and network selection run eagerly
// in `UniswapPair::new`; token metadata is fetched by `create_factory`.

use crate::address::{self, AddressError, ChecksumAddress};
use crate::chain::ChainId;
use crate::error::UniswapError;
use crate::metrics;
use crate::network::{NetworkAccessResolver, NetworkAccessSpec, NetworkHandle, NetworkProvider};
use crate::settings::{Settings, TradeSettings};
use crate::token_metadata::{TokenDescriptor, TokenMetadataResolver};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PairState {
    Unvalidated,
    AddressesValidated,
    NetworkResolved,
    TokensResolved,
    Ready,
}

impl fmt::Display for PairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PairState::Unvalidated => "unvalidated",
            PairState::AddressesValidated => "addresses validated",
            PairState::NetworkResolved => "network resolved",
            PairState::TokensResolved => "tokens resolved",
            PairState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Raw caller input. Several network-access fields may be set at once; the
/// most specific one wins (see [`NetworkAccessSpec::select`]).
#[derive(Debug, Clone, Default)]
pub struct PairOptions {
    pub from_token_contract_address: Option<String>,
    pub to_token_contract_address: Option<String>,
    pub owner_address: Option<String>,
    pub chain_id: Option<u64>,
    pub provider_url: Option<String>,
    pub ethereum_provider: Option<Arc<dyn NetworkProvider>>,
    pub settings: Option<TradeSettings>,
}

impl PairOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(mut self, address: impl Into<String>) -> Self {
        self.from_token_contract_address = Some(address.into());
        self
    }

    pub fn to_token(mut self, address: impl Into<String>) -> Self {
        self.to_token_contract_address = Some(address.into());
        self
    }

    pub fn owner(mut self, address: impl Into<String>) -> Self {
        self.owner_address = Some(address.into());
        self
    }

    pub fn chain_id(mut self, chain_id: impl Into<u64>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    pub fn provider_url(mut self, url: impl Into<String>) -> Self {
        self.provider_url = Some(url.into());
        self
    }

    pub fn ethereum_provider(mut self, provider: Arc<dyn NetworkProvider>) -> Self {
        self.ethereum_provider = Some(provider);
        self
    }

    pub fn settings(mut self, settings: TradeSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct PairAddresses {
    from_token: ChecksumAddress,
    to_token: ChecksumAddress,
    owner: ChecksumAddress,
}

#[derive(Debug)]
struct AccessInputs {
    chain_id: Option<u64>,
    provider_url: Option<String>,
    ethereum_provider: Option<Arc<dyn NetworkProvider>>,
}

enum Stage {
    Unvalidated(PairOptions),
    AddressesValidated {
        addresses: PairAddresses,
        access: AccessInputs,
        settings: Option<TradeSettings>,
    },
    NetworkResolved {
        addresses: PairAddresses,
        network: NetworkHandle,
        settings: Option<TradeSettings>,
    },
    TokensResolved {
        addresses: PairAddresses,
        network: NetworkHandle,
        settings: Option<TradeSettings>,
        tokens: HashMap<ChecksumAddress, TokenDescriptor>,
    },
    Ready(PairFactoryContext),
}

impl Stage {
    fn state(&self) -> PairState {
        match self {
            Stage::Unvalidated(_) => PairState::Unvalidated,
            Stage::AddressesValidated { .. } => PairState::AddressesValidated,
            Stage::NetworkResolved { .. } => PairState::NetworkResolved,
            Stage::TokensResolved { .. } => PairState::TokensResolved,
            Stage::Ready(_) => PairState::Ready,
        }
    }
}

fn invalid_state(expected: PairState, actual: PairState) -> UniswapError {
    error!(
        "Pair builder transition out of order: expected {}, found {}",
        expected, actual
    );
    UniswapError::InvalidState { expected, actual }
}

/// Validates one address field. Empty strings count as absent.
fn check_address(
    raw: Option<&str>,
    required: UniswapError,
    invalid: impl FnOnce(String, AddressError) -> UniswapError,
) -> Result<ChecksumAddress, UniswapError> {
    match raw.filter(|value| !value.is_empty()) {
        None => Err(required),
        Some(value) => address::validate(value).map_err(|reason| invalid(value.to_string(), reason)),
    }
}

/// Builder for a [`PairFactoryContext`].
///
/// ```no_run
/// # async fn run() -> Result<(), uniswap_pair_sdk::UniswapError> {
/// use uniswap_pair_sdk::{ChainId, PairOptions, UniswapPair};
///
/// let pair = UniswapPair::new(
///     PairOptions::new()
///         .from_token("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
///         .to_token("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")
///         .owner("0xB1E6079212888f0bE0cf55874B2EB9d7a5e02cD9")
///         .chain_id(ChainId::Mainnet),
/// )?;
/// let context = pair.create_factory().await?;
/// println!("{} -> {}", context.from_token().symbol, context.to_token().symbol);
/// # Ok(())
/// # }
/// ```
pub struct UniswapPair {
    stage: Stage,
    network_resolver: NetworkAccessResolver,
    token_resolver: TokenMetadataResolver,
}

impl UniswapPair {
    /// Validates the three addresses and selects network access. Makes no
    /// RPC call; fails on the first bad input.
    pub fn new(options: PairOptions) -> Result<Self, UniswapError> {
        Self::with_resolvers(
            options,
            NetworkAccessResolver::default(),
            TokenMetadataResolver::default(),
        )
    }

    /// Like [`UniswapPair::new`], with endpoint overrides, fetch strategy and
    /// trade defaults taken from `settings`.
    pub fn from_settings(mut options: PairOptions, settings: &Settings) -> Result<Self, UniswapError> {
        let network_resolver = NetworkAccessResolver::default()
            .with_endpoint_overrides(settings.rpc.endpoint_overrides()?);
        let token_resolver = TokenMetadataResolver::from_settings(&settings.tokens)?;
        if options.settings.is_none() {
            options.settings = Some(settings.trade.clone());
        }
        Self::with_resolvers(options, network_resolver, token_resolver)
    }

    pub fn with_resolvers(
        options: PairOptions,
        network_resolver: NetworkAccessResolver,
        token_resolver: TokenMetadataResolver,
    ) -> Result<Self, UniswapError> {
        let pair = Self {
            stage: Stage::Unvalidated(options),
            network_resolver,
            token_resolver,
        };

        pair.validate_addresses()
            .and_then(Self::resolve_network)
            .map_err(|e| {
                warn!("Rejected pair input: {}", e);
                metrics::increment_pair_resolution(e.code().as_str());
                e
            })
    }

    pub fn state(&self) -> PairState {
        self.stage.state()
    }

    /// The selected network, once resolved.
    pub fn network(&self) -> Option<&NetworkHandle> {
        match &self.stage {
            Stage::NetworkResolved { network, .. } | Stage::TokensResolved { network, .. } => {
                Some(network)
            }
            Stage::Ready(context) => Some(context.network()),
            _ => None,
        }
    }

    /// Fetches both tokens and assembles the context. Consumes the builder, so
    /// a failed or cancelled attempt cannot be resumed.
    pub async fn create_factory(self) -> Result<PairFactoryContext, UniswapError> {
        let result = self.run_to_completion().await;
        match &result {
            Ok(context) => {
                info!(
                    "Resolved pair {} -> {} on {}",
                    context.from_token.symbol, context.to_token.symbol, context.chain_id
                );
                metrics::increment_pair_resolution("ok");
            }
            Err(e) => {
                warn!("Pair resolution failed: {}", e);
                metrics::increment_pair_resolution(e.code().as_str());
            }
        }
        result
    }

    async fn run_to_completion(self) -> Result<PairFactoryContext, UniswapError> {
        self.fetch_tokens().await?.finalize().await?.into_context()
    }

    fn validate_addresses(mut self) -> Result<Self, UniswapError> {
        let options = match self.stage {
            Stage::Unvalidated(options) => options,
            other => return Err(invalid_state(PairState::Unvalidated, other.state())),
        };

        let from_token = check_address(
            options.from_token_contract_address.as_deref(),
            UniswapError::FromTokenAddressRequired,
            |address, reason| UniswapError::FromTokenAddressInvalid { address, reason },
        )?;
        let to_token = check_address(
            options.to_token_contract_address.as_deref(),
            UniswapError::ToTokenAddressRequired,
            |address, reason| UniswapError::ToTokenAddressInvalid { address, reason },
        )?;
        let owner = check_address(
            options.owner_address.as_deref(),
            UniswapError::OwnerAddressRequired,
            |address, reason| UniswapError::OwnerAddressInvalid { address, reason },
        )?;

        self.stage = Stage::AddressesValidated {
            addresses: PairAddresses {
                from_token,
                to_token,
                owner,
            },
            access: AccessInputs {
                chain_id: options.chain_id,
                provider_url: options.provider_url,
                ethereum_provider: options.ethereum_provider,
            },
            settings: options.settings,
        };
        Ok(self)
    }

    fn resolve_network(mut self) -> Result<Self, UniswapError> {
        let (addresses, access, settings) = match self.stage {
            Stage::AddressesValidated {
                addresses,
                access,
                settings,
            } => (addresses, access, settings),
            other => return Err(invalid_state(PairState::AddressesValidated, other.state())),
        };

        let spec = NetworkAccessSpec::select(
            access.chain_id,
            access.provider_url.as_deref(),
            access.ethereum_provider,
        )?;
        let network = self.network_resolver.resolve(spec)?;

        self.stage = Stage::NetworkResolved {
            addresses,
            network,
            settings,
        };
        Ok(self)
    }

    async fn fetch_tokens(mut self) -> Result<Self, UniswapError> {
        let (addresses, network, settings) = match self.stage {
            Stage::NetworkResolved {
                addresses,
                network,
                settings,
            } => (addresses, network, settings),
            other => return Err(invalid_state(PairState::NetworkResolved, other.state())),
        };

        let tokens = self
            .token_resolver
            .fetch_all(&network, &[addresses.from_token, addresses.to_token])
            .await?;

        self.stage = Stage::TokensResolved {
            addresses,
            network,
            settings,
            tokens,
        };
        Ok(self)
    }

    async fn finalize(mut self) -> Result<Self, UniswapError> {
        let (addresses, network, settings, mut tokens) = match self.stage {
            Stage::TokensResolved {
                addresses,
                network,
                settings,
                tokens,
            } => (addresses, network, settings, tokens),
            other => return Err(invalid_state(PairState::TokensResolved, other.state())),
        };

        let chain_id = network.verify_chain_id().await?;

        let from_token = take_resolved(&mut tokens, addresses.from_token, "from")?;
        let to_token = match tokens.remove(&addresses.to_token) {
            Some(token) => token,
            // from and to may be the same contract
            None if addresses.to_token == addresses.from_token => from_token.clone(),
            None => return Err(missing_token(addresses.to_token, "to")),
        };

        self.stage = Stage::Ready(PairFactoryContext {
            from_token,
            to_token,
            owner_address: addresses.owner,
            chain_id,
            settings: settings.unwrap_or_default(),
            network,
        });
        Ok(self)
    }

    fn into_context(self) -> Result<PairFactoryContext, UniswapError> {
        match self.stage {
            Stage::Ready(context) => Ok(context),
            other => Err(invalid_state(PairState::Ready, other.state())),
        }
    }
}

fn take_resolved(
    tokens: &mut HashMap<ChecksumAddress, TokenDescriptor>,
    address: ChecksumAddress,
    side: &str,
) -> Result<TokenDescriptor, UniswapError> {
    tokens.remove(&address).ok_or_else(|| missing_token(address, side))
}

fn missing_token(address: ChecksumAddress, side: &str) -> UniswapError {
    let message = format!("{} token {} missing from fetched metadata", side, address);
    error!("{}", message);
    UniswapError::InvalidPairContext(message)
}

/// Everything a trade factory needs about one pair. Immutable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairFactoryContext {
    from_token: TokenDescriptor,
    to_token: TokenDescriptor,
    owner_address: ChecksumAddress,
    chain_id: ChainId,
    settings: TradeSettings,
    network: NetworkHandle,
}

impl PairFactoryContext {
    pub fn from_token(&self) -> &TokenDescriptor {
        &self.from_token
    }

    pub fn to_token(&self) -> &TokenDescriptor {
        &self.to_token
    }

    pub fn owner_address(&self) -> ChecksumAddress {
        self.owner_address
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn settings(&self) -> &TradeSettings {
        &self.settings
    }

    pub fn network(&self) -> &NetworkHandle {
        &self.network
    }
}
