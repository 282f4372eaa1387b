//! # Uniswap Pair SDK
//!
//! Resolves "which two tokens, on which chain, for which owner" into a validated
//! [`PairFactoryContext`] that trade-quoting and execution code can consume
//! without re-checking its inputs.
//!
//! ## Overview
//!
//! - **Addresses**: checksum validation and normalization of every caller-supplied address
//! - **Network access**: one of chain id, provider url or injected provider, picked by fixed priority
//! - **Token metadata**: symbol, name and decimals via Multicall3 or individual `eth_call`s
//! - **Pair context**: an explicit state machine from raw input to the finished context
//!
//! ## Architecture
//!
//! ### Input Layer
//! `UniswapPair::new` validates the from/to/owner addresses in a fixed order and selects
//! network access. It never touches the network, so bad input fails fast.
//!
//! ### Network Layer
//! [`NetworkProvider`] is the seam to the chain. `ethers` providers are adapted by
//! [`EthersProvider`]; wallets and tests can plug in their own.
//!
//! ### Metadata Layer
//! Well-known tokens come from a static registry. Everything else is read on-chain, batched
//! through Multicall3 by default.

// Core Types
/// Checksummed EVM addresses
pub mod address;
/// Supported chains and their default endpoints
pub mod chain;
/// Error taxonomy with stable codes
pub mod error;

// Network Layer
/// Network access selection and the provider seam
pub mod network;
/// Multicall3 batching
pub mod multicall;

// Metadata Layer
/// ERC-20 metadata resolution
pub mod token_metadata;
/// Static well-known token descriptors
pub mod token_registry;

// Pair Context
/// Pair-context state machine
pub mod pair;

// Infrastructure
/// Metrics (no-op unless the `observability` feature is enabled)
pub mod metrics;

// Settings & Configuration
pub mod settings;

// Re-exports for convenience
pub use address::{AddressError, ChecksumAddress};
pub use chain::ChainId;
pub use error::{ErrorCode, UniswapError};
pub use network::{
    EthersProvider, HttpConnector, NetworkAccessResolver, NetworkAccessSpec, NetworkHandle,
    NetworkProvider, ProviderConnector,
};
pub use pair::{PairFactoryContext, PairOptions, PairState, UniswapPair};
pub use settings::{Settings, TradeSettings};
pub use token_metadata::{TokenDescriptor, TokenMetadataResolver};
pub use token_registry::TokenRegistry;
