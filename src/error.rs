use crate::address::{AddressError, ChecksumAddress};
use crate::chain::ChainId;
use crate::pair::PairState;
use ethers::providers::ProviderError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable, machine-readable identifier for every [`UniswapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    FromTokenContractAddressRequired,
    FromTokenContractAddressNotValid,
    ToTokenContractAddressRequired,
    ToTokenContractAddressNotValid,
    EthereumAddressRequired,
    EthereumAddressNotValid,
    NetworkAccessRequired,
    ProviderUrlInvalid,
    ChainIdNotSupported,
    ChainIdMismatch,
    TokenContractNotFound,
    TransportFailure,
    InvalidPairContext,
    InvalidConfiguration,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FromTokenContractAddressRequired => "fromTokenContractAddressRequired",
            ErrorCode::FromTokenContractAddressNotValid => "fromTokenContractAddressNotValid",
            ErrorCode::ToTokenContractAddressRequired => "toTokenContractAddressRequired",
            ErrorCode::ToTokenContractAddressNotValid => "toTokenContractAddressNotValid",
            ErrorCode::EthereumAddressRequired => "ethereumAddressRequired",
            ErrorCode::EthereumAddressNotValid => "ethereumAddressNotValid",
            ErrorCode::NetworkAccessRequired => "networkAccessRequired",
            ErrorCode::ProviderUrlInvalid => "providerUrlInvalid",
            ErrorCode::ChainIdNotSupported => "chainIdNotSupported",
            ErrorCode::ChainIdMismatch => "chainIdMismatch",
            ErrorCode::TokenContractNotFound => "tokenContractNotFound",
            ErrorCode::TransportFailure => "transportFailure",
            ErrorCode::InvalidPairContext => "invalidPairContext",
            ErrorCode::InvalidConfiguration => "invalidConfiguration",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way resolving a pair context can fail.
///
/// All variants are terminal for the current resolution attempt; nothing here
/// is retried internally.
#[derive(Debug, Error)]
pub enum UniswapError {
    // Input errors, raised synchronously before any network access
    #[error("from token contract address is required")]
    FromTokenAddressRequired,
    #[error("from token contract address `{address}` is not valid: {reason}")]
    FromTokenAddressInvalid {
        address: String,
        #[source]
        reason: AddressError,
    },
    #[error("to token contract address is required")]
    ToTokenAddressRequired,
    #[error("to token contract address `{address}` is not valid: {reason}")]
    ToTokenAddressInvalid {
        address: String,
        #[source]
        reason: AddressError,
    },
    #[error("owner ethereum address is required")]
    OwnerAddressRequired,
    #[error("owner ethereum address `{address}` is not valid: {reason}")]
    OwnerAddressInvalid {
        address: String,
        #[source]
        reason: AddressError,
    },
    #[error("no network access supplied: pass a chain id, a provider url or an ethereum provider")]
    MissingNetworkAccessSpec,
    #[error("provider url `{url}` is not valid: {reason}")]
    ProviderUrlInvalid {
        url: String,
        #[source]
        reason: url::ParseError,
    },
    #[error("unknown chain name `{0}`")]
    UnknownChainName(String),

    // Domain errors
    #[error("chain id {0} is not supported")]
    ChainNotSupported(u64),
    #[error("declared chain {declared} but the node reports chain id {actual}")]
    ChainIdMismatch { declared: ChainId, actual: u64 },
    #[error("no token contract found at {0}")]
    TokenNotFound(ChecksumAddress),

    // Connectivity errors
    #[error("{step} failed for {target}: {source}")]
    Transport {
        step: &'static str,
        target: String,
        #[source]
        source: ProviderError,
    },

    // Invariant violations
    #[error("invalid pair context: {0}")]
    InvalidPairContext(String),
    #[error("pair builder is {actual}, expected {expected}")]
    InvalidState {
        expected: PairState,
        actual: PairState,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl UniswapError {
    pub fn code(&self) -> ErrorCode {
        match self {
            UniswapError::FromTokenAddressRequired => ErrorCode::FromTokenContractAddressRequired,
            UniswapError::FromTokenAddressInvalid { .. } => {
                ErrorCode::FromTokenContractAddressNotValid
            }
            UniswapError::ToTokenAddressRequired => ErrorCode::ToTokenContractAddressRequired,
            UniswapError::ToTokenAddressInvalid { .. } => ErrorCode::ToTokenContractAddressNotValid,
            UniswapError::OwnerAddressRequired => ErrorCode::EthereumAddressRequired,
            UniswapError::OwnerAddressInvalid { .. } => ErrorCode::EthereumAddressNotValid,
            UniswapError::MissingNetworkAccessSpec => ErrorCode::NetworkAccessRequired,
            UniswapError::ProviderUrlInvalid { .. } => ErrorCode::ProviderUrlInvalid,
            UniswapError::ChainNotSupported(_) => ErrorCode::ChainIdNotSupported,
            UniswapError::ChainIdMismatch { .. } => ErrorCode::ChainIdMismatch,
            UniswapError::TokenNotFound(_) => ErrorCode::TokenContractNotFound,
            UniswapError::Transport { .. } => ErrorCode::TransportFailure,
            UniswapError::InvalidPairContext(_) | UniswapError::InvalidState { .. } => {
                ErrorCode::InvalidPairContext
            }
            UniswapError::UnknownChainName(_) | UniswapError::InvalidConfiguration(_) => {
                ErrorCode::InvalidConfiguration
            }
        }
    }

    /// True for errors caused by caller-supplied data, including a declared
    /// chain id outside the supported set or one the node contradicts.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::FromTokenContractAddressRequired
                | ErrorCode::FromTokenContractAddressNotValid
                | ErrorCode::ToTokenContractAddressRequired
                | ErrorCode::ToTokenContractAddressNotValid
                | ErrorCode::EthereumAddressRequired
                | ErrorCode::EthereumAddressNotValid
                | ErrorCode::NetworkAccessRequired
                | ErrorCode::ProviderUrlInvalid
                | ErrorCode::ChainIdNotSupported
                | ErrorCode::ChainIdMismatch
        )
    }

    pub(crate) fn transport(step: &'static str, target: impl fmt::Display, source: ProviderError) -> Self {
        UniswapError::Transport {
            step,
            target: target.to_string(),
            source,
        }
    }
}
