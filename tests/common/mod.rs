//! Shared test doubles: an in-process chain that answers ERC-20 reads and
//! Multicall3 `aggregate3`, and a connector that records the urls it opens.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::providers::ProviderError;
use ethers::types::{Address, Bytes, U256};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uniswap_pair_sdk::multicall::{
    decode_aggregate3_calls, encode_aggregate3_results, CallResult, MULTICALL3,
};
use uniswap_pair_sdk::{NetworkProvider, ProviderConnector, UniswapError};
use url::Url;

pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const WETH_MAINNET: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const WETH_RINKEBY: &str = "0xc778417E063141139Fce010982780140Aa0cD5Ab";
pub const UNI: &str = "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984";
pub const MKR: &str = "0x9f8F72aA9304c8B593d555F12eF6589cC3A579A2";
pub const OWNER: &str = "0xB1E6079212888f0bE0cf55874B2EB9d7a5e02cD9";

const SYMBOL: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];
const DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
const NAME: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];

#[derive(Debug, Clone)]
pub struct MockToken {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    /// Return symbol and name as zero-padded `bytes32`
    pub bytes32_text: bool,
}

/// Mock chain. Unknown contracts answer with empty return data, like an
/// `eth_call` to an address without code.
#[derive(Debug)]
pub struct MockProvider {
    chain_id: u64,
    tokens: HashMap<Address, MockToken>,
    failing: AtomicBool,
    pub chain_id_calls: AtomicUsize,
    pub eth_calls: AtomicUsize,
    pub aggregate_calls: AtomicUsize,
    pub sub_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            tokens: HashMap::new(),
            failing: AtomicBool::new(false),
            chain_id_calls: AtomicUsize::new(0),
            eth_calls: AtomicUsize::new(0),
            aggregate_calls: AtomicUsize::new(0),
            sub_calls: AtomicUsize::new(0),
        }
    }

    /// Mainnet-like chain knowing USDC, WETH and UNI.
    pub fn mainnet() -> Self {
        Self::new(1)
            .with_token(USDC, "USDC", "USD Coin", 6)
            .with_token(WETH_MAINNET, "WETH", "Wrapped Ether", 18)
            .with_token(WETH_RINKEBY, "WETH", "Wrapped Ether", 18)
            .with_token(UNI, "UNI", "Uniswap", 18)
    }

    pub fn with_token(mut self, address: &str, symbol: &str, name: &str, decimals: u8) -> Self {
        self.tokens.insert(
            parse(address),
            MockToken {
                symbol: symbol.to_string(),
                name: name.to_string(),
                decimals,
                bytes32_text: false,
            },
        );
        self
    }

    pub fn with_bytes32_token(mut self, address: &str, symbol: &str, name: &str, decimals: u8) -> Self {
        self.tokens.insert(
            parse(address),
            MockToken {
                symbol: symbol.to_string(),
                name: name.to_string(),
                decimals,
                bytes32_text: true,
            },
        );
        self
    }

    pub fn fail_calls(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.chain_id_calls.load(Ordering::SeqCst) + self.eth_calls.load(Ordering::SeqCst)
    }

    fn answer(&self, target: Address, data: &[u8]) -> Option<Bytes> {
        let token = self.tokens.get(&target)?;
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let encoded = match selector {
            SYMBOL => encode_text(&token.symbol, token.bytes32_text),
            NAME => encode_text(&token.name, token.bytes32_text),
            DECIMALS => abi::encode(&[Token::Uint(U256::from(token.decimals))]),
            _ => return None,
        };
        Some(Bytes::from(encoded))
    }
}

fn encode_text(text: &str, as_bytes32: bool) -> Vec<u8> {
    if as_bytes32 {
        let mut word = [0u8; 32];
        word[..text.len()].copy_from_slice(text.as_bytes());
        word.to_vec()
    } else {
        abi::encode(&[Token::String(text.to_string())])
    }
}

#[async_trait]
impl NetworkProvider for MockProvider {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.chain_id_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::CustomError("connection refused".to_string()));
        }
        Ok(self.chain_id)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        self.eth_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::CustomError("connection refused".to_string()));
        }

        if to == MULTICALL3 {
            self.aggregate_calls.fetch_add(1, Ordering::SeqCst);
            let calls = decode_aggregate3_calls(&data)
                .map_err(|e| ProviderError::CustomError(e.to_string()))?;
            self.sub_calls.fetch_add(calls.len(), Ordering::SeqCst);
            let results: Vec<CallResult> = calls
                .iter()
                .map(|call| match self.answer(call.target, &call.call_data) {
                    Some(return_data) => CallResult {
                        success: true,
                        return_data,
                    },
                    None => CallResult {
                        success: true,
                        return_data: Bytes::default(),
                    },
                })
                .collect();
            return Ok(encode_aggregate3_results(&results));
        }

        Ok(self.answer(to, &data).unwrap_or_default())
    }
}

/// Connector that hands out one provider and remembers every url requested.
pub struct RecordingConnector {
    provider: Arc<MockProvider>,
    pub urls: Mutex<Vec<Url>>,
}

impl RecordingConnector {
    pub fn new(provider: Arc<MockProvider>) -> Self {
        Self {
            provider,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn connected_urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .unwrap()
            .iter()
            .map(|url| url.to_string())
            .collect()
    }
}

impl ProviderConnector for RecordingConnector {
    fn connect(&self, url: &Url) -> Result<Arc<dyn NetworkProvider>, UniswapError> {
        self.urls.lock().unwrap().push(url.clone());
        Ok(self.provider.clone())
    }
}

pub fn parse(address: &str) -> Address {
    Address::from_str(address).unwrap()
}
