use crate::error::UniswapError;
use crate::metrics;
use crate::network::NetworkProvider;
use ethers::abi::{self, Function, Param, ParamType, StateMutability, Token};
use ethers::providers::ProviderError;
use ethers::types::{Address, Bytes, H160};
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Upper bound on sub-calls per `aggregate3` request. Public endpoints start
/// rejecting larger payloads.
pub const MAX_BATCH_SIZE: usize = 200;

/// Multicall3, 0xcA11bde05977b3631167028862bE2a173976CA11 on every supported chain.
pub const MULTICALL3: Address = H160([
    0xca, 0x11, 0xbd, 0xe0, 0x59, 0x77, 0xb3, 0x63, 0x11, 0x67, 0x02, 0x88, 0x62, 0xbe, 0x2a, 0x17,
    0x39, 0x76, 0xca, 0x11,
]);

/// A single contract read to be batched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    /// Target contract address
    pub target: Address,
    /// Encoded function call data
    pub call_data: Bytes,
}

/// Outcome of one sub-call. Failures are reported, not raised, because every
/// call is sent with `allowFailure = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub success: bool,
    pub return_data: Bytes,
}

static AGGREGATE3: Lazy<Function> = Lazy::new(|| Function {
    name: "aggregate3".to_string(),
    inputs: vec![Param {
        name: "calls".to_string(),
        kind: ParamType::Array(Box::new(call3_type())),
        internal_type: None,
    }],
    outputs: vec![Param {
        name: "returnData".to_string(),
        kind: ParamType::Array(Box::new(result_type())),
        internal_type: None,
    }],
    constant: None,
    state_mutability: StateMutability::Payable,
});

// Call3: (address target, bool allowFailure, bytes callData)
fn call3_type() -> ParamType {
    ParamType::Tuple(vec![ParamType::Address, ParamType::Bool, ParamType::Bytes])
}

// Result: (bool success, bytes returnData)
fn result_type() -> ParamType {
    ParamType::Tuple(vec![ParamType::Bool, ParamType::Bytes])
}

/// Batches contract reads through a Multicall3 deployment.
///
/// Identical calls are coalesced before sending, and results come back in the
/// order the calls were given.
#[derive(Clone)]
pub struct Multicall {
    provider: Arc<dyn NetworkProvider>,
    multicall_address: Address,
    batch_size: usize,
}

impl Multicall {
    pub fn new(provider: Arc<dyn NetworkProvider>, multicall_address: Address, batch_size: usize) -> Self {
        if batch_size > MAX_BATCH_SIZE {
            warn!(
                "Batch size {} exceeds recommended maximum ({}), capping",
                batch_size, MAX_BATCH_SIZE
            );
        }

        Self {
            provider,
            multicall_address,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Runs `calls`, one `aggregate3` request per chunk of `batch_size`.
    pub async fn run(&self, calls: Vec<Call>) -> Result<Vec<CallResult>, UniswapError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // Coalesce identical calls to reduce load
        let mut unique_calls = indexmap::IndexSet::new();
        let mut original_indices = Vec::with_capacity(calls.len());
        for call in &calls {
            let (index, _) = unique_calls.insert_full(call.clone());
            original_indices.push(index);
        }

        let unique_calls: Vec<Call> = unique_calls.into_iter().collect();
        debug!(
            "Multicall coalesced {} calls into {}",
            calls.len(),
            unique_calls.len()
        );

        let mut unique_results = Vec::with_capacity(unique_calls.len());
        for chunk in unique_calls.chunks(self.batch_size) {
            metrics::record_multicall_batch_size(chunk.len());
            unique_results.extend(self.execute_aggregate3(chunk).await?);
        }

        // Reconstruct the full result set in the original order
        Ok(original_indices
            .into_iter()
            .map(|index| unique_results[index].clone())
            .collect())
    }

    async fn execute_aggregate3(&self, calls: &[Call]) -> Result<Vec<CallResult>, UniswapError> {
        let calldata = encode_aggregate3_calls(calls);

        metrics::increment_rpc_call("multicall", "aggregate3");
        let response = self
            .provider
            .call(self.multicall_address, calldata)
            .await
            .map_err(|source| UniswapError::transport("multicall aggregate3", self.multicall_address_hex(), source))?;

        let results = decode_aggregate3_results(&response).map_err(|e| {
            UniswapError::transport(
                "multicall decode",
                self.multicall_address_hex(),
                ProviderError::CustomError(e.to_string()),
            )
        })?;

        if results.len() != calls.len() {
            return Err(UniswapError::transport(
                "multicall decode",
                self.multicall_address_hex(),
                ProviderError::CustomError(format!(
                    "expected {} results, got {}",
                    calls.len(),
                    results.len()
                )),
            ));
        }

        Ok(results)
    }

    fn multicall_address_hex(&self) -> String {
        ethers::utils::to_checksum(&self.multicall_address, None)
    }
}

/// ABI-encodes an `aggregate3` call with `allowFailure = true` on every entry.
pub fn encode_aggregate3_calls(calls: &[Call]) -> Bytes {
    let call_tokens = calls
        .iter()
        .map(|call| {
            Token::Tuple(vec![
                Token::Address(call.target),
                Token::Bool(true),
                Token::Bytes(call.call_data.to_vec()),
            ])
        })
        .collect();

    let mut data = AGGREGATE3.short_signature().to_vec();
    data.extend(abi::encode(&[Token::Array(call_tokens)]));
    Bytes::from(data)
}

/// Inverse of [`encode_aggregate3_calls`]. Used by in-process mocks that
/// answer `aggregate3` requests.
pub fn decode_aggregate3_calls(data: &[u8]) -> Result<Vec<Call>, abi::Error> {
    let selector = AGGREGATE3.short_signature();
    if data.len() < 4 || data[..4] != selector {
        return Err(abi::Error::InvalidData);
    }

    let decoded = abi::decode(&[ParamType::Array(Box::new(call3_type()))], &data[4..])?;
    let entries = decoded
        .into_iter()
        .next()
        .and_then(Token::into_array)
        .ok_or(abi::Error::InvalidData)?;

    entries
        .into_iter()
        .map(|entry| match entry {
            Token::Tuple(fields) => match fields.as_slice() {
                [Token::Address(target), Token::Bool(_), Token::Bytes(call_data)] => Ok(Call {
                    target: *target,
                    call_data: Bytes::from(call_data.clone()),
                }),
                _ => Err(abi::Error::InvalidData),
            },
            _ => Err(abi::Error::InvalidData),
        })
        .collect()
}

/// ABI-encodes the `(bool, bytes)[]` return value of `aggregate3`.
pub fn encode_aggregate3_results(results: &[CallResult]) -> Bytes {
    let tokens = results
        .iter()
        .map(|result| {
            Token::Tuple(vec![
                Token::Bool(result.success),
                Token::Bytes(result.return_data.to_vec()),
            ])
        })
        .collect();
    Bytes::from(abi::encode(&[Token::Array(tokens)]))
}

pub fn decode_aggregate3_results(data: &[u8]) -> Result<Vec<CallResult>, abi::Error> {
    let decoded = abi::decode(&[ParamType::Array(Box::new(result_type()))], data)?;
    let entries = decoded
        .into_iter()
        .next()
        .and_then(Token::into_array)
        .ok_or(abi::Error::InvalidData)?;

    entries
        .into_iter()
        .map(|entry| match entry {
            Token::Tuple(fields) => match fields.as_slice() {
                [Token::Bool(success), Token::Bytes(return_data)] => Ok(CallResult {
                    success: *success,
                    return_data: Bytes::from(return_data.clone()),
                }),
                _ => Err(abi::Error::InvalidData),
            },
            _ => Err(abi::Error::InvalidData),
        })
        .collect()
}
