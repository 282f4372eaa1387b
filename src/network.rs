// src/network.rs
//
// Network access: the provider seam, the three ways a caller can describe
// access, and the resolver that turns a description into a handle.

use crate::chain::ChainId;
use crate::error::UniswapError;
use crate::metrics;
use async_trait::async_trait;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider, ProviderError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest};
use log::{debug, error, info};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

/// Read access to a chain, as consumed by this crate.
///
/// Implemented for `ethers` providers through [`EthersProvider`]; wallets and
/// tests can supply their own.
#[async_trait]
pub trait NetworkProvider: Send + Sync + fmt::Debug {
    /// Chain id reported by the live connection.
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// `eth_call` against `to` with raw calldata, at the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError>;
}

/// Adapts any `ethers` [`Provider`] (HTTP, WebSocket, IPC) to [`NetworkProvider`].
#[derive(Debug, Clone)]
pub struct EthersProvider<P> {
    inner: Provider<P>,
}

impl<P: JsonRpcClient> EthersProvider<P> {
    pub fn new(inner: Provider<P>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Provider<P> {
        &self.inner
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> NetworkProvider for EthersProvider<P> {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        metrics::increment_rpc_call("network", "eth_chainId");
        let id = self.inner.get_chainid().await?;
        Ok(id.low_u64())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        metrics::increment_rpc_call("network", "eth_call");
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.inner.call(&tx, None).await
    }
}

/// Opens a provider for an endpoint url.
pub trait ProviderConnector: Send + Sync {
    fn connect(&self, url: &Url) -> Result<Arc<dyn NetworkProvider>, UniswapError>;
}

/// Default connector: an `ethers` HTTP JSON-RPC provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl ProviderConnector for HttpConnector {
    fn connect(&self, url: &Url) -> Result<Arc<dyn NetworkProvider>, UniswapError> {
        let provider = Provider::new(Http::new(url.clone()));
        Ok(Arc::new(EthersProvider::new(provider)))
    }
}

/// How the caller asked to reach the network. Exactly one variant is active.
#[derive(Debug, Clone)]
pub enum NetworkAccessSpec {
    /// A supported chain, optionally with an explicit endpoint.
    ChainId {
        chain_id: ChainId,
        provider_url: Option<Url>,
    },
    /// An endpoint with no declared chain; the chain id is discovered lazily.
    ProviderUrl(Url),
    /// A live provider supplied by the caller (wallet, websocket, ...).
    Injected(Arc<dyn NetworkProvider>),
}

impl NetworkAccessSpec {
    /// Picks one access strategy from possibly overlapping inputs.
    ///
    /// Priority: chain id with url, chain id alone, injected provider, url
    /// alone. Empty url strings count as absent.
    pub fn select(
        chain_id: Option<u64>,
        provider_url: Option<&str>,
        ethereum_provider: Option<Arc<dyn NetworkProvider>>,
    ) -> Result<Self, UniswapError> {
        let provider_url = provider_url.map(str::trim).filter(|url| !url.is_empty());

        if let Some(id) = chain_id {
            let chain_id = ChainId::try_from(id)?;
            let provider_url = provider_url.map(parse_url).transpose()?;
            return Ok(NetworkAccessSpec::ChainId {
                chain_id,
                provider_url,
            });
        }

        if let Some(provider) = ethereum_provider {
            return Ok(NetworkAccessSpec::Injected(provider));
        }

        match provider_url {
            Some(url) => Ok(NetworkAccessSpec::ProviderUrl(parse_url(url)?)),
            None => Err(UniswapError::MissingNetworkAccessSpec),
        }
    }

    pub fn kind(&self) -> NetworkAccessKind {
        match self {
            NetworkAccessSpec::ChainId {
                provider_url: Some(_),
                ..
            } => NetworkAccessKind::ChainIdWithUrl,
            NetworkAccessSpec::ChainId { .. } => NetworkAccessKind::ChainId,
            NetworkAccessSpec::ProviderUrl(_) => NetworkAccessKind::ProviderUrl,
            NetworkAccessSpec::Injected(_) => NetworkAccessKind::Injected,
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, UniswapError> {
    Url::parse(raw).map_err(|reason| UniswapError::ProviderUrlInvalid {
        url: raw.to_string(),
        reason,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkAccessKind {
    ChainIdWithUrl,
    ChainId,
    Injected,
    ProviderUrl,
}

/// A connected network, ready for calls.
///
/// Handles built from a chain id carry it as declared until
/// [`NetworkHandle::verify_chain_id`] asks the node. The live answer is
/// fetched once and cached.
#[derive(Clone)]
pub struct NetworkHandle {
    provider: Arc<dyn NetworkProvider>,
    kind: NetworkAccessKind,
    declared_chain_id: Option<ChainId>,
    endpoint: Option<Url>,
    discovered_chain_id: Arc<OnceCell<u64>>,
}

impl NetworkHandle {
    pub fn provider(&self) -> &Arc<dyn NetworkProvider> {
        &self.provider
    }

    pub fn kind(&self) -> NetworkAccessKind {
        self.kind
    }

    pub fn declared_chain_id(&self) -> Option<ChainId> {
        self.declared_chain_id
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    /// Chain id of the network, without validating it against the supported
    /// set. A declared id is returned as is; otherwise the node is asked.
    pub async fn chain_id(&self) -> Result<u64, UniswapError> {
        match self.declared_chain_id {
            Some(chain) => Ok(chain.id()),
            None => self.live_chain_id().await,
        }
    }

    /// Chain id reported by the node, checked against the supported set and
    /// against the declared id when there is one.
    pub async fn verify_chain_id(&self) -> Result<ChainId, UniswapError> {
        let actual = self.live_chain_id().await?;
        let chain = ChainId::try_from(actual)?;
        match self.declared_chain_id {
            Some(declared) if declared != chain => {
                error!(
                    "Node at {} reports chain id {}, declared {}",
                    self.describe(),
                    actual,
                    declared
                );
                Err(UniswapError::ChainIdMismatch { declared, actual })
            }
            _ => Ok(chain),
        }
    }

    /// Asks the provider once; later calls reuse the answer.
    async fn live_chain_id(&self) -> Result<u64, UniswapError> {
        let id = self
            .discovered_chain_id
            .get_or_try_init(|| async {
                self.provider
                    .chain_id()
                    .await
                    .map_err(|source| UniswapError::transport("chain id discovery", self.describe(), source))
            })
            .await?;
        debug!("Chain id {} from {}", id, self.describe());
        Ok(*id)
    }

    /// Human-readable label for logs and error context. Never includes the
    /// endpoint path, which often carries an api key.
    pub fn describe(&self) -> String {
        match &self.endpoint {
            Some(url) => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("unknown")),
            None => "injected provider".to_string(),
        }
    }
}

impl fmt::Debug for NetworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkHandle")
            .field("kind", &self.kind)
            .field("declared_chain_id", &self.declared_chain_id)
            .field("endpoint", &self.describe())
            .finish()
    }
}

impl Serialize for NetworkHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("NetworkHandle", 3)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("declaredChainId", &self.declared_chain_id)?;
        state.serialize_field("endpoint", &self.describe())?;
        state.end()
    }
}

/// Turns a [`NetworkAccessSpec`] into a [`NetworkHandle`].
pub struct NetworkAccessResolver {
    connector: Arc<dyn ProviderConnector>,
    endpoint_overrides: HashMap<ChainId, Url>,
}

impl Default for NetworkAccessResolver {
    fn default() -> Self {
        Self::new(Arc::new(HttpConnector))
    }
}

impl NetworkAccessResolver {
    pub fn new(connector: Arc<dyn ProviderConnector>) -> Self {
        Self {
            connector,
            endpoint_overrides: HashMap::new(),
        }
    }

    /// Replace the managed default endpoint for some chains.
    pub fn with_endpoint_overrides(mut self, overrides: HashMap<ChainId, Url>) -> Self {
        self.endpoint_overrides = overrides;
        self
    }

    pub fn default_endpoint(&self, chain_id: ChainId) -> Result<Url, UniswapError> {
        match self.endpoint_overrides.get(&chain_id) {
            Some(url) => Ok(url.clone()),
            None => parse_url(&chain_id.default_rpc_url()),
        }
    }

    /// Connects according to `spec`. May do real I/O depending on the
    /// connector.
    pub fn resolve(&self, spec: NetworkAccessSpec) -> Result<NetworkHandle, UniswapError> {
        let kind = spec.kind();
        let (provider, declared_chain_id, endpoint) = match spec {
            NetworkAccessSpec::ChainId {
                chain_id,
                provider_url,
            } => {
                let url = match provider_url {
                    Some(url) => url,
                    None => self.default_endpoint(chain_id)?,
                };
                let provider = self.connector.connect(&url)?;
                (provider, Some(chain_id), Some(url))
            }
            NetworkAccessSpec::ProviderUrl(url) => {
                let provider = self.connector.connect(&url)?;
                (provider, None, Some(url))
            }
            NetworkAccessSpec::Injected(provider) => (provider, None, None),
        };

        let handle = NetworkHandle {
            provider,
            kind,
            declared_chain_id,
            endpoint,
            discovered_chain_id: Arc::new(OnceCell::new()),
        };
        info!(
            "Resolved network access via {:?} ({})",
            handle.kind,
            handle.describe()
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[derive(Debug)]
    struct StubProvider;

    struct StubConnector;

    impl ProviderConnector for StubConnector {
        fn connect(&self, _url: &Url) -> Result<Arc<dyn NetworkProvider>, UniswapError> {
            Ok(stub())
        }
    }

    #[async_trait]
    impl NetworkProvider for StubProvider {
        async fn chain_id(&self) -> Result<u64, ProviderError> {
            Ok(5)
        }

        async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ProviderError> {
            Ok(Bytes::default())
        }
    }

    fn stub() -> Arc<dyn NetworkProvider> {
        Arc::new(StubProvider)
    }

    #[test]
    fn test_chain_id_and_url_wins() {
        let spec =
            NetworkAccessSpec::select(Some(1), Some("http://localhost:8545"), Some(stub())).unwrap();
        assert_eq!(spec.kind(), NetworkAccessKind::ChainIdWithUrl);
    }

    #[test]
    fn test_chain_id_beats_injected_provider() {
        let spec = NetworkAccessSpec::select(Some(4), None, Some(stub())).unwrap();
        match spec {
            NetworkAccessSpec::ChainId {
                chain_id,
                provider_url,
            } => {
                assert_eq!(chain_id, ChainId::Rinkeby);
                assert!(provider_url.is_none());
            }
            other => panic!("expected ChainId, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_injected_beats_bare_url() {
        let spec = NetworkAccessSpec::select(None, Some("http://localhost:8545"), Some(stub())).unwrap();
        assert_eq!(spec.kind(), NetworkAccessKind::Injected);
    }

    #[test]
    fn test_bare_url() {
        let spec = NetworkAccessSpec::select(None, Some("http://localhost:8545"), None).unwrap();
        assert_eq!(spec.kind(), NetworkAccessKind::ProviderUrl);
    }

    #[test]
    fn test_nothing_supplied() {
        let err = NetworkAccessSpec::select(None, Some("  "), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NetworkAccessRequired);
    }

    #[test]
    fn test_unsupported_declared_chain() {
        let err = NetworkAccessSpec::select(Some(137), None, None).unwrap_err();
        assert!(matches!(err, UniswapError::ChainNotSupported(137)));
    }

    #[test]
    fn test_bad_url() {
        let err = NetworkAccessSpec::select(Some(1), Some("not a url"), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProviderUrlInvalid);
    }

    #[test]
    fn test_default_endpoint_override() {
        let override_url = Url::parse("http://127.0.0.1:8545").unwrap();
        let resolver = NetworkAccessResolver::default()
            .with_endpoint_overrides(HashMap::from([(ChainId::Goerli, override_url.clone())]));
        assert_eq!(resolver.default_endpoint(ChainId::Goerli).unwrap(), override_url);
        assert!(resolver
            .default_endpoint(ChainId::Kovan)
            .unwrap()
            .as_str()
            .starts_with("https://kovan.infura.io/"));
    }

    #[tokio::test]
    async fn test_injected_handle_discovers_chain() {
        let handle = NetworkAccessResolver::default()
            .resolve(NetworkAccessSpec::Injected(stub()))
            .unwrap();
        assert_eq!(handle.declared_chain_id(), None);
        assert_eq!(handle.chain_id().await.unwrap(), 5);
        assert_eq!(handle.describe(), "injected provider");
    }

    #[test]
    fn test_describe_hides_api_key() {
        let handle = NetworkAccessResolver::default()
            .resolve(NetworkAccessSpec::ChainId {
                chain_id: ChainId::Mainnet,
                provider_url: None,
            })
            .unwrap();
        assert_eq!(handle.describe(), "https://mainnet.infura.io");
        assert_eq!(handle.declared_chain_id(), Some(ChainId::Mainnet));
    }

    #[tokio::test]
    async fn test_verify_matching_declared_chain() {
        let handle = NetworkAccessResolver::new(Arc::new(StubConnector))
            .resolve(NetworkAccessSpec::ChainId {
                chain_id: ChainId::Goerli,
                provider_url: None,
            })
            .unwrap();
        assert_eq!(handle.verify_chain_id().await.unwrap(), ChainId::Goerli);
    }

    #[tokio::test]
    async fn test_verify_rejects_contradicting_node() {
        let handle = NetworkAccessResolver::new(Arc::new(StubConnector))
            .resolve(NetworkAccessSpec::ChainId {
                chain_id: ChainId::Mainnet,
                provider_url: None,
            })
            .unwrap();
        // declared id is still what callers see before verification
        assert_eq!(handle.chain_id().await.unwrap(), 1);

        let err = handle.verify_chain_id().await.unwrap_err();
        assert!(matches!(
            err,
            UniswapError::ChainIdMismatch {
                declared: ChainId::Mainnet,
                actual: 5
            }
        ));
        assert_eq!(err.code(), ErrorCode::ChainIdMismatch);
    }
}
