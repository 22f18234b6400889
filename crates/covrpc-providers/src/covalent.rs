//! Covalent gateway profile.
//!
//! By default a shared, heavily throttled API token is used, which is fine
//! for quick prototypes and simple scripts. Sign up with the gateway for a
//! dedicated token to raise the rate limit.
//! <https://www.covalenthq.com/platform/>

use std::sync::Arc;

use async_trait::async_trait;

use covrpc_core::error::TransportError;
use covrpc_core::network::{Network, Networkish};
use covrpc_core::request::{RpcRequest, RpcResponse};
use covrpc_core::transport::RpcTransport;
use covrpc_http::{FetchRequest, JsonRpcClient, JsonRpcClientConfig, RetryHook};

use crate::community::{show_throttle_message, CommunityResourcable};
use crate::error::ProviderError;

/// The shared default API token, heavily throttled.
pub const DEFAULT_TOKEN: &str = "cqt_rQBwgX9hXFkMFHY4kXrqKCjqghgK";

/// Network name → gateway URL segment.
///
/// Upstream gateway table, reproduced verbatim — including the
/// `base-spolia` key — so behavior tracks what the gateway actually
/// serves.
const NETWORK_SEGMENTS: &[(&str, &str)] = &[
    ("mainnet", "eth-mainnet"),
    ("goerli", "eth-goerli"),
    ("sepolia", "eth-sepolia"),
    ("holesky", "eth-holesky"),
    ("arbitrum", "arbitrum-mainnet"),
    ("arbitrum-goerli", "arbitrum-goerli"),
    ("arbitrum-sepolia", "arbitrum-sepolia"),
    ("base", "base-mainnet"),
    ("base-goerli", "base-testnet"),
    ("base-spolia", "base-sepolia-testnet"),
    ("bnb", "bsc-mainnet"),
    ("bnbt", "bsc-testnet"),
    ("matic", "matic-mainnet"),
    ("matic-mumbai", "matic-mumbai"),
    ("optimism", "optimism-mainnet"),
    ("optimism-goerli", "optimism-goerli"),
    ("optimism-sepolia", "optimism-sepolia"),
];

/// Resolve the gateway host path for `network_name`.
///
/// Total over the fixed table; any name outside it is a configuration
/// error, never a guessed URL.
pub fn host(network_name: &str) -> Result<String, ProviderError> {
    NETWORK_SEGMENTS
        .iter()
        .find(|(name, _)| *name == network_name)
        .map(|(_, segment)| format!("api.covalenthq.com/v1/{segment}"))
        .ok_or_else(|| ProviderError::UnsupportedNetwork {
            name: network_name.to_string(),
        })
}

/// The network names this gateway serves, with their URL segments.
pub fn supported_networks() -> impl Iterator<Item = (&'static str, &'static str)> {
    NETWORK_SEGMENTS.iter().copied()
}

/// Build the connection descriptor for `network`, authenticated by
/// `token` (the shared default when absent).
///
/// The descriptor always allows gzip. When the resolved token is the
/// shared default, a retry hook is attached that surfaces the throttle
/// notice and always votes to retry; the transport's backoff schedule,
/// not the hook, bounds the attempt count. A dedicated token gets no
/// hook, so failures follow the transport's default handling.
///
/// No I/O happens here; the descriptor is ready for
/// [`JsonRpcClient::new`].
pub fn fetch_request(
    network: &Network,
    token: Option<&str>,
) -> Result<FetchRequest, ProviderError> {
    let token = token.unwrap_or(DEFAULT_TOKEN);
    let host = host(network.name())?;

    let mut request =
        FetchRequest::new(format!("https://{host}/events/?key={token}")).set_allow_gzip(true);
    if token == DEFAULT_TOKEN {
        request = request.set_retry_hook(Arc::new(ThrottleRetryHook));
    }
    Ok(request)
}

/// Ruling for connections on the shared token: surface the throttle
/// notice, then always vote to retry.
struct ThrottleRetryHook;

#[async_trait]
impl RetryHook for ThrottleRetryHook {
    async fn should_retry(
        &self,
        _request: &FetchRequest,
        _error: &TransportError,
        _attempt: u32,
    ) -> bool {
        show_throttle_message("CovalentProvider");
        true
    }
}

/// JSON-RPC provider backed by the Covalent gateway.
///
/// Construction resolves the network, builds the endpoint descriptor and
/// wires up the HTTP client; it performs no I/O.
#[derive(Debug)]
pub struct CovalentProvider {
    client: JsonRpcClient,
    network: Network,
    token: String,
}

impl CovalentProvider {
    /// Connect to `network` on the shared default token.
    pub fn new(network: impl Into<Networkish>) -> Result<Self, ProviderError> {
        Self::build(network, None)
    }

    /// Connect to `network` with a dedicated API token.
    pub fn with_token(
        network: impl Into<Networkish>,
        token: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Self::build(network, Some(token.into()))
    }

    /// Connect to Ethereum mainnet on the shared default token.
    pub fn mainnet() -> Self {
        Self::new("mainnet").expect("mainnet is a registered, supported network")
    }

    fn build(
        network: impl Into<Networkish>,
        token: Option<String>,
    ) -> Result<Self, ProviderError> {
        let network = Network::resolve(network)?;
        let token = token.unwrap_or_else(|| DEFAULT_TOKEN.to_string());
        let request = fetch_request(&network, Some(&token))?;

        // The identity is already resolved; hand it to the client so it
        // never probes the node with eth_chainId.
        let client = JsonRpcClient::new(
            request,
            JsonRpcClientConfig {
                static_network: Some(network.clone()),
                ..JsonRpcClientConfig::default()
            },
        );

        Ok(Self {
            client,
            network,
            token,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The API token this provider authenticates with.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &JsonRpcClient {
        &self.client
    }

    /// A provider on `chain_id`, reusing this provider's token.
    ///
    /// Construction failures fold into
    /// [`ProviderError::NoProviderForChain`]; the inner error never
    /// escapes to the caller.
    pub fn provider_for_chain(&self, chain_id: u64) -> Result<Self, ProviderError> {
        Self::with_token(chain_id, self.token.clone())
            .map_err(|_| ProviderError::NoProviderForChain { chain_id })
    }
}

impl CommunityResourcable for CovalentProvider {
    fn is_community_resource(&self) -> bool {
        self.token == DEFAULT_TOKEN
    }
}

#[async_trait]
impl RpcTransport for CovalentProvider {
    async fn send(&self, req: RpcRequest) -> Result<RpcResponse, TransportError> {
        self.client.send(req).await
    }

    async fn send_batch(
        &self,
        reqs: Vec<RpcRequest>,
    ) -> Result<Vec<RpcResponse>, TransportError> {
        self.client.send_batch(reqs).await
    }

    fn url(&self) -> &str {
        self.client.url()
    }
}
