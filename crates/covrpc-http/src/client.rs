//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! Features:
//! - Automatic retry with exponential backoff for transient errors
//! - Per-connection retry hooks that can veto scheduled retries
//! - Network detection via `eth_chainId`, cached for the client's lifetime
//! - Batch request support (true HTTP batching, responses matched by id)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use covrpc_core::error::TransportError;
use covrpc_core::network::Network;
use covrpc_core::request::{RpcId, RpcRequest, RpcResponse};
use covrpc_core::retry::{RetryConfig, RetryPolicy};
use covrpc_core::transport::RpcTransport;

use crate::fetch::FetchRequest;

/// Configuration for [`JsonRpcClient`].
#[derive(Debug, Clone)]
pub struct JsonRpcClientConfig {
    pub retry: RetryConfig,
    pub request_timeout: Duration,
    /// Trust this identity instead of asking the node who it is.
    ///
    /// Gateway profiles that already resolved a network set this so the
    /// client never issues an `eth_chainId` probe.
    pub static_network: Option<Network>,
}

impl Default for JsonRpcClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
            static_network: None,
        }
    }
}

/// HTTP JSON-RPC client with retry, hooks and network detection.
#[derive(Debug)]
pub struct JsonRpcClient {
    request: FetchRequest,
    http: reqwest::Client,
    retry: RetryPolicy,
    request_timeout: Duration,
    static_network: Option<Network>,
    detected: OnceCell<Network>,
}

impl JsonRpcClient {
    /// Create a client for the connection `request` describes.
    pub fn new(request: FetchRequest, config: JsonRpcClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .gzip(request.allow_gzip())
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build reqwest client");

        Self {
            request,
            http,
            retry: RetryPolicy::new(config.retry),
            request_timeout: config.request_timeout,
            static_network: config.static_network,
            detected: OnceCell::new(),
        }
    }

    /// Create with default configuration for a bare URL.
    pub fn connect(url: impl Into<String>) -> Self {
        Self::new(FetchRequest::new(url), JsonRpcClientConfig::default())
    }

    /// The connection descriptor this client was built from.
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// The network this client talks to.
    ///
    /// A configured static network answers without I/O. Otherwise the first
    /// call probes the node with `eth_chainId` and the answer is cached for
    /// the life of the client.
    pub async fn network(&self) -> Result<Network, TransportError> {
        if let Some(network) = &self.static_network {
            return Ok(network.clone());
        }
        self.detected
            .get_or_try_init(|| self.detect_network())
            .await
            .cloned()
    }

    async fn detect_network(&self) -> Result<Network, TransportError> {
        let value = self.call("eth_chainId", vec![]).await?;
        let chain_id = parse_chain_id(&value)?;
        // Chains outside the registry still get an identity.
        Ok(Network::from_chain_id(chain_id).unwrap_or_else(|_| Network::new("unknown", chain_id)))
    }

    async fn send_once(&self, req: &RpcRequest) -> Result<RpcResponse, TransportError> {
        let resp = self
            .http
            .post(self.request.url())
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = resp.status().as_u16();
        if status == 429 {
            return Err(TransportError::Throttled { status });
        }
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        resp.json::<RpcResponse>()
            .await
            .map_err(|e| self.map_reqwest_error(e))
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            TransportError::InvalidResponse(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }

    /// Delay before retrying after `error` on the `attempt`-th failure.
    ///
    /// The backoff policy rules first, since it bounds the schedule; the
    /// descriptor's hook can then veto. `None` means give up and surface
    /// the error.
    async fn next_attempt_delay(
        &self,
        error: &TransportError,
        attempt: u32,
    ) -> Option<Duration> {
        let delay = self.retry.next_delay(attempt)?;
        if let Some(hook) = self.request.retry_hook() {
            if !hook.should_retry(&self.request, error, attempt).await {
                return None;
            }
        }
        Some(delay)
    }
}

#[async_trait]
impl RpcTransport for JsonRpcClient {
    async fn send(&self, req: RpcRequest) -> Result<RpcResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => {
                    match self.next_attempt_delay(&e, attempt).await {
                        Some(delay) => {
                            tracing::warn!(
                                attempt,
                                delay_ms = delay.as_millis(),
                                error = %e,
                                url = %self.request.url(),
                                "retrying request"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            tracing::error!(
                                attempt,
                                error = %e,
                                url = %self.request.url(),
                                "giving up on request"
                            );
                            return Err(e);
                        }
                    }
                }
                Err(e) => {
                    // Non-retryable (e.g. RPC execution error)
                    return Err(e);
                }
            }
        }
    }

    /// True HTTP batch: send all requests as a JSON array in one HTTP call.
    async fn send_batch(
        &self,
        reqs: Vec<RpcRequest>,
    ) -> Result<Vec<RpcResponse>, TransportError> {
        if reqs.is_empty() {
            return Ok(vec![]);
        }

        let resp = self
            .http
            .post(self.request.url())
            .json(&reqs)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = resp.status().as_u16();
        if status == 429 {
            return Err(TransportError::Throttled { status });
        }
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let responses = resp
            .json::<Vec<RpcResponse>>()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        match_by_id(&reqs, responses)
    }

    fn url(&self) -> &str {
        self.request.url()
    }
}

/// Reorder `responses` to match `reqs`, pairing by JSON-RPC id.
///
/// Nodes may answer a batch in any order; only the ids tie responses back
/// to their requests.
fn match_by_id(
    reqs: &[RpcRequest],
    responses: Vec<RpcResponse>,
) -> Result<Vec<RpcResponse>, TransportError> {
    if responses.len() != reqs.len() {
        return Err(TransportError::InvalidResponse(format!(
            "batch sent {} requests but got {} responses",
            reqs.len(),
            responses.len()
        )));
    }

    let slots: HashMap<&RpcId, usize> = reqs
        .iter()
        .enumerate()
        .map(|(slot, req)| (&req.id, slot))
        .collect();

    let mut ordered: Vec<Option<RpcResponse>> = (0..reqs.len()).map(|_| None).collect();
    for resp in responses {
        match slots.get(&resp.id) {
            Some(&slot) => ordered[slot] = Some(resp),
            None => {
                return Err(TransportError::InvalidResponse(format!(
                    "batch response carries unknown id {}",
                    resp.id
                )))
            }
        }
    }

    ordered
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| TransportError::InvalidResponse("batch response repeats an id".into()))
}

fn parse_chain_id(value: &Value) -> Result<u64, TransportError> {
    let hex = value.as_str().ok_or_else(|| {
        TransportError::InvalidResponse(format!("eth_chainId returned non-string: {value}"))
    })?;
    u64::from_str_radix(hex.trim_start_matches("0x"), 16).map_err(|e| {
        TransportError::InvalidResponse(format!("eth_chainId returned bad hex {hex:?}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RetryHook;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn req(id: u64) -> RpcRequest {
        RpcRequest::new(id, "eth_blockNumber", vec![])
    }

    #[test]
    fn match_by_id_keeps_in_order_responses() {
        let reqs = vec![req(1), req(2)];
        let responses = vec![
            RpcResponse::success(1, Value::from("a")),
            RpcResponse::success(2, Value::from("b")),
        ];
        let ordered = match_by_id(&reqs, responses).unwrap();
        assert_eq!(ordered[0].id, RpcId::Number(1));
        assert_eq!(ordered[1].id, RpcId::Number(2));
    }

    #[test]
    fn match_by_id_reorders_shuffled_responses() {
        let reqs = vec![req(10), req(11), req(12)];
        let responses = vec![
            RpcResponse::success(12, Value::from("c")),
            RpcResponse::success(10, Value::from("a")),
            RpcResponse::success(11, Value::from("b")),
        ];
        let ordered = match_by_id(&reqs, responses).unwrap();
        assert_eq!(ordered[0].result, Some(Value::from("a")));
        assert_eq!(ordered[1].result, Some(Value::from("b")));
        assert_eq!(ordered[2].result, Some(Value::from("c")));
    }

    #[test]
    fn match_by_id_rejects_unknown_ids() {
        let reqs = vec![req(1)];
        let responses = vec![RpcResponse::success(99, Value::Null)];
        let err = match_by_id(&reqs, responses).unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }

    #[test]
    fn match_by_id_rejects_count_mismatch() {
        let reqs = vec![req(1), req(2)];
        let responses = vec![RpcResponse::success(1, Value::Null)];
        let err = match_by_id(&reqs, responses).unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }

    #[test]
    fn match_by_id_handles_string_ids() {
        // JSON-RPC ids need not be numbers; matching must key on the id
        // value itself.
        let reqs = vec![
            RpcRequest::new("alpha", "eth_blockNumber", vec![]),
            RpcRequest::new("beta", "eth_chainId", vec![]),
        ];
        let responses = vec![
            RpcResponse::success("beta", Value::from("b")),
            RpcResponse::success("alpha", Value::from("a")),
        ];
        let ordered = match_by_id(&reqs, responses).unwrap();
        assert_eq!(ordered[0].result, Some(Value::from("a")));
        assert_eq!(ordered[1].result, Some(Value::from("b")));
    }

    #[test]
    fn parse_chain_id_handles_hex() {
        assert_eq!(parse_chain_id(&Value::from("0x1")).unwrap(), 1);
        assert_eq!(parse_chain_id(&Value::from("0x89")).unwrap(), 137);
    }

    #[test]
    fn parse_chain_id_rejects_garbage() {
        assert!(parse_chain_id(&Value::from(7)).is_err());
        assert!(parse_chain_id(&Value::from("0xzz")).is_err());
    }

    #[tokio::test]
    async fn static_network_answers_without_io() {
        // The URL is never contacted: the static identity short-circuits.
        let client = JsonRpcClient::new(
            FetchRequest::new("http://127.0.0.1:0"),
            JsonRpcClientConfig {
                static_network: Some(Network::mainnet()),
                ..JsonRpcClientConfig::default()
            },
        );
        let network = client.network().await.unwrap();
        assert_eq!(network.chain_id(), 1);
    }

    struct Veto;

    #[async_trait]
    impl RetryHook for Veto {
        async fn should_retry(
            &self,
            _request: &FetchRequest,
            _error: &TransportError,
            _attempt: u32,
        ) -> bool {
            false
        }
    }

    struct Allow;

    #[async_trait]
    impl RetryHook for Allow {
        async fn should_retry(
            &self,
            _request: &FetchRequest,
            _error: &TransportError,
            _attempt: u32,
        ) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn hook_can_veto_a_scheduled_retry() {
        let client = JsonRpcClient::new(
            FetchRequest::new("http://127.0.0.1:0").set_retry_hook(Arc::new(Veto)),
            JsonRpcClientConfig::default(),
        );
        let error = TransportError::Throttled { status: 429 };
        assert!(client.next_attempt_delay(&error, 1).await.is_none());
    }

    #[tokio::test]
    async fn hook_cannot_extend_the_schedule() {
        let client = JsonRpcClient::new(
            FetchRequest::new("http://127.0.0.1:0").set_retry_hook(Arc::new(Allow)),
            JsonRpcClientConfig::default(),
        );
        let error = TransportError::Throttled { status: 429 };
        // Within the schedule the hook's approval stands...
        assert!(client.next_attempt_delay(&error, 1).await.is_some());
        // ...past max_retries the policy has already given up.
        assert!(client.next_attempt_delay(&error, 100).await.is_none());
    }

    #[tokio::test]
    async fn no_hook_means_schedule_decides_alone() {
        let client = JsonRpcClient::connect("http://127.0.0.1:0");
        let error = TransportError::Http("connection refused".into());
        assert!(client.next_attempt_delay(&error, 1).await.is_some());
        assert!(client.next_attempt_delay(&error, 100).await.is_none());
    }

    #[test]
    fn connect_uses_the_given_url() {
        let client = JsonRpcClient::connect("https://rpc.example.com");
        assert_eq!(client.url(), "https://rpc.example.com");
        assert!(!client.request().allow_gzip());
    }

    #[test]
    fn client_debug_names_the_endpoint() {
        let client = JsonRpcClient::connect("https://rpc.example.com");
        let debug = format!("{client:?}");
        assert!(debug.contains("rpc.example.com"), "debug={debug}");
    }

    #[tokio::test]
    async fn detection_caches_the_first_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x315",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = JsonRpcClient::connect(server.uri());

        // Chain 789 is outside the registry: the identity falls back to a
        // placeholder name carrying the real chain id.
        let first = client.network().await.unwrap();
        assert_eq!(first.name(), "unknown");
        assert_eq!(first.chain_id(), 789);

        // Answered from the cache; the mock's single-request expectation
        // is checked when the server drops.
        let second = client.network().await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn detection_resolves_registered_chains() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x89",
            })))
            .mount(&server)
            .await;

        let client = JsonRpcClient::connect(server.uri());
        let network = client.network().await.unwrap();
        assert_eq!(network.name(), "matic");
        assert_eq!(network.chain_id(), 137);
    }
}
