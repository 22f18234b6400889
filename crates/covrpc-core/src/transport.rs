//! The `RpcTransport` trait — the seam between gateway profiles and the
//! transports that carry their requests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{next_request_id, RpcRequest, RpcResponse};

/// The central async trait every RPC transport implements.
///
/// # Thread safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
///
/// # Object safety
/// The trait is object-safe and can be stored as `Arc<dyn RpcTransport>`;
/// only [`call_as`](RpcTransport::call_as) is restricted to sized types.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: RpcRequest) -> Result<RpcResponse, TransportError>;

    /// Send a batch of JSON-RPC requests.
    ///
    /// Responses must come back in request order regardless of the order the
    /// gateway answered in. The default implementation sends sequentially;
    /// transports with true batch support override it.
    async fn send_batch(
        &self,
        reqs: Vec<RpcRequest>,
    ) -> Result<Vec<RpcResponse>, TransportError> {
        let mut responses = Vec::with_capacity(reqs.len());
        for req in reqs {
            responses.push(self.send(req).await?);
        }
        Ok(responses)
    }

    /// The transport's endpoint identifier (URL or name), for logs.
    fn url(&self) -> &str;

    /// Call a method and return the raw result value.
    ///
    /// Ids come from the process-wide counter, so the method needs no
    /// per-instance state and stays usable on trait objects.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let req = RpcRequest::new(next_request_id(), method, params);
        let resp = self.send(req).await?;
        resp.into_result().map_err(TransportError::Rpc)
    }

    /// Typed variant of [`call`](RpcTransport::call).
    async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError>
    where
        Self: Sized,
    {
        let value = self.call(method, params).await?;
        serde_json::from_value(value).map_err(TransportError::Deserialization)
    }
}
