//! covrpc-http — HTTP JSON-RPC transport for covrpc.
//!
//! [`JsonRpcClient`] carries requests over HTTP with retry, per-connection
//! hooks and cached network detection. [`BatchingTransport`] coalesces
//! concurrent requests into HTTP batch calls. [`FetchRequest`] is the
//! connection descriptor gateway profiles hand to the client.

pub mod batch;
pub mod client;
pub mod fetch;

pub use batch::{BatchConfig, BatchingTransport};
pub use client::{JsonRpcClient, JsonRpcClientConfig};
pub use fetch::{FetchRequest, RetryHook};
