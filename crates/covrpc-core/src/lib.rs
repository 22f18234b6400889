//! covrpc-core — foundation traits and types for covrpc.
//!
//! # Overview
//!
//! covrpc connects JSON-RPC callers to hosted Ethereum-compatible gateways.
//! The core crate defines everything a transport or gateway profile needs:
//!
//! - [`RpcTransport`] — the central async trait every transport implements
//! - [`RpcRequest`] / [`RpcResponse`] — wire types
//! - [`Network`] / [`Networkish`] — logical network identities
//! - [`TransportError`] — structured error type
//! - [`retry`] module — the backoff schedule bounding retry attempts

pub mod error;
pub mod network;
pub mod request;
pub mod retry;
pub mod transport;

pub use error::TransportError;
pub use network::{Network, NetworkError, Networkish};
pub use request::{next_request_id, RpcError, RpcId, RpcRequest, RpcResponse};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::RpcTransport;
