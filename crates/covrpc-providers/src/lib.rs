//! covrpc-providers — pre-configured gateway profiles for covrpc.
//!
//! Each profile knows a gateway's URL layout, shared-token policy and
//! supported networks, and builds ready-to-use clients on top of
//! [`covrpc_http::JsonRpcClient`].
//!
//! # Quick start
//! ```rust
//! use covrpc_core::RpcTransport;
//! use covrpc_providers::CovalentProvider;
//!
//! let provider = CovalentProvider::new("sepolia").unwrap();
//! assert!(provider.url().contains("eth-sepolia"));
//! ```

pub mod community;
pub mod covalent;
pub mod error;

pub use community::{show_throttle_message, CommunityResourcable};
pub use covalent::CovalentProvider;
pub use error::ProviderError;
