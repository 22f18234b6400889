//! Gateway profile errors.

use thiserror::Error;

use covrpc_core::network::NetworkError;

/// Errors raised while building a gateway-backed provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The gateway serves no endpoint for this network.
    ///
    /// A configuration error: fatal to the construction call, never
    /// retried.
    #[error("unsupported network (network: {name:?})")]
    UnsupportedNetwork { name: String },

    /// The network identity itself did not resolve.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// No provider could be built for this chain id.
    #[error("no provider available for chain {chain_id}")]
    NoProviderForChain { chain_id: u64 },
}
