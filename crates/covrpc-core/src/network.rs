//! Logical network identities and the name ↔ chain-id registry.
//!
//! Gateway profiles accept a [`Networkish`] — a name, a chain id, or an
//! already-built [`Network`] — and normalize it through [`Network::resolve`]
//! before touching their own endpoint tables. The registry here is
//! gateway-agnostic: it knows canonical names and chain ids, nothing about
//! who serves them.

use thiserror::Error;

/// Well-known networks, by canonical name and chain id.
const KNOWN_NETWORKS: &[(&str, u64)] = &[
    ("mainnet", 1),
    ("goerli", 5),
    ("sepolia", 11_155_111),
    ("holesky", 17_000),
    ("classic", 61),
    ("arbitrum", 42_161),
    ("arbitrum-goerli", 421_613),
    ("arbitrum-sepolia", 421_614),
    ("base", 8_453),
    ("base-goerli", 84_531),
    ("base-sepolia", 84_532),
    ("bnb", 56),
    ("bnbt", 97),
    ("linea", 59_144),
    ("matic", 137),
    ("matic-mumbai", 80_001),
    ("optimism", 10),
    ("optimism-goerli", 420),
    ("optimism-sepolia", 11_155_420),
    ("xdai", 100),
];

/// Failed to resolve a network identity.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The name is not in the registry.
    #[error("unknown network name: {name:?}")]
    UnknownNetwork { name: String },

    /// The chain id is not in the registry.
    #[error("unknown chain id: {chain_id}")]
    UnknownChainId { chain_id: u64 },
}

/// A resolved network identity: a name and its chain id.
///
/// Registry lookups produce canonical pairs; [`Network::new`] is open so
/// callers can describe networks the registry does not know (a detected
/// chain, a private deployment).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Network {
    name: String,
    chain_id: u64,
}

impl Network {
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            chain_id,
        }
    }

    /// Ethereum mainnet.
    pub fn mainnet() -> Self {
        Self::new("mainnet", 1)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Look up a canonical name in the registry.
    pub fn from_name(name: &str) -> Result<Self, NetworkError> {
        KNOWN_NETWORKS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(known, chain_id)| Self::new(*known, *chain_id))
            .ok_or_else(|| NetworkError::UnknownNetwork {
                name: name.to_string(),
            })
    }

    /// Look up a chain id in the registry.
    pub fn from_chain_id(chain_id: u64) -> Result<Self, NetworkError> {
        KNOWN_NETWORKS
            .iter()
            .find(|(_, known)| *known == chain_id)
            .map(|(name, known)| Self::new(*name, *known))
            .ok_or(NetworkError::UnknownChainId { chain_id })
    }

    /// Normalize any [`Networkish`] into a `Network`.
    ///
    /// Names and chain ids go through the registry; an existing identity
    /// passes through untouched.
    pub fn resolve(network: impl Into<Networkish>) -> Result<Self, NetworkError> {
        match network.into() {
            Networkish::Name(name) => Self::from_name(&name),
            Networkish::ChainId(chain_id) => Self::from_chain_id(chain_id),
            Networkish::Network(network) => Ok(network),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (chain {})", self.name, self.chain_id)
    }
}

/// Anything that names a network: a registry name, a chain id, or a
/// ready-made [`Network`].
#[derive(Debug, Clone)]
pub enum Networkish {
    Name(String),
    ChainId(u64),
    Network(Network),
}

impl From<&str> for Networkish {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Networkish {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<u64> for Networkish {
    fn from(chain_id: u64) -> Self {
        Self::ChainId(chain_id)
    }
}

impl From<Network> for Networkish {
    fn from(network: Network) -> Self {
        Self::Network(network)
    }
}

impl TryFrom<Networkish> for Network {
    type Error = NetworkError;

    fn try_from(network: Networkish) -> Result<Self, Self::Error> {
        Self::resolve(network)
    }
}
