//! Connection descriptors: where to fetch, and how the endpoint's operator
//! wants it fetched.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use covrpc_core::error::TransportError;

/// Ruling issued before each retry of a failed request.
///
/// A hook can veto a retry the backoff schedule would otherwise allow; it
/// can never extend the schedule past the configured attempt bound. Hosted
/// gateways attach hooks to surface throttling notices or to abandon
/// endpoints that stopped being worth retrying.
#[async_trait]
pub trait RetryHook: Send + Sync + 'static {
    /// Return `false` to give up now instead of sleeping and retrying.
    async fn should_retry(
        &self,
        request: &FetchRequest,
        error: &TransportError,
        attempt: u32,
    ) -> bool;
}

/// Describes a connection to a JSON-RPC endpoint: the URL plus the transport
/// behavior wanted for it (response compression, retry rulings).
///
/// Gateway profiles build one of these and hand it to
/// [`JsonRpcClient::new`](crate::client::JsonRpcClient::new); the client
/// keeps the descriptor for the life of the connection.
#[derive(Clone)]
pub struct FetchRequest {
    url: String,
    allow_gzip: bool,
    retry_hook: Option<Arc<dyn RetryHook>>,
}

impl FetchRequest {
    /// Descriptor for `url` with default behavior: no compression, no hook.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            allow_gzip: false,
            retry_hook: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn allow_gzip(&self) -> bool {
        self.allow_gzip
    }

    /// Advertise to the endpoint that gzip-compressed response bodies are
    /// acceptable.
    pub fn set_allow_gzip(mut self, allow: bool) -> Self {
        self.allow_gzip = allow;
        self
    }

    /// Attach a retry ruling hook.
    pub fn set_retry_hook(mut self, hook: Arc<dyn RetryHook>) -> Self {
        self.retry_hook = Some(hook);
        self
    }

    pub fn retry_hook(&self) -> Option<&dyn RetryHook> {
        self.retry_hook.as_deref()
    }

    pub fn has_retry_hook(&self) -> bool {
        self.retry_hook.is_some()
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("url", &self.url)
            .field("allow_gzip", &self.allow_gzip)
            .field("retry_hook", &self.retry_hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysRetry;

    #[async_trait]
    impl RetryHook for AlwaysRetry {
        async fn should_retry(
            &self,
            _request: &FetchRequest,
            _error: &TransportError,
            _attempt: u32,
        ) -> bool {
            true
        }
    }

    #[test]
    fn defaults_are_plain() {
        let req = FetchRequest::new("https://rpc.example.com");
        assert_eq!(req.url(), "https://rpc.example.com");
        assert!(!req.allow_gzip());
        assert!(!req.has_retry_hook());
        assert!(req.retry_hook().is_none());
    }

    #[test]
    fn builder_setters_stick() {
        let req = FetchRequest::new("https://rpc.example.com")
            .set_allow_gzip(true)
            .set_retry_hook(Arc::new(AlwaysRetry));
        assert!(req.allow_gzip());
        assert!(req.has_retry_hook());
    }

    #[test]
    fn debug_shows_hook_presence_not_contents() {
        let req = FetchRequest::new("https://rpc.example.com")
            .set_retry_hook(Arc::new(AlwaysRetry));
        let debug = format!("{req:?}");
        assert!(debug.contains("retry_hook: true"), "debug={debug}");
    }

    #[tokio::test]
    async fn hook_is_reachable_through_the_descriptor() {
        let req = FetchRequest::new("https://rpc.example.com")
            .set_retry_hook(Arc::new(AlwaysRetry));
        let hook = req.retry_hook().unwrap();
        let error = TransportError::Throttled { status: 429 };
        assert!(hook.should_retry(&req, &error, 1).await);
    }
}
