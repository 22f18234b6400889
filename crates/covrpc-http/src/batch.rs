//! Auto-batching engine: coalesce multiple requests within a time window.
//!
//! The batcher collects [`RpcRequest`]s arriving within the window and
//! flushes them as a single HTTP batch request. Each caller gets their
//! response back via a `oneshot` channel.
//!
//! # Usage
//! ```rust,no_run
//! use covrpc_http::batch::{BatchConfig, BatchingTransport};
//! use covrpc_http::JsonRpcClient;
//! use std::sync::Arc;
//!
//! let client = Arc::new(JsonRpcClient::connect("https://rpc.example.com"));
//! let batcher = BatchingTransport::new(client, BatchConfig::default());
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time;

use covrpc_core::error::TransportError;
use covrpc_core::request::{RpcRequest, RpcResponse};
use covrpc_core::transport::RpcTransport;

type ResponseSender = oneshot::Sender<Result<RpcResponse, TransportError>>;

struct BatchItem {
    req: RpcRequest,
    tx: ResponseSender,
}

/// Configuration for [`BatchingTransport`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// How long to keep collecting after the first request arrives.
    pub window: Duration,
    /// Flush early once this many requests are pending.
    pub max_batch_len: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(5),
            max_batch_len: 100,
        }
    }
}

/// Auto-batching transport wrapper.
///
/// A background flush task groups pending requests and sends them through
/// the inner transport's [`send_batch`](RpcTransport::send_batch) once the
/// window closes or the batch is full.
pub struct BatchingTransport {
    inner: Arc<dyn RpcTransport>,
    tx: mpsc::UnboundedSender<BatchItem>,
}

impl BatchingTransport {
    /// Wrap `inner` and spawn the background flush task.
    pub fn new(inner: Arc<dyn RpcTransport>, config: BatchConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<BatchItem>();
        let batcher = Arc::new(Self {
            inner: inner.clone(),
            tx,
        });

        tokio::spawn(flush_loop(rx, inner, config));

        batcher
    }
}

async fn flush_loop(
    mut rx: mpsc::UnboundedReceiver<BatchItem>,
    transport: Arc<dyn RpcTransport>,
    config: BatchConfig,
) {
    loop {
        // Wait for the first item
        let first = match rx.recv().await {
            Some(item) => item,
            None => return, // channel closed
        };

        let mut batch = vec![first];

        // Collect until the window closes or the batch fills up
        let deadline = time::sleep(config.window);
        tokio::pin!(deadline);

        while batch.len() < config.max_batch_len {
            tokio::select! {
                _ = &mut deadline => break,
                item = rx.recv() => {
                    match item {
                        Some(i) => batch.push(i),
                        None => break,
                    }
                }
            }
        }

        flush(&transport, batch).await;
    }
}

async fn flush(transport: &Arc<dyn RpcTransport>, mut batch: Vec<BatchItem>) {
    if batch.len() == 1 {
        // Single item — skip batch overhead
        let item = batch.remove(0);
        let result = transport.send(item.req).await;
        let _ = item.tx.send(result);
        return;
    }

    let reqs: Vec<RpcRequest> = batch.iter().map(|b| b.req.clone()).collect();
    match transport.send_batch(reqs).await {
        Ok(responses) => {
            // send_batch returns responses in request order
            for (item, resp) in batch.into_iter().zip(responses.into_iter()) {
                let _ = item.tx.send(Ok(resp));
            }
        }
        Err(e) => {
            // Broadcast the failure to every caller in the batch
            for item in batch {
                let _ = item.tx.send(Err(clone_for_broadcast(&e)));
            }
        }
    }
}

/// Duplicate an error for fan-out, keeping the kinds a retry decision
/// depends on.
fn clone_for_broadcast(e: &TransportError) -> TransportError {
    match e {
        TransportError::Throttled { status } => TransportError::Throttled { status: *status },
        TransportError::Timeout { ms } => TransportError::Timeout { ms: *ms },
        TransportError::Status { status, body } => TransportError::Status {
            status: *status,
            body: body.clone(),
        },
        TransportError::Http(msg) => TransportError::Http(msg.clone()),
        other => TransportError::Other(other.to_string()),
    }
}

#[async_trait]
impl RpcTransport for BatchingTransport {
    async fn send(&self, req: RpcRequest) -> Result<RpcResponse, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(BatchItem { req, tx })
            .map_err(|_| TransportError::Other("batcher channel closed".into()))?;
        rx.await
            .map_err(|_| TransportError::Other("batcher task dropped".into()))?
    }

    async fn send_batch(
        &self,
        reqs: Vec<RpcRequest>,
    ) -> Result<Vec<RpcResponse>, TransportError> {
        // Caller already built a batch; pass it straight through.
        self.inner.send_batch(reqs).await
    }

    fn url(&self) -> &str {
        self.inner.url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Echoes ids back and records how requests arrived.
    struct RecordingTransport {
        url: String,
        batch_sizes: Mutex<Vec<usize>>,
        single_sends: AtomicUsize,
    }

    impl RecordingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                url: "https://rpc.example.com".into(),
                batch_sizes: Mutex::new(Vec::new()),
                single_sends: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RpcTransport for RecordingTransport {
        async fn send(&self, req: RpcRequest) -> Result<RpcResponse, TransportError> {
            self.single_sends.fetch_add(1, Ordering::Relaxed);
            Ok(RpcResponse::success(req.id, Value::from("single")))
        }

        async fn send_batch(
            &self,
            reqs: Vec<RpcRequest>,
        ) -> Result<Vec<RpcResponse>, TransportError> {
            self.batch_sizes.lock().unwrap().push(reqs.len());
            Ok(reqs
                .into_iter()
                .map(|req| {
                    let tag = format!("r{}", req.id);
                    RpcResponse::success(req.id, Value::from(tag))
                })
                .collect())
        }

        fn url(&self) -> &str {
            &self.url
        }
    }

    struct ThrottledTransport {
        url: String,
    }

    #[async_trait]
    impl RpcTransport for ThrottledTransport {
        async fn send(&self, _req: RpcRequest) -> Result<RpcResponse, TransportError> {
            Err(TransportError::Throttled { status: 429 })
        }

        async fn send_batch(
            &self,
            _reqs: Vec<RpcRequest>,
        ) -> Result<Vec<RpcResponse>, TransportError> {
            Err(TransportError::Throttled { status: 429 })
        }

        fn url(&self) -> &str {
            &self.url
        }
    }

    fn req(id: u64) -> RpcRequest {
        RpcRequest::new(id, "eth_blockNumber", vec![])
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_batch() {
        let inner = RecordingTransport::new();
        let batcher = BatchingTransport::new(
            inner.clone(),
            BatchConfig {
                window: Duration::from_millis(10),
                max_batch_len: 100,
            },
        );

        let responses =
            future::join_all([batcher.send(req(1)), batcher.send(req(2)), batcher.send(req(3))])
                .await;

        for (i, resp) in responses.into_iter().enumerate() {
            let resp = resp.unwrap();
            let want = format!("r{}", i + 1);
            assert_eq!(resp.result, Some(Value::from(want)));
        }
        assert_eq!(*inner.batch_sizes.lock().unwrap(), vec![3]);
        assert_eq!(inner.single_sends.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn lone_request_skips_batch_overhead() {
        let inner = RecordingTransport::new();
        let batcher = BatchingTransport::new(
            inner.clone(),
            BatchConfig {
                window: Duration::from_millis(5),
                max_batch_len: 100,
            },
        );

        let resp = batcher.send(req(7)).await.unwrap();
        assert_eq!(resp.result, Some(Value::from("single")));
        assert_eq!(inner.single_sends.load(Ordering::Relaxed), 1);
        assert!(inner.batch_sizes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_batches_flush_before_the_window_closes() {
        let inner = RecordingTransport::new();
        // Window far beyond test patience: only the length bound can flush.
        let batcher = BatchingTransport::new(
            inner.clone(),
            BatchConfig {
                window: Duration::from_secs(60),
                max_batch_len: 2,
            },
        );

        let responses = future::join_all([
            batcher.send(req(1)),
            batcher.send(req(2)),
            batcher.send(req(3)),
            batcher.send(req(4)),
        ])
        .await;

        for resp in responses {
            assert!(resp.unwrap().is_success());
        }
        assert_eq!(*inner.batch_sizes.lock().unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn batch_failure_reaches_every_caller_intact() {
        let inner = Arc::new(ThrottledTransport {
            url: "https://rpc.example.com".into(),
        });
        let batcher = BatchingTransport::new(
            inner,
            BatchConfig {
                window: Duration::from_millis(10),
                max_batch_len: 100,
            },
        );

        let responses = future::join_all([batcher.send(req(1)), batcher.send(req(2))]).await;
        for resp in responses {
            let err = resp.unwrap_err();
            assert!(err.is_throttle(), "got {err}");
        }
    }

    #[test]
    fn broadcast_clone_keeps_meaningful_kinds() {
        let throttled = clone_for_broadcast(&TransportError::Throttled { status: 429 });
        assert!(matches!(throttled, TransportError::Throttled { status: 429 }));

        let timeout = clone_for_broadcast(&TransportError::Timeout { ms: 30_000 });
        assert!(matches!(timeout, TransportError::Timeout { ms: 30_000 }));

        let other = clone_for_broadcast(&TransportError::InvalidResponse("bad".into()));
        assert!(matches!(other, TransportError::Other(_)));
    }
}
