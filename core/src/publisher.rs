//! Publisher (C4): the collaborator boundary downstream of the core
//! (spec.md §4.4). Exposes only `publish`/`close`; the implementation is
//! responsible for its own retry, ordering-within-partition, and
//! success/error reporting. Grounded on
//! `original_source/handlers/events/kafka/handler.go`'s
//! `MessageProducer.Produce` (bounded, logs internally, surfaces only a
//! wrapped error) generalized to the sink-agnostic shape `common::config::
//! SinkConfig` describes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use common::config::SinkConfig;
use common::err::{CdcError, CdcResult, ErrorKind};

use crate::translate::CanonicalMessage;

const PKG: &str = "core::publisher";

/// Bounded enqueue depth for the channel-backed publishers (spec.md §5:
/// "Publisher enqueue (bounded; may briefly block the decoder callback
/// thread if full)").
const ENQUEUE_CAPACITY: usize = 1024;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Enqueues `msg` for delivery. Returns once the message is queued,
    /// not once it is delivered — delivery retries happen inside the
    /// publisher, invisible to the worker (spec.md §4.5.4).
    async fn publish(&self, msg: CanonicalMessage) -> CdcResult<()>;

    /// Drains in-flight messages and releases resources. Idempotent.
    async fn close(&self) -> CdcResult<()>;
}

/// Builds the configured publisher. `Log` is used by default and in
/// tests; `Bus`/`Rpc` route through a bounded channel into a background
/// task that logs the delivery attempt, since the actual broker/RPC
/// client is outside the core's scope (spec.md §1, §4.4).
pub fn build_publisher(cfg: &SinkConfig) -> CdcResult<Arc<dyn Publisher>> {
    match cfg {
        SinkConfig::Log => Ok(Arc::new(LogPublisher::new())),
        SinkConfig::Bus { brokers, topic } => Ok(Arc::new(ChannelPublisher::spawn(
            format!("bus topic={} brokers={:?}", topic, brokers),
        ))),
        SinkConfig::Rpc { endpoint } => Ok(Arc::new(ChannelPublisher::spawn(format!(
            "rpc endpoint={}",
            endpoint
        )))),
    }
}

/// Publishes by logging at `info`; used as the default sink and in unit
/// tests that only care about translation/ordering, not delivery.
pub struct LogPublisher {
    published: Mutex<Vec<CanonicalMessage>>,
}

impl LogPublisher {
    pub fn new() -> Self {
        LogPublisher {
            published: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything published so far, in order. Used by tests
    /// verifying publish ordering (spec.md §8 property 7).
    pub async fn published(&self) -> Vec<CanonicalMessage> {
        self.published.lock().await.clone()
    }
}

impl Default for LogPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, msg: CanonicalMessage) -> CdcResult<()> {
        tracing::info!(
            action = %msg.action,
            schema = %msg.schema,
            table = %msg.table,
            key = %msg.routing_key(),
            "publish"
        );
        self.published.lock().await.push(msg);
        Ok(())
    }

    async fn close(&self) -> CdcResult<()> {
        Ok(())
    }
}

/// A bounded-channel publisher backing the `Bus`/`Rpc` sink kinds. A
/// background task drains the channel and logs each delivery; a real
/// deployment would swap the drain loop for an actual broker/RPC client
/// without touching the `Publisher` contract.
struct ChannelPublisher {
    tx: Mutex<Option<mpsc::Sender<CanonicalMessage>>>,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ChannelPublisher {
    fn spawn(sink_description: String) -> Self {
        let (tx, mut rx) = mpsc::channel::<CanonicalMessage>(ENQUEUE_CAPACITY);

        let worker = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                tracing::info!(
                    sink = %sink_description,
                    key = %msg.routing_key(),
                    action = %msg.action,
                    "deliver"
                );
            }
        });

        ChannelPublisher {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, msg: CanonicalMessage) -> CdcResult<()> {
        let guard = self.tx.lock().await;
        match guard.as_ref() {
            Some(tx) => tx
                .send(msg)
                .await
                .map_err(|e| CdcError::wrap(ErrorKind::Publisher, PKG, "publish channel closed", e)),
            None => Err(CdcError::new(ErrorKind::Publisher, PKG, "publisher already closed")),
        }
    }

    async fn close(&self) -> CdcResult<()> {
        // dropping the sender lets the drain loop's `rx.recv()` observe
        // end-of-stream and exit.
        self.tx.lock().await.take();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::translate::CanonicalMessage;
    use serde_json::Map;

    fn msg(key: &str) -> CanonicalMessage {
        let mut new_data = Map::new();
        new_data.insert("id".to_string(), serde_json::Value::String(key.into()));
        CanonicalMessage {
            action: "insert".into(),
            schema: "db".into(),
            table: "t".into(),
            pk: vec!["id".into()],
            old_data: Map::new(),
            new_data,
            ctimestamp: 0,
            mtimestamp: 0,
        }
    }

    #[tokio::test]
    async fn log_publisher_preserves_order() {
        let publisher = LogPublisher::new();
        publisher.publish(msg("1")).await.unwrap();
        publisher.publish(msg("2")).await.unwrap();
        publisher.publish(msg("3")).await.unwrap();

        let published = publisher.published().await;
        let keys: Vec<_> = published.iter().map(|m| m.routing_key()).collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
    }

    #[test]
    fn build_publisher_defaults_to_log() {
        let publisher = build_publisher(&SinkConfig::Log).unwrap();
        let _ = publisher;
    }
}
