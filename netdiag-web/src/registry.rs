//! Connected-client registry.
//!
//! The only state shared across sessions. Delivery is best-effort: a send
//! that fails for one client is logged and swallowed, never aborting
//! delivery to the rest or the broadcasting session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use netdiag_toolbox::{DiagnosticEvent, EventSink};

/// Registry of live client connections keyed by connection id.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Uuid, Arc<dyn EventSink>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's event sink.
    pub async fn add(&self, id: Uuid, sink: Arc<dyn EventSink>) {
        self.connections.write().await.insert(id, sink);
    }

    /// Drop a connection.
    pub async fn remove(&self, id: Uuid) {
        self.connections.write().await.remove(&id);
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send an event to every connected client.
    pub async fn broadcast_all(&self, event: &DiagnosticEvent) {
        self.broadcast(event, None).await;
    }

    /// Send an event to every connected client except `sender`.
    pub async fn broadcast_except(&self, sender: Uuid, event: &DiagnosticEvent) {
        self.broadcast(event, Some(sender)).await;
    }

    async fn broadcast(&self, event: &DiagnosticEvent, skip: Option<Uuid>) {
        // snapshot under the read lock so sends never hold it
        let targets: Vec<(Uuid, Arc<dyn EventSink>)> = self
            .connections
            .read()
            .await
            .iter()
            .filter(|(id, _)| Some(**id) != skip)
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect();

        for (id, sink) in targets {
            if let Err(e) = sink.send(event.clone()).await {
                tracing::debug!("broadcast to {id} failed: {e}");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use netdiag_toolbox::{DiagError, DiagResult};

    use super::*;

    struct TestSink {
        received: Mutex<Vec<DiagnosticEvent>>,
        fail: bool,
    }

    impl TestSink {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                received: Mutex::new(Vec::new()),
                fail,
            })
        }

        fn count(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EventSink for TestSink {
        async fn send(&self, event: DiagnosticEvent) -> DiagResult<()> {
            if self.fail {
                return Err(DiagError::ChannelClosed);
            }
            self.received.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn sample_event() -> DiagnosticEvent {
        DiagnosticEvent::Connected {
            message: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_remove_len() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        registry.add(id, TestSink::new(false)).await;
        assert_eq!(registry.len().await, 1);
        registry.remove(id).await;
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_all_reaches_everyone() {
        let registry = ConnectionRegistry::new();
        let a = TestSink::new(false);
        let b = TestSink::new(false);
        registry.add(Uuid::new_v4(), a.clone()).await;
        registry.add(Uuid::new_v4(), b.clone()).await;

        registry.broadcast_all(&sample_event()).await;
        assert_eq!(a.count(), 1);
        assert_eq!(b.count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_sender() {
        let registry = ConnectionRegistry::new();
        let sender_id = Uuid::new_v4();
        let sender = TestSink::new(false);
        let other = TestSink::new(false);
        registry.add(sender_id, sender.clone()).await;
        registry.add(Uuid::new_v4(), other.clone()).await;

        registry.broadcast_except(sender_id, &sample_event()).await;
        assert_eq!(sender.count(), 0);
        assert_eq!(other.count(), 1);
    }

    #[tokio::test]
    async fn test_one_failing_sink_does_not_block_others() {
        let registry = ConnectionRegistry::new();
        let broken = TestSink::new(true);
        let healthy = TestSink::new(false);
        registry.add(Uuid::new_v4(), broken).await;
        registry.add(Uuid::new_v4(), healthy.clone()).await;

        registry.broadcast_all(&sample_event()).await;
        assert_eq!(healthy.count(), 1);
    }
}
