// Registry of live sockets on this process, addressed by connection id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock, mpsc};
use tracing::debug;

use crate::domain::errors::SendError;
use crate::domain::ports::{ConnectionSender, Payload};

struct Outbox {
    sender: mpsc::Sender<Payload>,
    // Signals the socket task to close, e.g. when a newer connection takes over.
    shutdown: Arc<Notify>,
}

// Socket-side half of a registered connection.
pub struct ConnectionHandle {
    pub outbound: mpsc::Receiver<Payload>,
    pub shutdown: Arc<Notify>,
}

#[derive(Clone, Default)]
pub struct ConnectionHub {
    connections: Arc<RwLock<HashMap<String, Outbox>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    // Registers a socket with a bounded outbound queue.
    pub async fn open(&self, connection_id: &str, capacity: usize) -> ConnectionHandle {
        let (sender, outbound) = mpsc::channel(capacity.max(1));
        let shutdown = Arc::new(Notify::new());
        let mut connections = self.connections.write().await;
        connections.insert(
            connection_id.to_string(),
            Outbox {
                sender,
                shutdown: shutdown.clone(),
            },
        );
        ConnectionHandle { outbound, shutdown }
    }

    pub async fn remove(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        connections.remove(connection_id);
    }

    // Asks the socket task to close; returns false if the connection is not on this process.
    pub async fn close(&self, connection_id: &str) -> bool {
        let connections = self.connections.read().await;
        match connections.get(connection_id) {
            Some(outbox) => {
                // notify_one stores a permit if the task is not currently waiting.
                outbox.shutdown.notify_one();
                true
            }
            None => false,
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[async_trait]
impl ConnectionSender for ConnectionHub {
    async fn send(&self, connection_id: &str, payload: Payload) -> Result<(), SendError> {
        let sender = {
            let connections = self.connections.read().await;
            match connections.get(connection_id) {
                Some(outbox) => outbox.sender.clone(),
                None => return Err(SendError::Gone),
            }
        };

        match sender.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(connection_id, "outbound queue full");
                Err(SendError::Failed("outbound queue full".to_string()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Gone),
        }
    }
}
