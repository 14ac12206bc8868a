// Broadcast fan-out: best-effort delivery of one payload to many connections.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::entities::LiveConnection;
use crate::domain::errors::SendError;
use crate::domain::ports::{Clock, ConnectionSender, Payload, PlayerStore};
use crate::use_cases::presence::PresenceRegistry;

#[derive(Debug, Clone, Copy)]
pub struct FanoutSettings {
    // Upper bound on deliveries in flight for one broadcast.
    pub max_in_flight: usize,
    // Per-recipient delivery budget.
    pub send_timeout: Duration,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 64,
            send_timeout: Duration::from_secs(1),
        }
    }
}

// Per-broadcast outcome, connection ids sorted for stable logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub gone: Vec<String>,
    pub failed: Vec<String>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.gone.len() + self.failed.len()
    }
}

enum Outcome {
    Delivered(String),
    Gone(String),
    Failed(String),
}

#[derive(Clone)]
pub struct BroadcastFanout<S, T, C> {
    pub presence: PresenceRegistry<S, C>,
    pub transport: T,
    pub settings: FanoutSettings,
}

impl<S, T, C> BroadcastFanout<S, T, C>
where
    S: PlayerStore + Clone,
    T: ConnectionSender + Clone,
    C: Clock + Clone,
{
    // Delivers `payload` to every connection concurrently and waits for all of them.
    // A gone recipient is released in the presence registry; no failure affects siblings.
    pub async fn deliver(&self, connections: &[LiveConnection], payload: Payload) -> DeliveryReport {
        // Deliveries own their handles; the batch must not borrow per-item data.
        let deliveries: Vec<_> = connections
            .iter()
            .cloned()
            .map(|connection| {
                let transport = self.transport.clone();
                let presence = self.presence.clone();
                let payload = payload.clone();
                let send_timeout = self.settings.send_timeout;
                async move { deliver_one(transport, presence, send_timeout, connection, payload).await }
            })
            .collect();

        let outcomes: Vec<Outcome> = stream::iter(deliveries)
            .buffer_unordered(self.settings.max_in_flight.max(1))
            .collect()
            .await;

        let mut report = DeliveryReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Delivered(id) => report.delivered.push(id),
                Outcome::Gone(id) => report.gone.push(id),
                Outcome::Failed(id) => report.failed.push(id),
            }
        }
        report.delivered.sort();
        report.gone.sort();
        report.failed.sort();

        debug!(
            recipients = connections.len(),
            delivered = report.delivered.len(),
            gone = report.gone.len(),
            failed = report.failed.len(),
            "broadcast finished"
        );
        report
    }
}

async fn deliver_one<S, T, C>(
    transport: T,
    presence: PresenceRegistry<S, C>,
    send_timeout: Duration,
    connection: LiveConnection,
    payload: Payload,
) -> Outcome
where
    S: PlayerStore,
    T: ConnectionSender,
    C: Clock,
{
    let LiveConnection {
        connection_id: id,
        name,
    } = connection;
    let sent = timeout(send_timeout, transport.send(&id, payload)).await;

    match sent {
        Ok(Ok(())) => Outcome::Delivered(id),
        Ok(Err(SendError::Gone)) => {
            info!(connection_id = %id, player = %name, "cleaning up stale connection");
            // Compensating write is best-effort.
            if let Err(err) = presence.release_connection(&name, &id).await {
                warn!(connection_id = %id, player = %name, error = %err, "stale connection cleanup failed");
            }
            Outcome::Gone(id)
        }
        Ok(Err(SendError::Failed(reason))) => {
            warn!(connection_id = %id, player = %name, %reason, "delivery failed");
            Outcome::Failed(id)
        }
        Err(_) => {
            warn!(connection_id = %id, player = %name, "delivery timed out");
            Outcome::Failed(id)
        }
    }
}
