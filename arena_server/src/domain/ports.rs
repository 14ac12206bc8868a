use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::Player;
use crate::domain::errors::SendError;
use crate::domain::events::OutboundEvent;

/// Serialized outbound message, shared by every recipient of one broadcast.
pub type Payload = Arc<str>;

/// Optional filters for `PlayerStore::query`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerFilter {
    pub online_only: bool,
    // Only players holding a non-empty connection id.
    pub connected_only: bool,
    // Only players whose `last_active` is at or after this epoch-millis instant.
    pub active_since: Option<u64>,
}

impl PlayerFilter {
    pub fn live_connections() -> Self {
        Self {
            online_only: true,
            connected_only: true,
            active_since: None,
        }
    }

    pub fn matches(&self, player: &Player) -> bool {
        if self.online_only && !player.online {
            return false;
        }
        if self.connected_only && player.connection_id.as_deref().is_none_or(str::is_empty) {
            return false;
        }
        if let Some(since) = self.active_since
            && player.last_active < since
        {
            return false;
        }
        true
    }
}

/// Single-record update applied atomically by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerPatch {
    // Writes the position and proves liveness in the same update.
    Position {
        x: i32,
        y: i32,
        base_y: Option<f64>,
        at: u64,
    },
    IncrementScore { by: u64 },
    // Sets `online = false` and removes the connection id.
    MarkOffline,
    // Like `MarkOffline`, but only while the record still holds `connection_id`.
    ReleaseConnection { connection_id: String },
}

impl PlayerPatch {
    /// Applies the patch in place, returning whether the record changed.
    pub fn apply(&self, player: &mut Player) -> bool {
        match self {
            PlayerPatch::Position { x, y, base_y, at } => {
                player.x = *x;
                player.y = *y;
                player.base_y = *base_y;
                player.online = true;
                player.last_active = *at;
                true
            }
            PlayerPatch::IncrementScore { by } => {
                player.score = player.score.saturating_add(*by);
                true
            }
            PlayerPatch::MarkOffline => {
                let changed = player.online || player.connection_id.is_some();
                player.online = false;
                player.connection_id = None;
                changed
            }
            PlayerPatch::ReleaseConnection { connection_id } => {
                if player.connection_id.as_deref() != Some(connection_id.as_str()) {
                    return false;
                }
                player.online = false;
                player.connection_id = None;
                true
            }
        }
    }
}

// Port for the key-value player table, keyed by name with a connection-id index.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Player>, String>;
    // Insert or overwrite the whole record.
    async fn put(&self, player: Player) -> Result<(), String>;
    // Returns the updated record, or `None` without writing when the name is absent.
    async fn update(&self, name: &str, patch: PlayerPatch) -> Result<Option<Player>, String>;
    async fn find_by_connection(&self, connection_id: &str) -> Result<Option<Player>, String>;
    async fn query(&self, filter: PlayerFilter) -> Result<Vec<Player>, String>;
}

// Port for pushing a payload to one connection.
#[async_trait]
pub trait ConnectionSender: Send + Sync {
    async fn send(&self, connection_id: &str, payload: Payload) -> Result<(), SendError>;
}

// Port for encoding outbound events into wire payloads.
pub trait EventEncoder: Send + Sync {
    fn encode(&self, event: &OutboundEvent) -> Result<Payload, String>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}

#[async_trait]
impl<T> PlayerStore for Arc<T>
where
    T: PlayerStore + ?Sized,
{
    async fn get(&self, name: &str) -> Result<Option<Player>, String> {
        self.as_ref().get(name).await
    }

    async fn put(&self, player: Player) -> Result<(), String> {
        self.as_ref().put(player).await
    }

    async fn update(&self, name: &str, patch: PlayerPatch) -> Result<Option<Player>, String> {
        self.as_ref().update(name, patch).await
    }

    async fn find_by_connection(&self, connection_id: &str) -> Result<Option<Player>, String> {
        self.as_ref().find_by_connection(connection_id).await
    }

    async fn query(&self, filter: PlayerFilter) -> Result<Vec<Player>, String> {
        self.as_ref().query(filter).await
    }
}

#[async_trait]
impl<T> ConnectionSender for Arc<T>
where
    T: ConnectionSender + ?Sized,
{
    async fn send(&self, connection_id: &str, payload: Payload) -> Result<(), SendError> {
        self.as_ref().send(connection_id, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::spawn("Bob", "conn-b", 100)
    }

    #[test]
    fn live_connection_filter_skips_offline_and_unbound_players() {
        let filter = PlayerFilter::live_connections();
        let mut bob = player();
        assert!(filter.matches(&bob));

        bob.connection_id = None;
        assert!(!filter.matches(&bob));

        bob.connection_id = Some("conn-b".to_string());
        bob.online = false;
        assert!(!filter.matches(&bob));
    }

    #[test]
    fn active_since_filter_is_inclusive() {
        let filter = PlayerFilter {
            active_since: Some(100),
            ..PlayerFilter::default()
        };
        assert!(filter.matches(&player()));

        let stale = Player {
            last_active: 99,
            ..player()
        };
        assert!(!filter.matches(&stale));
    }

    #[test]
    fn release_connection_only_clears_the_matching_binding() {
        let mut bob = player();
        let stale = PlayerPatch::ReleaseConnection {
            connection_id: "conn-old".to_string(),
        };
        assert!(!stale.apply(&mut bob));
        assert!(bob.online);

        let current = PlayerPatch::ReleaseConnection {
            connection_id: "conn-b".to_string(),
        };
        assert!(current.apply(&mut bob));
        assert!(!bob.online);
        assert_eq!(bob.connection_id, None);
    }

    #[test]
    fn mark_offline_is_idempotent() {
        let mut bob = player();
        assert!(PlayerPatch::MarkOffline.apply(&mut bob));
        assert!(!PlayerPatch::MarkOffline.apply(&mut bob));
        assert!(!bob.online);
    }
}
