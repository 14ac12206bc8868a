// Presence registry: binds connections to named players and tracks who is online.

use tracing::{debug, info};

use crate::domain::entities::{LiveConnection, Player};
use crate::domain::errors::GameError;
use crate::domain::ports::{Clock, PlayerFilter, PlayerPatch, PlayerStore};

// Keep names compact and readable for game UI and logs.
pub const MAX_NAME_LEN: usize = 32;

// Result of binding a connection to a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub player: Player,
    // Previous connection that the new binding replaced, if any.
    pub superseded: Option<String>,
}

#[derive(Clone)]
pub struct PresenceRegistry<S, C> {
    pub store: S,
    pub clock: C,
}

impl<S, C> PresenceRegistry<S, C>
where
    S: PlayerStore,
    C: Clock,
{
    // Binds `connection_id` to `name`, keeping score and position of an existing record.
    pub async fn register(&self, name: &str, connection_id: &str) -> Result<Registration, GameError> {
        let name = validate_name(name)?;
        if connection_id.is_empty() {
            return Err(GameError::MalformedPayload("connection id is required".to_string()));
        }
        let now = self.clock.now_epoch_millis();

        let existing = self.store.get(&name).await.map_err(GameError::StoreUnavailable)?;
        let (player, superseded) = match existing {
            Some(previous) => {
                let superseded = previous
                    .connection_id
                    .clone()
                    .filter(|old| old != connection_id && !old.is_empty());
                let player = Player {
                    online: true,
                    connection_id: Some(connection_id.to_string()),
                    last_active: now,
                    ..previous
                };
                (player, superseded)
            }
            None => (Player::spawn(name.clone(), connection_id, now), None),
        };

        self.store
            .put(player.clone())
            .await
            .map_err(GameError::StoreUnavailable)?;

        if let Some(old) = &superseded {
            info!(player = %name, old_connection = %old, "connection superseded");
        }
        debug!(player = %name, connection_id, x = player.x, y = player.y, "player registered");

        Ok(Registration { player, superseded })
    }

    pub async fn find_by_connection(&self, connection_id: &str) -> Result<Player, GameError> {
        self.store
            .find_by_connection(connection_id)
            .await
            .map_err(GameError::StoreUnavailable)?
            .ok_or_else(|| GameError::PlayerNotFound(connection_id.to_string()))
    }

    // Marks the player offline and drops its connection id; a no-op for offline players.
    pub async fn mark_offline(&self, name: &str) -> Result<(), GameError> {
        // Missing players count as already offline.
        self.store
            .update(name, PlayerPatch::MarkOffline)
            .await
            .map_err(GameError::StoreUnavailable)?;
        Ok(())
    }

    // Marks the player offline only if it still owns `connection_id`.
    // Returns true when the binding was released.
    pub async fn release_connection(&self, name: &str, connection_id: &str) -> Result<bool, GameError> {
        let before = self.store.get(name).await.map_err(GameError::StoreUnavailable)?;
        let owns = before
            .as_ref()
            .is_some_and(|p| p.connection_id.as_deref() == Some(connection_id));
        if !owns {
            return Ok(false);
        }

        let patch = PlayerPatch::ReleaseConnection {
            connection_id: connection_id.to_string(),
        };
        let after = self
            .store
            .update(name, patch)
            .await
            .map_err(GameError::StoreUnavailable)?;
        Ok(after.is_some_and(|p| p.connection_id.is_none()))
    }

    // Point-in-time list of players believed reachable.
    pub async fn live_connections(&self) -> Result<Vec<LiveConnection>, GameError> {
        let players = self
            .store
            .query(PlayerFilter::live_connections())
            .await
            .map_err(GameError::StoreUnavailable)?;
        Ok(players.iter().filter_map(Player::live_connection).collect())
    }
}

pub fn validate_name(value: &str) -> Result<String, GameError> {
    let name = value.trim();
    if name.is_empty() {
        return Err(GameError::MalformedPayload("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::MalformedPayload("name is too long".to_string()));
    }
    Ok(name.to_string())
}
