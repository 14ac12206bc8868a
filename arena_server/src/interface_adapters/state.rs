use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::domain::entities::Player;
use crate::domain::ports::{Clock, PlayerFilter, PlayerPatch, PlayerStore};
use crate::interface_adapters::hub::ConnectionHub;
use crate::interface_adapters::protocol::JsonEncoder;
use crate::use_cases::EventDispatcher;

pub type ArenaDispatcher = EventDispatcher<InMemoryPlayerStore, ConnectionHub, SystemClock, JsonEncoder>;

// Application state shared by every route and socket task.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ArenaDispatcher>,
    // Outbound queues of the sockets served by this process.
    pub hub: ConnectionHub,
    pub outbound_capacity: usize,
    // Consecutive unparseable frames tolerated before the socket is closed.
    pub max_invalid_messages: u32,
}

#[derive(Default)]
struct PlayerTable {
    players: HashMap<String, Player>,
    // connection id -> player name
    by_connection: HashMap<String, String>,
}

impl PlayerTable {
    fn unindex(&mut self, player: &Player) {
        if let Some(id) = &player.connection_id
            && self.by_connection.get(id) == Some(&player.name)
        {
            self.by_connection.remove(id);
        }
    }

    fn index(&mut self, player: &Player) {
        if let Some(id) = player.connection_id.as_ref().filter(|id| !id.is_empty()) {
            self.by_connection.insert(id.clone(), player.name.clone());
        }
    }

    fn replace(&mut self, player: Player) {
        if let Some(previous) = self.players.remove(&player.name) {
            self.unindex(&previous);
        }
        self.index(&player);
        self.players.insert(player.name.clone(), player);
    }
}

// In-memory player table adapter; record and index change under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryPlayerStore {
    table: Arc<RwLock<PlayerTable>>,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerStore for InMemoryPlayerStore {
    async fn get(&self, name: &str) -> Result<Option<Player>, String> {
        let table = self.table.read().await;
        Ok(table.players.get(name).cloned())
    }

    async fn put(&self, player: Player) -> Result<(), String> {
        let mut table = self.table.write().await;
        table.replace(player);
        Ok(())
    }

    async fn update(&self, name: &str, patch: PlayerPatch) -> Result<Option<Player>, String> {
        let mut table = self.table.write().await;
        let Some(mut player) = table.players.get(name).cloned() else {
            return Ok(None);
        };

        if patch.apply(&mut player) {
            table.replace(player.clone());
        }
        Ok(Some(player))
    }

    async fn find_by_connection(&self, connection_id: &str) -> Result<Option<Player>, String> {
        let table = self.table.read().await;
        let player = table
            .by_connection
            .get(connection_id)
            .and_then(|name| table.players.get(name))
            .filter(|p| p.connection_id.as_deref() == Some(connection_id))
            .cloned();
        Ok(player)
    }

    async fn query(&self, filter: PlayerFilter) -> Result<Vec<Player>, String> {
        let table = self.table.read().await;
        let mut players: Vec<Player> = table
            .players
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(players)
    }
}

// System clock adapter used by arena use cases.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> u64 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}
