use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::Player;
use crate::domain::errors::SendError;
use crate::domain::ports::{Clock, ConnectionSender, Payload, PlayerFilter, PlayerPatch, PlayerStore};

pub(crate) type PlayerTable = Arc<Mutex<HashMap<String, Player>>>;

// Shared fixed time source for deterministic use-case tests.
#[derive(Clone, Copy)]
pub(crate) struct FixedClock(pub(crate) u64);

impl Clock for FixedClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub get: bool,
    pub put: bool,
    pub update: bool,
    pub find: bool,
    pub query: bool,
}

#[derive(Clone)]
pub(crate) struct RecordingStore {
    players: PlayerTable,
    failures: Arc<Mutex<FailureFlags>>,
    patches: Arc<Mutex<Vec<(String, PlayerPatch)>>>,
    puts: Arc<Mutex<u32>>,
    // Applied before every operation.
    latency: Arc<Mutex<Option<Duration>>>,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self {
            players: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(FailureFlags::default())),
            patches: Arc::new(Mutex::new(Vec::new())),
            puts: Arc::new(Mutex::new(0)),
            latency: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("latency mutex poisoned") = Some(latency);
    }

    pub(crate) fn with_failures(self, failures: FailureFlags) -> Self {
        self.set_failures(failures);
        self
    }

    pub(crate) fn set_failures(&self, failures: FailureFlags) {
        *self.failures.lock().expect("failures mutex poisoned") = failures;
    }

    pub(crate) fn insert_test_player(&self, player: Player) {
        let mut guard = self.players.lock().expect("players mutex poisoned");
        guard.insert(player.name.clone(), player);
    }

    pub(crate) fn get_test_player(&self, name: &str) -> Option<Player> {
        let guard = self.players.lock().expect("players mutex poisoned");
        guard.get(name).cloned()
    }

    pub(crate) fn patches(&self) -> Vec<(String, PlayerPatch)> {
        self.patches.lock().expect("patches mutex poisoned").clone()
    }

    pub(crate) fn write_count(&self) -> usize {
        let puts = *self.puts.lock().expect("puts mutex poisoned") as usize;
        puts + self.patches().len()
    }

    fn failures(&self) -> FailureFlags {
        *self.failures.lock().expect("failures mutex poisoned")
    }

    async fn wait(&self) {
        let latency = *self.latency.lock().expect("latency mutex poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PlayerStore for RecordingStore {
    async fn get(&self, name: &str) -> Result<Option<Player>, String> {
        self.wait().await;
        if self.failures().get {
            return Err("get failed".to_string());
        }

        let guard = self.players.lock().expect("players mutex poisoned");
        Ok(guard.get(name).cloned())
    }

    async fn put(&self, player: Player) -> Result<(), String> {
        self.wait().await;
        if self.failures().put {
            return Err("put failed".to_string());
        }

        *self.puts.lock().expect("puts mutex poisoned") += 1;
        let mut guard = self.players.lock().expect("players mutex poisoned");
        guard.insert(player.name.clone(), player);
        Ok(())
    }

    async fn update(&self, name: &str, patch: PlayerPatch) -> Result<Option<Player>, String> {
        self.wait().await;
        if self.failures().update {
            return Err("update failed".to_string());
        }

        let mut guard = self.players.lock().expect("players mutex poisoned");
        let Some(player) = guard.get_mut(name) else {
            return Ok(None);
        };
        patch.apply(player);
        self.patches
            .lock()
            .expect("patches mutex poisoned")
            .push((name.to_string(), patch));
        Ok(Some(player.clone()))
    }

    async fn find_by_connection(&self, connection_id: &str) -> Result<Option<Player>, String> {
        self.wait().await;
        if self.failures().find {
            return Err("find failed".to_string());
        }

        let guard = self.players.lock().expect("players mutex poisoned");
        Ok(guard
            .values()
            .find(|p| p.connection_id.as_deref() == Some(connection_id))
            .cloned())
    }

    async fn query(&self, filter: PlayerFilter) -> Result<Vec<Player>, String> {
        self.wait().await;
        if self.failures().query {
            return Err("query failed".to_string());
        }

        let guard = self.players.lock().expect("players mutex poisoned");
        let mut players: Vec<Player> = guard.values().filter(|p| filter.matches(p)).cloned().collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(players)
    }
}

// Fake transport: records delivered payloads and fails for configured connection ids.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    sent: Arc<Mutex<Vec<(String, Payload)>>>,
    gone: Arc<Mutex<HashSet<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    default_delay: Arc<Mutex<Option<Duration>>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark_gone(&self, connection_id: &str) {
        let mut guard = self.gone.lock().expect("gone mutex poisoned");
        guard.insert(connection_id.to_string());
    }

    pub(crate) fn mark_failing(&self, connection_id: &str) {
        let mut guard = self.failing.lock().expect("failing mutex poisoned");
        guard.insert(connection_id.to_string());
    }

    pub(crate) fn delay_all(&self, delay: Duration) {
        *self.default_delay.lock().expect("delay mutex poisoned") = Some(delay);
    }

    pub(crate) fn delay(&self, connection_id: &str, delay: Duration) {
        let mut guard = self.delays.lock().expect("delays mutex poisoned");
        guard.insert(connection_id.to_string(), delay);
    }

    pub(crate) fn sent(&self) -> Vec<(String, Payload)> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }

    pub(crate) fn sent_to(&self, connection_id: &str) -> Vec<serde_json::Value> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| id == connection_id)
            .map(|(_, payload)| serde_json::from_str(&payload).expect("payload should be json"))
            .collect()
    }
}

#[async_trait]
impl ConnectionSender for RecordingTransport {
    async fn send(&self, connection_id: &str, payload: Payload) -> Result<(), SendError> {
        let delay = self
            .delays
            .lock()
            .expect("delays mutex poisoned")
            .get(connection_id)
            .copied()
            .or(*self.default_delay.lock().expect("delay mutex poisoned"));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self
            .gone
            .lock()
            .expect("gone mutex poisoned")
            .contains(connection_id)
        {
            return Err(SendError::Gone);
        }
        if self
            .failing
            .lock()
            .expect("failing mutex poisoned")
            .contains(connection_id)
        {
            return Err(SendError::Failed("throttled".to_string()));
        }

        let mut guard = self.sent.lock().expect("sent mutex poisoned");
        guard.push((connection_id.to_string(), payload));
        Ok(())
    }
}

pub(crate) fn online_player(name: &str, connection_id: &str, x: i32, y: i32) -> Player {
    Player {
        x,
        y,
        ..Player::spawn(name, connection_id, 1_000)
    }
}
