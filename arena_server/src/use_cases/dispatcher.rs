// Per-event orchestration: one inbound event in, unicast replies and broadcasts out.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::domain::entities::{LiveConnection, Player, Vec3};
use crate::domain::errors::{GameError, SendError};
use crate::domain::events::{OutboundEvent, ShotSummary};
use crate::domain::ports::{
    Clock, ConnectionSender, EventEncoder, PlayerFilter, PlayerPatch, PlayerStore,
};
use crate::domain::systems::hit_detection;
use crate::domain::systems::movement::MoveCommand;
use crate::domain::tuning::ArenaTuning;
use crate::use_cases::fanout::{BroadcastFanout, DeliveryReport, FanoutSettings};
use crate::use_cases::movement::MovementProcessor;
use crate::use_cases::presence::PresenceRegistry;
use crate::use_cases::types::InboundEvent;

// Which players a `gameState` snapshot lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotPolicy {
    pub online_only: bool,
    // Only players written within this window; `None` lists everyone.
    pub active_window: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatcherSettings {
    pub tuning: ArenaTuning,
    pub snapshot: SnapshotPolicy,
    pub fanout: FanoutSettings,
    // Budget for the store work of one event; delivery is bounded per send instead.
    pub event_deadline: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            tuning: ArenaTuning::default(),
            snapshot: SnapshotPolicy::default(),
            fanout: FanoutSettings::default(),
            event_deadline: Duration::from_secs(3),
        }
    }
}

// What one handled event produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchSummary {
    pub broadcast: Option<DeliveryReport>,
    // Older connection replaced by a registration; the transport should close it.
    pub superseded: Option<String>,
}

// Outbound work decided by a handler once its writes are committed.
#[derive(Default)]
struct Delivery {
    reply: Option<OutboundEvent>,
    broadcast: Option<(Vec<LiveConnection>, OutboundEvent)>,
    superseded: Option<String>,
}

impl Delivery {
    fn reply(event: OutboundEvent) -> Self {
        Self {
            reply: Some(event),
            ..Self::default()
        }
    }

    fn broadcast(recipients: Vec<LiveConnection>, event: OutboundEvent) -> Self {
        Self {
            broadcast: Some((recipients, event)),
            ..Self::default()
        }
    }
}

pub struct EventDispatcher<S, T, C, E> {
    presence: PresenceRegistry<S, C>,
    movement: MovementProcessor<S, C>,
    fanout: BroadcastFanout<S, T, C>,
    store: S,
    transport: T,
    clock: C,
    encoder: E,
    settings: DispatcherSettings,
}

impl<S, T, C, E> EventDispatcher<S, T, C, E>
where
    S: PlayerStore + Clone,
    T: ConnectionSender + Clone,
    C: Clock + Clone,
    E: EventEncoder,
{
    pub fn new(store: S, transport: T, clock: C, encoder: E, settings: DispatcherSettings) -> Self {
        let presence = PresenceRegistry {
            store: store.clone(),
            clock: clock.clone(),
        };
        Self {
            movement: MovementProcessor {
                store: store.clone(),
                clock: clock.clone(),
                tuning: settings.tuning,
            },
            fanout: BroadcastFanout {
                presence: presence.clone(),
                transport: transport.clone(),
                settings: settings.fanout,
            },
            presence,
            store,
            transport,
            clock,
            encoder,
            settings,
        }
    }

    // Handles one event from `connection_id`. The deadline covers store work only;
    // once a handler commits, its reply and broadcast run to completion.
    // Failures get a unicast error, except disconnects, which have no caller left.
    pub async fn dispatch(
        &self,
        connection_id: &str,
        event: InboundEvent,
    ) -> Result<DispatchSummary, GameError> {
        let action = event.action();
        let span = info_span!("event", connection_id, action);

        async move {
            let handled = match timeout(self.settings.event_deadline, self.handle(connection_id, event)).await {
                Ok(handled) => handled,
                Err(_) => Err(GameError::DeadlineExceeded),
            };

            let delivery = match handled {
                Ok(delivery) => delivery,
                Err(err) => {
                    if action == "disconnect" {
                        warn!(error = %err, "disconnect handling failed");
                    } else {
                        self.reject(connection_id, &err).await;
                    }
                    return Err(err);
                }
            };

            if let Some(reply) = &delivery.reply {
                self.unicast(connection_id, reply).await;
            }
            let broadcast = match &delivery.broadcast {
                Some((recipients, event)) => self.broadcast(recipients, event).await,
                None => None,
            };
            Ok(DispatchSummary {
                broadcast,
                superseded: delivery.superseded,
            })
        }
        .instrument(span)
        .await
    }

    // Answers a rejected event with a unicast error to its originator.
    pub async fn reject(&self, connection_id: &str, err: &GameError) {
        match err {
            GameError::PlayerNotFound(_) | GameError::MalformedPayload(_) => {
                info!(connection_id, error = %err, "event rejected")
            }
            GameError::StoreUnavailable(_) | GameError::DeadlineExceeded => {
                error!(connection_id, error = %err, "event failed")
            }
        }
        let reply = OutboundEvent::Error {
            message: err.client_message(),
        };
        self.unicast(connection_id, &reply).await;
    }

    // Players listed by `gameState`, per the configured snapshot policy.
    pub async fn snapshot(&self) -> Result<Vec<Player>, GameError> {
        let policy = self.settings.snapshot;
        let active_since = policy.active_window.map(|window| {
            let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
            self.clock.now_epoch_millis().saturating_sub(window_ms)
        });
        let filter = PlayerFilter {
            online_only: policy.online_only,
            connected_only: false,
            active_since,
        };

        self.store
            .query(filter)
            .await
            .map_err(GameError::StoreUnavailable)
    }

    async fn handle(&self, connection_id: &str, event: InboundEvent) -> Result<Delivery, GameError> {
        match event {
            InboundEvent::Register { name } => self.on_register(connection_id, &name).await,
            InboundEvent::GetGameState => self.on_game_state().await,
            InboundEvent::MovePlayer { name, command } => self.on_move(&name, command).await,
            InboundEvent::Shoot {
                name,
                origin,
                direction,
            } => self.on_shoot(&name, origin, direction).await,
            InboundEvent::Disconnect => self.on_disconnect(connection_id).await,
        }
    }

    async fn on_register(&self, connection_id: &str, name: &str) -> Result<Delivery, GameError> {
        let registration = self.presence.register(name, connection_id).await?;
        let player = registration.player;
        info!(player = %player.name, "player joined");

        let others: Vec<LiveConnection> = self
            .presence
            .live_connections()
            .await?
            .into_iter()
            .filter(|c| c.connection_id != connection_id)
            .collect();

        Ok(Delivery {
            reply: Some(OutboundEvent::Registered {
                player: player.clone(),
            }),
            broadcast: Some((others, OutboundEvent::PlayerJoined { player })),
            superseded: registration.superseded,
        })
    }

    async fn on_game_state(&self) -> Result<Delivery, GameError> {
        let players = self.snapshot().await?;
        debug!(players = players.len(), "sending game state");
        Ok(Delivery::reply(OutboundEvent::GameState { players }))
    }

    async fn on_move(&self, name: &str, command: MoveCommand) -> Result<Delivery, GameError> {
        let moved = self.movement.apply_move(name, command).await?;
        debug!(player = %moved.name, x = moved.x, y = moved.y, "player moved");

        // The mover is included so its client can reconcile with the server position.
        let everyone = self.presence.live_connections().await?;
        let event = OutboundEvent::PlayerMoved {
            name: moved.name,
            x: moved.x,
            y: moved.y,
            base_y: moved.base_y,
        };
        Ok(Delivery::broadcast(everyone, event))
    }

    async fn on_shoot(&self, name: &str, origin: Vec3, direction: Vec3) -> Result<Delivery, GameError> {
        if !origin.is_finite() {
            return Err(GameError::MalformedPayload("origin must be finite".to_string()));
        }
        let unit = direction
            .normalized()
            .ok_or_else(|| GameError::MalformedPayload("direction must be a non-zero vector".to_string()))?;

        let shooter = self
            .store
            .get(name)
            .await
            .map_err(GameError::StoreUnavailable)?
            .ok_or_else(|| GameError::PlayerNotFound(name.to_string()))?;

        let candidates = self
            .store
            .query(PlayerFilter {
                online_only: true,
                ..PlayerFilter::default()
            })
            .await
            .map_err(GameError::StoreUnavailable)?;

        let hit = hit_detection::resolve(&shooter.name, origin, unit, &candidates, &self.settings.tuning)
            .map(|hit| hit.player.name.clone());

        let shooter_score = match &hit {
            Some(victim) => {
                let updated = self
                    .store
                    .update(&shooter.name, PlayerPatch::IncrementScore { by: 1 })
                    .await
                    .map_err(GameError::StoreUnavailable)?
                    .ok_or_else(|| GameError::PlayerNotFound(shooter.name.clone()))?;
                info!(shooter = %shooter.name, victim = %victim, score = updated.score, "player hit");
                updated.score
            }
            None => shooter.score,
        };

        let everyone = self.presence.live_connections().await?;
        let event = OutboundEvent::ShootResult(ShotSummary {
            shooter: shooter.name,
            shooter_score,
            hit,
            origin,
            direction,
        });
        Ok(Delivery::broadcast(everyone, event))
    }

    async fn on_disconnect(&self, connection_id: &str) -> Result<Delivery, GameError> {
        let Some(player) = self
            .store
            .find_by_connection(connection_id)
            .await
            .map_err(GameError::StoreUnavailable)?
        else {
            debug!("disconnect from unbound connection ignored");
            return Ok(Delivery::default());
        };

        self.presence.mark_offline(&player.name).await?;
        info!(player = %player.name, "player left");

        let remaining: Vec<LiveConnection> = self
            .presence
            .live_connections()
            .await?
            .into_iter()
            .filter(|c| c.connection_id != connection_id)
            .collect();
        Ok(Delivery::broadcast(
            remaining,
            OutboundEvent::PlayerLeft { name: player.name },
        ))
    }

    async fn broadcast(
        &self,
        connections: &[LiveConnection],
        event: &OutboundEvent,
    ) -> Option<DeliveryReport> {
        let payload = match self.encoder.encode(event) {
            Ok(payload) => payload,
            Err(err) => {
                error!(action = event.action(), error = %err, "failed to encode broadcast");
                return None;
            }
        };
        Some(self.fanout.deliver(connections, payload).await)
    }

    async fn unicast(&self, connection_id: &str, event: &OutboundEvent) {
        let payload = match self.encoder.encode(event) {
            Ok(payload) => payload,
            Err(err) => {
                error!(action = event.action(), error = %err, "failed to encode reply");
                return;
            }
        };

        let sent = timeout(
            self.settings.fanout.send_timeout,
            self.transport.send(connection_id, payload),
        )
        .await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(SendError::Gone)) => {
                debug!(connection_id, action = event.action(), "reply target already gone")
            }
            Ok(Err(err)) => {
                warn!(connection_id, action = event.action(), error = %err, "failed to send reply")
            }
            Err(_) => warn!(connection_id, action = event.action(), "reply timed out"),
        }
    }
}
