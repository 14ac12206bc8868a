// Wire protocol DTOs and conversions for arena WebSocket messages.
// Every frame is a JSON object tagged by `action`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Player, Vec3};
use crate::domain::errors::GameError;
use crate::domain::events::{OutboundEvent, ShotSummary};
use crate::domain::ports::{EventEncoder, Payload};
use crate::domain::systems::movement::{Direction, MoveCommand};
use crate::use_cases::InboundEvent;

// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientMessage {
    Register(RegisterPayload),
    GetGameState,
    MovePlayer(MovePayload),
    Shoot(ShootPayload),
}

// Fields are optional so a missing one becomes a readable error instead of a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub name: Option<String>,
}

// Either a direction step or an absolute placement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    // Any JSON value; non-numbers fall back to ground level.
    #[serde(default)]
    pub base_y: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShootPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub origin: Option<Vec3Dto>,
    #[serde(default)]
    pub direction: Option<Vec3Dto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Dto {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vec3Dto> for Vec3 {
    fn from(v: Vec3Dto) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for Vec3Dto {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

// Parses one text frame into a dispatcher event.
pub fn parse_client_message(text: &str) -> Result<InboundEvent, GameError> {
    let message: ClientMessage = serde_json::from_str(text)
        .map_err(|_| GameError::MalformedPayload("unrecognized message".to_string()))?;
    message.into_event()
}

impl ClientMessage {
    pub fn into_event(self) -> Result<InboundEvent, GameError> {
        match self {
            ClientMessage::Register(payload) => Ok(InboundEvent::Register {
                name: required(payload.name, "Invalid register payload")?,
            }),
            ClientMessage::GetGameState => Ok(InboundEvent::GetGameState),
            ClientMessage::MovePlayer(payload) => payload.into_event(),
            ClientMessage::Shoot(payload) => {
                let (Some(origin), Some(direction)) = (payload.origin, payload.direction) else {
                    return Err(malformed("Invalid shoot payload"));
                };
                Ok(InboundEvent::Shoot {
                    name: player_name(payload.name, "Invalid shoot payload")?,
                    origin: origin.into(),
                    direction: direction.into(),
                })
            }
        }
    }
}

impl MovePayload {
    fn into_event(self) -> Result<InboundEvent, GameError> {
        let name = player_name(self.name, "Invalid move payload")?;

        let command = match (self.direction, self.x, self.y) {
            (Some(direction), _, _) => {
                let direction = Direction::parse(&direction)
                    .ok_or_else(|| malformed("Invalid direction"))?;
                MoveCommand::Step(direction)
            }
            (None, Some(x), Some(y)) => MoveCommand::Place {
                x,
                y,
                base_y: self.base_y.as_ref().and_then(serde_json::Value::as_f64),
            },
            _ => return Err(malformed("Invalid move payload")),
        };

        Ok(InboundEvent::MovePlayer { name, command })
    }
}

fn required(value: Option<String>, reason: &str) -> Result<String, GameError> {
    value.ok_or_else(|| malformed(reason))
}

// Names are stored trimmed at registration, so lookups trim the same way.
fn player_name(value: Option<String>, reason: &str) -> Result<String, GameError> {
    let name = required(value, reason)?;
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(malformed(reason));
    }
    Ok(trimmed.to_string())
}

fn malformed(reason: &str) -> GameError {
    GameError::MalformedPayload(reason.to_string())
}

// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ServerMessage {
    // Acknowledges a registration to the registering connection only.
    Registered {
        player: PlayerDto,
    },
    GameState {
        players: Vec<PlayerDto>,
    },
    PlayerJoined {
        player: PlayerDto,
    },
    PlayerMoved {
        name: String,
        x: i32,
        y: i32,
        #[serde(rename = "baseY", skip_serializing_if = "Option::is_none")]
        base_y: Option<f64>,
    },
    PlayerLeft {
        name: String,
    },
    ShootResult(ShootResultDto),
    Error {
        error: String,
    },
}

// Public view of a player; connection ids never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_y: Option<f64>,
    pub score: u64,
    pub online: bool,
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            x: player.x,
            y: player.y,
            base_y: player.base_y,
            score: player.score,
            online: player.online,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShootResultDto {
    pub shooter: String,
    pub shooter_score: u64,
    // Serialized as `null` on a miss.
    pub hit: Option<HitDto>,
    pub origin: Vec3Dto,
    pub direction: Vec3Dto,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HitDto {
    pub name: String,
}

impl From<&ShotSummary> for ShootResultDto {
    fn from(shot: &ShotSummary) -> Self {
        Self {
            shooter: shot.shooter.clone(),
            shooter_score: shot.shooter_score,
            hit: shot.hit.clone().map(|name| HitDto { name }),
            origin: shot.origin.into(),
            direction: shot.direction.into(),
            message: shot.message(),
        }
    }
}

impl From<&OutboundEvent> for ServerMessage {
    fn from(event: &OutboundEvent) -> Self {
        match event {
            OutboundEvent::Registered { player } => ServerMessage::Registered {
                player: player.into(),
            },
            OutboundEvent::GameState { players } => ServerMessage::GameState {
                players: players.iter().map(PlayerDto::from).collect(),
            },
            OutboundEvent::PlayerJoined { player } => ServerMessage::PlayerJoined {
                player: player.into(),
            },
            OutboundEvent::PlayerMoved {
                name,
                x,
                y,
                base_y,
            } => ServerMessage::PlayerMoved {
                name: name.clone(),
                x: *x,
                y: *y,
                base_y: *base_y,
            },
            OutboundEvent::PlayerLeft { name } => ServerMessage::PlayerLeft { name: name.clone() },
            OutboundEvent::ShootResult(shot) => ServerMessage::ShootResult(shot.into()),
            OutboundEvent::Error { message } => ServerMessage::Error {
                error: message.clone(),
            },
        }
    }
}

// Body of `GET /state`.
#[derive(Debug, Clone, Serialize)]
pub struct StateResponse {
    pub players: Vec<PlayerDto>,
}

// Serializes outbound events to JSON text once per broadcast.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl EventEncoder for JsonEncoder {
    fn encode(&self, event: &OutboundEvent) -> Result<Payload, String> {
        serde_json::to_string(&ServerMessage::from(event))
            .map(Arc::from)
            .map_err(|e| e.to_string())
    }
}
