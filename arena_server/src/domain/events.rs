// Outbound events produced by the dispatcher, before wire encoding.

use super::entities::{Player, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    // Unicast acknowledgement of a registration.
    Registered { player: Player },
    GameState { players: Vec<Player> },
    PlayerJoined { player: Player },
    PlayerMoved {
        name: String,
        x: i32,
        y: i32,
        base_y: Option<f64>,
    },
    PlayerLeft { name: String },
    ShootResult(ShotSummary),
    Error { message: String },
}

impl OutboundEvent {
    pub fn action(&self) -> &'static str {
        match self {
            OutboundEvent::Registered { .. } => "registered",
            OutboundEvent::GameState { .. } => "gameState",
            OutboundEvent::PlayerJoined { .. } => "playerJoined",
            OutboundEvent::PlayerMoved { .. } => "playerMoved",
            OutboundEvent::PlayerLeft { .. } => "playerLeft",
            OutboundEvent::ShootResult(_) => "shootResult",
            OutboundEvent::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShotSummary {
    pub shooter: String,
    pub shooter_score: u64,
    pub hit: Option<String>,
    pub origin: Vec3,
    pub direction: Vec3,
}

impl ShotSummary {
    pub fn message(&self) -> String {
        match &self.hit {
            Some(name) => format!("Hit {name}!"),
            None => "Miss!".to_string(),
        }
    }
}
