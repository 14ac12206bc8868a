// Use-case level inputs for the event dispatcher.

use crate::domain::Vec3;
use crate::domain::systems::movement::MoveCommand;

// One inbound event, already validated by the protocol adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Register { name: String },
    GetGameState,
    MovePlayer { name: String, command: MoveCommand },
    Shoot { name: String, origin: Vec3, direction: Vec3 },
    // Connection identity alone identifies the leaving player.
    Disconnect,
}

impl InboundEvent {
    pub fn action(&self) -> &'static str {
        match self {
            InboundEvent::Register { .. } => "register",
            InboundEvent::GetGameState => "getGameState",
            InboundEvent::MovePlayer { .. } => "movePlayer",
            InboundEvent::Shoot { .. } => "shoot",
            InboundEvent::Disconnect => "disconnect",
        }
    }
}
