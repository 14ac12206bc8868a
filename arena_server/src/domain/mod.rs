// Domain layer: player records, arena geometry and the ports the use cases depend on.

pub mod entities;
pub mod errors;
pub mod events;
pub mod ports;
pub mod systems;
pub mod tuning;

pub use entities::{LiveConnection, Player, Vec3};
pub use errors::{GameError, SendError};
pub use events::{OutboundEvent, ShotSummary};
pub use tuning::ArenaTuning;
