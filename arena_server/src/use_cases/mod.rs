// Use cases layer: presence, movement, fan-out and the per-event dispatcher.

pub mod dispatcher;
pub mod fanout;
pub mod movement;
pub mod presence;
pub mod types;

#[cfg(test)]
mod test_support;

pub use dispatcher::{DispatchSummary, DispatcherSettings, EventDispatcher, SnapshotPolicy};
pub use fanout::{BroadcastFanout, DeliveryReport, FanoutSettings};
pub use movement::MovementProcessor;
pub use presence::{PresenceRegistry, Registration};
pub use types::InboundEvent;
