// Network adapter modules split by player sockets vs operator HTTP routes.

pub mod client;
pub mod internal;

pub use client::ws_handler;
pub use internal::state_handler;
