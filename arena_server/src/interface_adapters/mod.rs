// Interface adapters: wire protocol, storage, socket registry and network handling.

pub mod http;
pub mod hub;
pub mod net;
pub mod protocol;
pub mod routes;
pub mod state;
