// Frameworks layer: environment configuration and runtime bootstrap.

pub mod config;
pub mod server;
