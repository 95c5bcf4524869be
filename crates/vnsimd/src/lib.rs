//! vnsimd - vehicle network simulator daemon
//!
//! Serves one simulated vehicle and one simulated ECU to any number of
//! WebSocket clients. Telemetry frames are broadcast to every client on each
//! simulation tick; diagnostic responses go back only to the client that sent
//! the request, after an artificial delay.

pub mod adapter;
pub mod config;
pub mod latency;
pub mod protocol;
pub mod server;
pub mod state;

pub use config::{Config, ConfigError};
pub use server::{create_router, ServerBuilder, ServerHandle};
pub use state::AppState;
