//! HTTP service exposing the tracklane aggregator.

/// Provider, registry and service wiring.
pub mod bootstrap;
/// Configuration file and environment overlay.
pub mod config;
/// Error responses.
pub mod error;
/// Lookup observers registered by the server.
pub mod observer;
/// Route handlers.
pub mod routes;

pub use config::ServerConfig;
pub use routes::{AppState, BatchLimits, router};
