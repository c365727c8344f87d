//! Core types and service wiring for the tracklane shipment tracking aggregator.

/// HTTP helpers shared by network-backed providers.
pub mod http;
/// Canonical tracking model shared by all providers.
pub mod model;
/// Building blocks for mapping provider payloads onto the canonical model.
pub mod normalize;
/// Registry of providers, their status, and the attempt order.
pub mod plugin;
/// Traits describing the provider and observer interfaces.
pub mod ports;
/// High-level service facade used by clients.
pub mod service;

pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
