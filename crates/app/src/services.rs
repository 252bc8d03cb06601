//! Application services: use-case implementations.
//!
//! Services accept port implementations via generic parameters (constructor
//! injection), keeping this layer decoupled from concrete adapters.

pub mod bridge_service;

pub use bridge_service::{BridgeOptions, BridgeService};
