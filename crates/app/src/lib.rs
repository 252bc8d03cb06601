//! # iobridge-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the [`ObjectGateway`](ports::ObjectGateway) port the object graph
//!   adapters implement (objects, states, files, views, subscriptions, logs)
//! - Park operations issued before the gateway is ready and replay them in
//!   order ([`request_queue`])
//! - Keep listener registrations and the upstream topics they share
//!   ([`subscriptions`])
//! - Classify the object graph into controls ([`classifier`]) and reshape
//!   them into the room-indexed projection ([`projector`])
//! - Expose everything through [`BridgeService`](services::bridge_service::BridgeService)
//!
//! ## Dependency rule
//! Depends on `iobridge-domain` only (plus `tokio::sync` / `tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod classifier;
pub mod log_reader;
pub mod ports;
pub mod projector;
pub mod request_queue;
pub mod services;
pub mod subscriptions;
