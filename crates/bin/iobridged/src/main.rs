//! # iobridged
//!
//! Composition root that wires the object graph gateway into the bridge
//! service.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Install the `tracing` subscriber
//! - Seed the in-memory gateway from a JSON snapshot
//! - Construct the bridge service, injecting the gateway via the port trait
//! - Pump gateway events into the bridge and signal readiness
//! - Print the room projection, then keep watching until Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use iobridge_adapter_memory::{GraphSnapshot, MemoryGateway};
use iobridge_app::services::BridgeService;
use iobridge_app::subscriptions::Subscription;
use iobridge_domain::id::ListenerId;
use tracing_subscriber::EnvFilter;

use config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Gateway
    let gateway = Arc::new(match &config.gateway.snapshot {
        Some(path) => {
            MemoryGateway::from_snapshot(GraphSnapshot::load(path)?, &config.gateway.namespace)
        }
        None => MemoryGateway::new(config.gateway.namespace.clone()),
    });

    // Bridge
    let bridge = Arc::new(BridgeService::new(
        Arc::clone(&gateway),
        config.bridge_options(),
    ));
    let pump = {
        let bridge = Arc::clone(&bridge);
        let events = gateway.subscribe_events();
        tokio::spawn(async move { bridge.pump_events(events).await })
    };

    if let Some(pattern) = &config.watch.pattern {
        let listener = ListenerId::generate();
        let subscription = Subscription::state(pattern.clone(), |id, state| match state {
            Some(state) => tracing::info!(%id, value = ?state.val, ack = state.ack, "state changed"),
            None => tracing::info!(%id, "state deleted"),
        });
        bridge.register(&listener, subscription).await;
    }

    // parked until the gateway reports ready
    let classification = {
        let bridge = Arc::clone(&bridge);
        tokio::spawn(async move { bridge.classify(None, false).await })
    };
    gateway.start();

    let rooms = classification.await??;
    println!("{}", serde_json::to_string_pretty(&*rooms)?);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    pump.abort();

    Ok(())
}
