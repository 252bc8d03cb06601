//! # iobridge-adapter-memory
//!
//! In-memory implementation of the [`ObjectGateway`] port.
//!
//! Objects, states, files and host log files live in a single mutex-guarded
//! graph. Changes to subscribed topics are published on a tokio
//! [`broadcast`](tokio::sync::broadcast) channel as [`GatewayEvent`]s, which
//! the composition root pumps into the bridge service.
//!
//! A graph can be seeded from a JSON [`GraphSnapshot`].
//!
//! ## Dependency rule
//!
//! Depends on `iobridge-app` (port traits) and `iobridge-domain` only.
//!
//! [`ObjectGateway`]: iobridge_app::ports::ObjectGateway
//! [`GatewayEvent`]: iobridge_app::ports::GatewayEvent

mod error;
mod gateway;
mod snapshot;

pub use error::MemoryGatewayError;
pub use gateway::{DEFAULT_NAMESPACE, MemoryGateway, UpstreamCall};
pub use snapshot::{GraphSnapshot, LogFileSnapshot};
