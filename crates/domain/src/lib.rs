//! # iobridge-domain
//!
//! Pure domain model for the iobridge object-graph bridge.
//!
//! ## Responsibilities
//! - Foundational types: listener identifiers, error conventions, timestamps
//! - Model the **object graph** (objects, states, enums, files, log records)
//! - Compile **id patterns** (exact ids and `*` wildcards)
//! - Resolve **display text** and **smart-name annotations**
//! - Define **controls** (classifier output) and the room-indexed **projection**
//! - Define upstream subscription **topics**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod control;
pub mod enumeration;
pub mod file;
pub mod instance;
pub mod log;
pub mod object;
pub mod pattern;
pub mod projection;
pub mod smart_name;
pub mod state;
pub mod subscription;
pub mod text;
