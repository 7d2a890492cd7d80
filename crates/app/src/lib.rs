//! # udin2mqtt-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `LineTransport` — one request/response exchange on a UDIN serial line
//!   - `DeviceStore` — durable record of registry changes
//! - Define the **bus message** types exchanged with the bus client
//! - Provide the **controller driver** (model detection, relay operations)
//! - Provide the **device registry** and the **dispatch loop** that is the
//!   single writer of that registry
//! - Run relay pulses off the dispatch path and report their failures
//!
//! ## Dependency rule
//! Depends on `udin2mqtt-domain` only (plus `tokio` for channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controller;
pub mod dispatcher;
pub mod ports;
pub mod pulse;
pub mod registry;
