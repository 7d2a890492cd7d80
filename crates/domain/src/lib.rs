//! # udin2mqtt-domain
//!
//! Pure domain model for the UDIN relay-board to MQTT bridge.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, identifier sanitization
//! - Define the **wire vocabulary** of UDIN boards (requests, board models)
//! - Define **relay addresses** (`<controller>-r<index>`)
//! - Define **logical devices** (kind, wiring, enabled flag, icon)
//! - Interpret free-text commands into **actions** on a relay
//! - Build **discovery announcements** and the bus topic conventions
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod name;

pub mod action;
pub mod board;
pub mod device;
pub mod discovery;
pub mod protocol;
pub mod relay;
pub mod topic;
