//! # udin2mqtt-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve read-only JSON queries over the device registry
//!   (`/api/devices`, `/api/relays`, `/api/kinds`, `/api/info`)
//! - Turn operator requests (create, enable, disable) into control events for
//!   the dispatch loop and relay its answer back as the HTTP response
//!
//! ## Dependency rule
//! Depends on `udin2mqtt-app` (registry and control events) and
//! `udin2mqtt-domain` (types used in request/response mapping). Never leaks
//! axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
