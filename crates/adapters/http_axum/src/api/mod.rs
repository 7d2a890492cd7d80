//! JSON REST API handler modules.

pub mod catalog;
#[allow(clippy::missing_errors_doc)]
pub mod devices;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices", get(devices::list).post(devices::create))
        .route("/devices/{name}/enable/{value}", post(devices::set_enabled))
        .route("/relays", get(catalog::relays))
        .route("/kinds", get(catalog::kinds))
        .route("/info", get(catalog::info))
}
