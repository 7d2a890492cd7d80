//! Read-only catalogs for building device definitions.

use axum::Json;
use axum::extract::State;

use crate::state::{AppState, BridgeInfo};

/// `GET /api/relays` — every relay address, sorted by controller then index.
pub async fn relays(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(
        state
            .registry
            .relay_catalog()
            .iter()
            .map(ToString::to_string)
            .collect(),
    )
}

/// `GET /api/kinds`
pub async fn kinds(State(state): State<AppState>) -> Json<Vec<&'static str>> {
    Json(
        state
            .registry
            .kind_catalog()
            .iter()
            .map(|kind| kind.label())
            .collect(),
    )
}

/// `GET /api/info`
pub async fn info(State(state): State<AppState>) -> Json<BridgeInfo> {
    Json(BridgeInfo::clone(&state.info))
}
