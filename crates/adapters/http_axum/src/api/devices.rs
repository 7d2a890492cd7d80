//! JSON REST handlers for devices.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::oneshot;

use udin2mqtt_app::dispatcher::ControlEvent;
use udin2mqtt_domain::device::{Device, DeviceSpec};
use udin2mqtt_domain::error::BridgeError;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating a device.
#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    /// Kind label or its numeric code.
    pub kind: String,
    /// Relay addresses, in the order the kind expects.
    pub wiring: Vec<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Device>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `GET /api/devices`
pub async fn list(State(state): State<AppState>) -> Json<Vec<Device>> {
    Json(state.registry.list())
}

/// `POST /api/devices` — the device is created disabled.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<CreateResponse, ApiError> {
    let mut args = vec![req.name, req.kind];
    args.extend(req.wiring);
    let spec = DeviceSpec::from_args(&args)?.icon(req.icon);
    let (event, reply) = ControlEvent::create(spec);
    let device = submit(&state, event, reply).await?;
    Ok(CreateResponse::Created(Json(device)))
}

/// `POST /api/devices/{name}/enable/{value}` — only `true` enables.
pub async fn set_enabled(
    State(state): State<AppState>,
    Path((name, value)): Path<(String, String)>,
) -> Result<Json<Device>, ApiError> {
    let (event, reply) = ControlEvent::enable_from_text(name, &value);
    let device = submit(&state, event, reply).await?;
    Ok(Json(device))
}

async fn submit(
    state: &AppState,
    event: ControlEvent,
    reply: oneshot::Receiver<Result<Device, BridgeError>>,
) -> Result<Device, ApiError> {
    state
        .control
        .send(event)
        .await
        .map_err(|_| ApiError::unavailable())?;
    let result = reply.await.map_err(|_| ApiError::unavailable())?;
    Ok(result?)
}
