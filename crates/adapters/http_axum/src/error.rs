//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use udin2mqtt_domain::error::{BridgeError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// The dispatch loop is gone or dropped the request.
#[derive(Debug, thiserror::Error)]
#[error("dispatch loop unavailable")]
pub struct DispatcherUnavailable;

/// Maps [`BridgeError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(BridgeError);

impl ApiError {
    #[must_use]
    pub fn unavailable() -> Self {
        Self(BridgeError::Bus(Box::new(DispatcherUnavailable)))
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            BridgeError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            BridgeError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            BridgeError::Bus(err) => {
                tracing::error!(error = %err, "control request not handled");
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            BridgeError::Storage(err) | BridgeError::Transport(err) => {
                tracing::error!(error = %err, "control request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udin2mqtt_domain::error::NotFoundError;

    fn status(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn should_map_validation_to_bad_request() {
        assert_eq!(status(ValidationError::EmptyName), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_not_found_to_404() {
        let err = BridgeError::from(NotFoundError {
            entity: "Device",
            id: "quux".to_string(),
        });
        assert_eq!(status(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_map_unavailable_dispatcher_to_503() {
        assert_eq!(status(ApiError::unavailable()), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn should_map_storage_to_500() {
        let err = BridgeError::Storage(Box::new(std::io::Error::other("disk full")));
        assert_eq!(status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
