use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use skydrop_link::RegistryError;
use skydrop_mission::{LaunchError, NotifyError, StoreError};

/// Failure while wiring the service at startup
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to open mission store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build orders client: {0}")]
    Orders(#[from] NotifyError),
}

/// Error returned by HTTP handlers, rendered as `{"detail": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "request failed: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<LaunchError> for ApiError {
    fn from(err: LaunchError) -> Self {
        match err {
            LaunchError::UnknownBlock(..) => ApiError::BadRequest(err.to_string()),
            LaunchError::NotConnected(_) => ApiError::NotFound(err.to_string()),
            LaunchError::Connection(_) | LaunchError::Store(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotRegistered(_) => ApiError::NotFound("Drone not found".to_string()),
            RegistryError::Link(e) => ApiError::Internal(format!("Failed to connect to drone: {}", e)),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skydrop_link::LinkError;

    #[test]
    fn test_launch_errors_map_to_status() {
        let unknown: ApiError =
            LaunchError::UnknownBlock("Z".to_string(), "A, B, C".to_string()).into();
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

        let offline: ApiError = LaunchError::NotConnected("D9".to_string()).into();
        assert_eq!(offline.status(), StatusCode::NOT_FOUND);

        let refused: ApiError = LaunchError::Connection(RegistryError::Link(LinkError::Connect {
            descriptor: "sim://1".to_string(),
            reason: "refused".to_string(),
        }))
        .into();
        assert_eq!(refused.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_registry_errors_map_to_status() {
        let missing: ApiError = RegistryError::NotRegistered("D1".to_string()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Drone not found");
    }

    #[test]
    fn test_store_not_found_is_404() {
        let err: ApiError = StoreError::NotFound(3).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
