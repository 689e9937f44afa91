use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use courtsync_common::error::EtlError;

#[derive(Debug)]
pub struct ApiError(pub EtlError);

impl From<EtlError> for ApiError {
    fn from(err: EtlError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EtlError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            EtlError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
