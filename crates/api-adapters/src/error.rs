//! HTTP mapping for `AppError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::AppError;
use serde_json::json;
use tracing::error;

/// Wraps `AppError` so handlers can return it directly.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::NotFound(..) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            // A client asked for something we do not serve; not our fault.
            AppError::Unimplemented(_) => (StatusCode::BAD_REQUEST, "unsupported"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::ConsistencyViolation(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            error!(error = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_kind_is_a_client_error() {
        let err = ApiError(AppError::Unimplemented("episode topics".into()));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "unsupported"));
    }

    #[test]
    fn hidden_and_missing_share_a_status() {
        let err = ApiError(AppError::not_found("topic", 1));
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn corruption_is_a_server_error() {
        let err = ApiError(AppError::ConsistencyViolation("no top post".into()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
