//! HTTP error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

/// Error returned by handlers, rendered as `{"message": ..., "data": null}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// User-facing message only; the cause is logged where it is converted.
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    /// Convert a core error, using `message` as the body of a 500.
    pub fn with_message(err: moonbrain_core::Error, message: &str) -> Self {
        match err.root() {
            moonbrain_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            moonbrain_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            moonbrain_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            _ if err.is_unique_violation() => ApiError::Conflict("Already exists".to_string()),
            _ => {
                error!(subsystem = "api", error = %err, "{}", message);
                ApiError::Internal(message.to_string())
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl From<moonbrain_core::Error> for ApiError {
    fn from(err: moonbrain_core::Error) -> Self {
        ApiError::with_message(err, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "message": self.message(),
            "data": null,
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moonbrain_core::Error;

    #[test]
    fn test_core_error_mapping() {
        assert!(matches!(
            ApiError::from(Error::NotFound("note".into())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(Error::InvalidInput("id".into())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(Error::Unauthorized("token".into())),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(Error::Conflict("note a already exists".into())),
            ApiError::Conflict(_)
        ));
    }

    #[test]
    fn test_context_is_unwrapped() {
        let err = Error::InvalidInput("Note id is empty".into()).context("note service: create");
        match ApiError::from(err) {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Note id is empty"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_internal_hides_cause() {
        let err = ApiError::with_message(
            Error::Internal("connection reset".into()),
            "Couldn't get notes, something went wrong",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Couldn't get notes, something went wrong");
    }
}
