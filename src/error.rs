// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::IdentityError;
use crate::database::StoreError;
use crate::services::AccessError;
use crate::validation::ValidationError;

/// Message returned for every 500; the detail only goes to the log
const INTERNAL_MESSAGE: &str = "An error occurred while processing your request";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::InvalidJson(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error() -> Self {
        ApiError::InternalServerError(INTERNAL_MESSAGE.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => tracing::error!(error = %msg, "Store unavailable"),
            StoreError::Query(msg) => tracing::error!(error = %msg, "Store query failed"),
            StoreError::Constraint(msg) => tracing::warn!(error = %msg, "Store constraint violated"),
        }
        ApiError::internal_server_error()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Invalid(e) => e.into(),
            AccessError::NotFound(kind) => ApiError::not_found(format!("{} not found", kind)),
            AccessError::Store(e) => e.into(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingCredential | IdentityError::MalformedCredential => {
                ApiError::unauthorized(err.to_string())
            }
            IdentityError::InvalidCredential(reason) => {
                tracing::debug!(reason = %reason, "Rejected credential");
                ApiError::unauthorized("Invalid token")
            }
            IdentityError::Unprovisioned => ApiError::forbidden(err.to_string()),
            IdentityError::Lookup(e) => e.into(),
            IdentityError::ProviderUnavailable(_) | IdentityError::NotConfigured => {
                tracing::error!(error = %err, "Identity provider failure");
                ApiError::internal_server_error()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_hides_ownership() {
        let err: ApiError = AccessError::NotFound("Deck").into();
        assert_eq!(err, ApiError::NotFound("Deck not found".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_detail_is_not_echoed() {
        let err: ApiError = StoreError::Query("relation \"decks\" does not exist".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("decks"));
        assert_eq!(err.to_json()["code"], "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn identity_errors_map_to_status() {
        let cases = [
            (IdentityError::MissingCredential, StatusCode::UNAUTHORIZED),
            (IdentityError::MalformedCredential, StatusCode::UNAUTHORIZED),
            (IdentityError::InvalidCredential("bad".to_string()), StatusCode::UNAUTHORIZED),
            (IdentityError::Unprovisioned, StatusCode::FORBIDDEN),
            (IdentityError::ProviderUnavailable("down".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                IdentityError::Lookup(StoreError::Unavailable("timeout".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn validation_message_passes_through() {
        let err: ApiError = ValidationError::Required("title").into();
        assert_eq!(
            err.to_json(),
            json!({ "error": true, "message": "title is required", "code": "BAD_REQUEST" })
        );
    }
}
