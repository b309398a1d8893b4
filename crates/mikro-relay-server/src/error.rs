use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message used when Mikro flags an error without saying what went wrong.
pub const UPSTREAM_FALLBACK_MESSAGE: &str = "Mikro API SQL query failed";

#[derive(Debug, Error)]
pub enum RelayError {
    /// Required request input is missing or unreadable.
    #[error("{0}")]
    Validation(String),

    #[error("unauthorized: valid X-Secret-Key required for this endpoint")]
    Unauthorized,

    /// A config value needed for the upstream call is unset.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Mikro API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from Mikro API")]
    EmptyResponse,

    /// Application-level error reported inside a successful HTTP response.
    #[error("{0}")]
    Upstream(String),

    #[error("APILogin failed with status {0}")]
    LoginRejected(u16),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "relay error");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_error_class() {
        assert_eq!(
            RelayError::Validation("barcode is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RelayError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            RelayError::Upstream("bad company code".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::NotConfigured("SQL_API_URL").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_message_is_passed_through_verbatim() {
        let err = RelayError::Upstream("bad company code".into());
        assert_eq!(err.to_string(), "bad company code");
    }
}
