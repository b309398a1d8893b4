use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use constant_time_eq::constant_time_eq;
use tracing::warn;

use crate::{error::RelayError, AppState};

pub const SYNC_KEY_HEADER: &str = "x-secret-key";

/// Axum middleware guarding the bulk sync endpoint with `X-Secret-Key`.
/// If no sync key is configured (SECRET_SYNC_KEY not set), all requests pass through.
pub async fn require_sync_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.sync_key else {
        warn!(
            path = %request.uri().path(),
            "SECRET_SYNC_KEY not set; bulk endpoint served without authorization"
        );
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(SYNC_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(k) if constant_time_eq(k.as_bytes(), expected.as_bytes()) => {
            next.run(request).await
        }
        _ => {
            warn!(path = %request.uri().path(), "rejected request: missing or invalid X-Secret-Key");
            RelayError::Unauthorized.into_response()
        }
    }
}
