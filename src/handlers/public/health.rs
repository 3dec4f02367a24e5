use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::middleware::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub store: &'static str,
    pub timestamp: String,
}

/// GET /health - always 200, reports whether the store answers
pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthStatus> {
    let (status, store) = match state.store.ping().await {
        Ok(()) => ("ok", "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach store");
            ("degraded", "unavailable")
        }
    };

    ApiResponse::success(HealthStatus {
        status,
        store,
        timestamp: Utc::now().to_rfc3339(),
    })
}
