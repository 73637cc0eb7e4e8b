//! Health check endpoints for Kubernetes-style liveness and readiness checks.
//!
//! - `/livez` - Basic liveness check (immediate 200, no checks)
//! - `/readyz` - Readiness check (identity store round trip)

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// GET /livez - Basic liveness check.
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /readyz - Readiness check.
///
/// Looks up a user that cannot exist; any storage error fails the check.
pub async fn readyz(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.auth.users.get_user(Uuid::nil()).await?;

    Ok(Json(json!({ "healthy": true })))
}
