use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{AppError, AppState};

/// Liveness plus a cheap database round trip.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state
        .role_store
        .list_all()
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(Json(json!({ "status": "ok" })))
}
