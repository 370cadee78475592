use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppError;
use crate::models::{LiveGuard, LiveUpdate};
use crate::services::AppState;

pub async fn update_live(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LiveUpdate>,
) -> Result<Json<LiveGuard>, AppError> {
    if update.guard_id.trim().is_empty() {
        return Err(AppError::BadRequest("guardId is required".to_string()));
    }
    let live = state.live.upsert(&update.guard_id, update.latitude, update.longitude)?;
    Ok(Json(live))
}

pub async fn list_live(State(state): State<Arc<AppState>>) -> Json<Vec<LiveGuard>> {
    Json(state.live.list())
}
