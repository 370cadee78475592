use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AppError;
use crate::models::{Assignment, NewAssignment};
use crate::services::assignments::AssignmentStore;
use crate::services::AppState;

pub async fn create_assignment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewAssignment>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let assignment = state.assignments.create(request, state.clock.now())?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn list_assignments(State(state): State<Arc<AppState>>) -> Json<Vec<Assignment>> {
    Json(state.assignments.list())
}

pub async fn get_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = state.assignments.fetch_by_id(id).await?;
    Ok(Json(assignment))
}

/// Unassigns the guard.
pub async fn delete_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let removed = state.assignments.delete(id)?;
    tracing::info!(assignment_id = %id, guard_id = %removed.guard_id, "Guard unassigned");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn latest_for_guard(
    State(state): State<Arc<AppState>>,
    Path(guard_id): Path<String>,
) -> Result<Json<Assignment>, AppError> {
    state
        .assignments
        .latest_for_guard(&guard_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No assignment for guard {}", guard_id)))
}
