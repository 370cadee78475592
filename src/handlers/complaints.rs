use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppError;
use crate::models::{Complaint, NewComplaint};
use crate::services::AppState;

pub async fn create_complaint(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewComplaint>,
) -> Result<(StatusCode, Json<Complaint>), AppError> {
    if request.guard_id.trim().is_empty() || request.complaint.trim().is_empty() {
        return Err(AppError::BadRequest("guardId and complaint are required".to_string()));
    }
    let complaint = state.complaints.lodge(&request.guard_id, request.complaint);
    Ok((StatusCode::CREATED, Json(complaint)))
}

pub async fn list_for_guard(
    State(state): State<Arc<AppState>>,
    Path(guard_id): Path<String>,
) -> Json<Vec<Complaint>> {
    Json(state.complaints.for_guard(&guard_id))
}

pub async fn clear_for_guard(
    State(state): State<Arc<AppState>>,
    Path(guard_id): Path<String>,
) -> Json<Value> {
    let deleted = state.complaints.clear_guard(&guard_id);
    Json(json!({ "deleted": deleted }))
}
