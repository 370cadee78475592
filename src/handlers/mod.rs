pub mod assignments;
pub mod complaints;
pub mod health;
pub mod live;

use axum::{
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::{ReportError, StoreError};
use crate::services::AppState;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Store(StoreError::NotFound(_)) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Invalid(_))
            | AppError::Report(ReportError::Failed(_))
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Report(ReportError::Timeout) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        // Assignments
        .route(
            "/api/assignments",
            get(assignments::list_assignments).post(assignments::create_assignment),
        )
        .route(
            "/api/assignments/:id",
            get(assignments::get_assignment).delete(assignments::delete_assignment),
        )
        .route("/api/guards/:guard_id/assignment", get(assignments::latest_for_guard))
        // Live locations
        .route("/api/live", patch(live::update_live).get(live::list_live))
        // Complaints
        .route("/api/complaints", post(complaints::create_complaint))
        .route(
            "/api/complaints/:guard_id",
            get(complaints::list_for_guard).delete(complaints::clear_for_guard),
        )
        // Health
        .route("/health", get(health::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
