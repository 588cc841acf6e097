// src/handlers/health.rs

use axum::{Json, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::error::AppError;

/// Liveness probe, served at both `/health` and `/api/health`.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "portfolio-backend",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
