//! 健康检查

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

/// 存活探针
///
/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// 就绪探针，PostgreSQL 模式下检查数据库连接
///
/// GET /ready
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let Some(database) = &state.database else {
        return (StatusCode::OK, Json(json!({ "status": "ready", "storage": "memory" })));
    };

    match database.health_check().await {
        Ok(latency) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "storage": "postgres",
                "latencyMs": latency.as_millis() as u64,
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "就绪检查失败");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not_ready", "reason": "database unavailable" })),
            )
        }
    }
}
