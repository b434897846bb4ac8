use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{AppState, error::AppResult, utils::success_to_api_response};

#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, success_to_api_response(json!({ "status": "ok" })))
}

/// 数据库可用时才算就绪
#[axum::debug_handler]
pub async fn ready(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(json!({ "status": "ready" })),
    ))
}
