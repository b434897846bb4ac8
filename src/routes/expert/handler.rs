use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AppState,
    extract::{Json, Path, Query},
    error::{AppError, AppResult},
    matching::rank,
    utils::success_to_api_response,
};

use super::model::{Expert, ExpertListQuery, ExpertMatchQuery, ExpertPayload};

const MAX_EXPERT_MATCHES: usize = 50;

#[derive(Debug, Serialize)]
pub struct ExpertMatch {
    pub expert: Expert,
    pub score: usize,
    pub matched_keywords: Vec<String>,
}

#[axum::debug_handler]
pub async fn list_experts(
    State(state): State<AppState>,
    Query(query): Query<ExpertListQuery>,
) -> AppResult<impl IntoResponse> {
    let experts = Expert::list(&state.pool, &query).await?;
    Ok((StatusCode::OK, success_to_api_response(experts)))
}

#[axum::debug_handler]
pub async fn get_expert(
    State(state): State<AppState>,
    Path(expert_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let expert = Expert::find_by_id(&state.pool, &state.cache(), expert_id)
        .await?
        .ok_or_else(|| AppError::not_found("专家"))?;

    Ok((StatusCode::OK, success_to_api_response(expert)))
}

/// 用一段兴趣描述为专家排序
#[axum::debug_handler]
pub async fn match_experts(
    State(state): State<AppState>,
    Query(query): Query<ExpertMatchQuery>,
) -> AppResult<impl IntoResponse> {
    if query.q.trim().is_empty() {
        return Err(AppError::validation("请提供兴趣关键词"));
    }
    let limit = query
        .limit
        .unwrap_or(state.config.match_limit as usize)
        .clamp(1, MAX_EXPERT_MATCHES);

    let experts = Expert::all(&state.pool).await?;
    let matches: Vec<ExpertMatch> = rank(&query.q, experts, limit)
        .into_iter()
        .map(|(expert, s)| ExpertMatch {
            expert,
            score: s.score,
            matched_keywords: s.matched,
        })
        .collect();

    Ok((StatusCode::OK, success_to_api_response(matches)))
}

#[axum::debug_handler]
pub async fn create_expert(
    State(state): State<AppState>,
    Json(payload): Json<ExpertPayload>,
) -> AppResult<impl IntoResponse> {
    let payload = payload.validated(true)?;
    let expert = Expert::create(&state.pool, payload).await?;
    tracing::info!("Created expert {} ({})", expert.expert_id, expert.name);

    Ok((StatusCode::CREATED, success_to_api_response(expert)))
}

#[axum::debug_handler]
pub async fn update_expert(
    State(state): State<AppState>,
    Path(expert_id): Path<Uuid>,
    Json(payload): Json<ExpertPayload>,
) -> AppResult<impl IntoResponse> {
    let payload = payload.validated(false)?;
    let expert = Expert::update(&state.pool, &state.cache(), expert_id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("专家"))?;

    Ok((StatusCode::OK, success_to_api_response(expert)))
}

#[axum::debug_handler]
pub async fn delete_expert(
    State(state): State<AppState>,
    Path(expert_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if !Expert::delete(&state.pool, &state.cache(), expert_id).await? {
        return Err(AppError::not_found("专家"));
    }
    tracing::info!("Deleted expert {}", expert_id);

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}
