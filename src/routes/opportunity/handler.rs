use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    extract::{Json, Path, Query},
    error::{AppError, AppResult},
    models::UserRole,
    utils::{Claims, success_to_api_response},
};

use super::model::{
    CreateOpportunityRequest, Opportunity, OpportunityListQuery, UpdateOpportunityRequest,
};

/// 只有发布者本人或管理员可以修改
async fn owned_opportunity(
    state: &AppState,
    claims: &Claims,
    opportunity_id: Uuid,
) -> AppResult<Opportunity> {
    let opportunity = Opportunity::find_by_id(&state.pool, opportunity_id)
        .await?
        .ok_or_else(|| AppError::not_found("机会"))?;

    if opportunity.posted_by != claims.sub && !claims.is_admin() {
        return Err(AppError::forbidden("只能修改自己发布的机会"));
    }
    Ok(opportunity)
}

#[axum::debug_handler]
pub async fn list_opportunities(
    State(state): State<AppState>,
    Query(query): Query<OpportunityListQuery>,
) -> AppResult<impl IntoResponse> {
    let opportunities = Opportunity::list(&state.pool, &query).await?;
    Ok((StatusCode::OK, success_to_api_response(opportunities)))
}

#[axum::debug_handler]
pub async fn get_opportunity(
    State(state): State<AppState>,
    Path(opportunity_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let opportunity = Opportunity::find_by_id(&state.pool, opportunity_id)
        .await?
        .ok_or_else(|| AppError::not_found("机会"))?;

    Ok((StatusCode::OK, success_to_api_response(opportunity)))
}

#[axum::debug_handler]
pub async fn create_opportunity(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<CreateOpportunityRequest>,
) -> AppResult<impl IntoResponse> {
    if claims.role == UserRole::Mentee {
        return Err(AppError::forbidden("只有导师或管理员可以发布机会"));
    }
    let req = req.validated(Utc::now())?;

    let opportunity = Opportunity::create(&state.pool, claims.sub, req).await?;
    tracing::info!(
        "Opportunity {} posted by {}",
        opportunity.opportunity_id,
        claims.sub
    );

    Ok((StatusCode::CREATED, success_to_api_response(opportunity)))
}

#[axum::debug_handler]
pub async fn update_opportunity(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(opportunity_id): Path<Uuid>,
    Json(req): Json<UpdateOpportunityRequest>,
) -> AppResult<impl IntoResponse> {
    let req = req.validated()?;
    owned_opportunity(&state, &claims, opportunity_id).await?;

    let opportunity = Opportunity::update(&state.pool, opportunity_id, req)
        .await?
        .ok_or_else(|| AppError::not_found("机会"))?;

    Ok((StatusCode::OK, success_to_api_response(opportunity)))
}

#[axum::debug_handler]
pub async fn delete_opportunity(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(opportunity_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    owned_opportunity(&state, &claims, opportunity_id).await?;

    if !Opportunity::delete(&state.pool, opportunity_id).await? {
        return Err(AppError::not_found("机会"));
    }

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}
