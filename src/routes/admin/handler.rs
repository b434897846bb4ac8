use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    extract::{Json, Path, Query},
    error::{AppError, AppResult},
    models::UserRole,
    routes::user::{User, UserInfo, UserListQuery},
    utils::{Claims, PageQuery, PaginatedResponse, success_to_api_response},
};

use super::model::{AdminStats, UpdateActiveRequest, UpdateRoleRequest};

#[axum::debug_handler]
pub async fn stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = AdminStats::collect(&state.pool).await?;
    Ok((StatusCode::OK, success_to_api_response(stats)))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserListQuery>,
    Query(page): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let (users, total) =
        User::list_all(&state.pool, filter.role, filter.q.as_deref(), &page).await?;
    let items: Vec<UserInfo> = users.into_iter().map(UserInfo::from).collect();

    Ok((
        StatusCode::OK,
        success_to_api_response(PaginatedResponse::new(items, &page, total)),
    ))
}

#[axum::debug_handler]
pub async fn update_role(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<impl IntoResponse> {
    if user_id == claims.sub && req.role != UserRole::Admin {
        return Err(AppError::forbidden("不能取消自己的管理员权限"));
    }

    let user = User::set_role(&state.pool, user_id, req.role)
        .await?
        .ok_or_else(|| AppError::not_found("用户"))?;
    tracing::info!(
        "Admin {} set role of {} to {}",
        claims.sub,
        user_id,
        req.role.as_str()
    );

    Ok((StatusCode::OK, success_to_api_response(UserInfo::from(user))))
}

#[axum::debug_handler]
pub async fn update_active(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateActiveRequest>,
) -> AppResult<impl IntoResponse> {
    if user_id == claims.sub && !req.is_active {
        return Err(AppError::forbidden("不能停用自己的账号"));
    }

    let user = User::set_active(&state.pool, user_id, req.is_active)
        .await?
        .ok_or_else(|| AppError::not_found("用户"))?;
    tracing::info!(
        "Admin {} set active={} for {}",
        claims.sub,
        req.is_active,
        user_id
    );

    Ok((StatusCode::OK, success_to_api_response(UserInfo::from(user))))
}

#[axum::debug_handler]
pub async fn delete_user(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if user_id == claims.sub {
        return Err(AppError::forbidden("不能删除自己的账号"));
    }

    if !User::delete(&state.pool, user_id).await? {
        return Err(AppError::not_found("用户"));
    }
    tracing::info!("Admin {} deleted user {}", claims.sub, user_id);

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}
