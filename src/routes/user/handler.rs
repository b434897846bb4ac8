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
    utils::{
        Claims, PageQuery, PaginatedResponse, hash_password, success_to_api_response,
        verify_password,
    },
};

use super::model::{
    MeResponse, Profile, UpdatePasswordRequest, UpdateProfileRequest, User, UserInfo,
    UserListQuery, UserSummary,
};
use crate::routes::auth::validate_password;

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserListQuery>,
    Query(page): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let (items, total) =
        UserSummary::list(&state.pool, filter.role, filter.q.as_deref(), &page).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(PaginatedResponse::new(items, &page, total)),
    ))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = UserSummary::find(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("用户"))?;

    Ok((StatusCode::OK, success_to_api_response(user)))
}

#[axum::debug_handler]
pub async fn update_profile(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    let req = req.normalized()?;
    let profile = Profile::update(&state.pool, claims.sub, req).await?;

    Ok((StatusCode::OK, success_to_api_response(profile)))
}

#[axum::debug_handler]
pub async fn update_password(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> AppResult<impl IntoResponse> {
    validate_password(&req.new_password)?;

    let user = User::find_by_id(&state.pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("用户"))?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized("当前密码不正确".into()));
    }

    let password_hash = hash_password(&req.new_password)?;
    User::update_password(&state.pool, user.user_id, &password_hash).await?;
    tracing::info!("User {} changed password", user.user_id);

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}

/// 当前用户及其档案
pub(crate) async fn load_me(state: &AppState, user_id: Uuid) -> AppResult<MeResponse> {
    let user = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("用户"))?;
    let profile = Profile::find(&state.pool, user_id).await?;

    Ok(MeResponse {
        user: UserInfo::from(user),
        profile,
    })
}
