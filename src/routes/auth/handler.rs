use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use crate::{
    AppState,
    extract::Json,
    email::EmailTemplate,
    error::{AppError, AppResult},
    routes::user::{User, UserInfo, load_me},
    utils::{
        Claims, generate_reset_token, generate_token, hash_password, hash_reset_token,
        success_to_api_response, verify_password,
    },
};

use super::model::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, PasswordResetToken, RefreshTokenResponse,
    RegisterRequest, ResetPasswordRequest, validate_password,
};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let req = req.validated()?;

    let password_hash = hash_password(&req.password)?;
    let user = User::create(
        &state.pool,
        &req.email,
        &req.full_name,
        &password_hash,
        req.role,
    )
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("该邮箱已注册".into()),
        other => other,
    })?;

    let (token, expires_at) = generate_token(user.user_id, user.role, &state.config)?;

    state.notify(
        &user.email,
        EmailTemplate::Welcome {
            name: user.full_name.clone(),
            role: user.role.as_str().to_string(),
        },
    );

    Ok((
        StatusCode::CREATED,
        success_to_api_response(AuthResponse {
            user: UserInfo::from(user),
            token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    // 用户不存在与密码错误返回同样的信息
    let invalid = || AppError::Unauthorized("邮箱或密码错误".into());

    let user = User::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    if !user.is_active {
        return Err(AppError::forbidden("账号已被停用"));
    }

    let (token, expires_at) = generate_token(user.user_id, user.role, &state.config)?;
    tracing::info!("User {} logged in", user.user_id);

    Ok((
        StatusCode::OK,
        success_to_api_response(AuthResponse {
            user: UserInfo::from(user),
            token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn me(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let me = load_me(&state, claims.sub).await?;
    Ok((StatusCode::OK, success_to_api_response(me)))
}

/// 重新签发令牌，角色以数据库为准
#[axum::debug_handler]
pub async fn refresh_token(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user = User::find_by_id(&state.pool, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("账号不存在或已停用".into()))?;

    let (token, expires_at) = generate_token(user.user_id, user.role, &state.config)?;

    Ok((
        StatusCode::OK,
        success_to_api_response(RefreshTokenResponse { token, expires_at }),
    ))
}

/// 无论邮箱是否存在都返回成功
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    if let Some(user) = User::find_by_email(&state.pool, &req.email).await? {
        if user.is_active {
            let (token, token_hash) = generate_reset_token();
            let ttl = state.config.reset_token_expiration();
            let expires_at = Utc::now() + Duration::seconds(ttl.as_secs() as i64);

            PasswordResetToken::create(&state.pool, user.user_id, &token_hash, expires_at).await?;
            tracing::info!("Issued password reset token for user {}", user.user_id);

            state.notify(
                &user.email,
                EmailTemplate::PasswordReset {
                    name: user.full_name,
                    link: state.app_link(&format!("reset-password?token={}", token)),
                    expires_in_minutes: ttl.as_secs() / 60,
                },
            );
        }
    }

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    validate_password(&req.new_password)?;
    if req.token.trim().is_empty() {
        return Err(AppError::validation("重置令牌无效或已过期"));
    }

    let password_hash = hash_password(&req.new_password)?;
    let user_id = PasswordResetToken::consume(
        &state.pool,
        &hash_reset_token(req.token.trim()),
        &password_hash,
    )
    .await?
    .ok_or_else(|| AppError::validation("重置令牌无效或已过期"))?;

    tracing::info!("User {} reset password", user_id);

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}
