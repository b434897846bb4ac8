use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{
    AppState,
    error::AppError,
    utils::{Claims, verify_token},
};

/// 校验 Bearer token，并把 `Claims` 放进请求扩展
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Unauthorized("缺少认证令牌".into()))?;

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Unauthorized("认证令牌无效或已过期".into())
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// 仅管理员可访问，需挂在 `auth_middleware` 之后
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let caller = req
        .extensions()
        .get::<Claims>()
        .map(|claims| (claims.sub, claims.is_admin()));

    match caller {
        Some((_, true)) => Ok(next.run(req).await),
        Some((user_id, false)) => {
            tracing::warn!("User {} attempted admin access", user_id);
            Err(AppError::forbidden("需要管理员权限"))
        }
        None => Err(AppError::Unauthorized("缺少认证令牌".into())),
    }
}
