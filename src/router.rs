use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};

use crate::{
    AppState,
    error::AppError,
    middleware::{auth_middleware, log_errors, require_admin},
    routes,
};

// 无需登录的路由
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::ready))
        // 认证
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/auth/reset-password", post(routes::auth::reset_password))
        // 用户公开信息
        .route("/users", get(routes::user::list_users))
        .route("/users/{id}", get(routes::user::get_user))
        .route("/users/{id}/reviews", get(routes::review::list_user_reviews))
        // 专家目录
        .route("/experts", get(routes::expert::list_experts))
        .route("/experts/match", get(routes::expert::match_experts))
        .route("/experts/{id}", get(routes::expert::get_expert))
        // 机会与问答的浏览
        .route("/opportunities", get(routes::opportunity::list_opportunities))
        .route("/opportunities/{id}", get(routes::opportunity::get_opportunity))
        .route("/questions", get(routes::question::list_questions))
        .route("/questions/{id}", get(routes::question::get_question))
}

// 需要管理员角色的路由
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(routes::admin::stats))
        .route("/admin/users", get(routes::admin::list_users))
        .route(
            "/admin/users/{id}",
            delete(routes::admin::delete_user),
        )
        .route("/admin/users/{id}/role", put(routes::admin::update_role))
        .route("/admin/users/{id}/active", put(routes::admin::update_active))
        .route("/admin/experts", post(routes::expert::create_expert))
        .route(
            "/admin/experts/{id}",
            put(routes::expert::update_expert).delete(routes::expert::delete_expert),
        )
        .route_layer(from_fn(require_admin))
}

// 需要登录的路由
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/refresh-token", post(routes::auth::refresh_token))
        .route("/users/me/profile", put(routes::user::update_profile))
        .route("/users/me/password", put(routes::user::update_password))
        .route("/matches", get(routes::matching::find_matches))
        // 连接
        .route(
            "/connections",
            post(routes::connection::create_connection).get(routes::connection::list_connections),
        )
        .route("/connections/{id}", get(routes::connection::get_connection))
        .route(
            "/connections/{id}/accept",
            put(routes::connection::accept_connection),
        )
        .route(
            "/connections/{id}/reject",
            put(routes::connection::reject_connection),
        )
        .route(
            "/connections/{id}/cancel",
            put(routes::connection::cancel_connection),
        )
        .route("/connections/{id}/end", put(routes::connection::end_connection))
        // 消息
        .route(
            "/connections/{id}/messages",
            post(routes::message::send_message).get(routes::message::list_messages),
        )
        .route("/messages/unread-count", get(routes::message::unread_count))
        .route("/messages/{id}/read", put(routes::message::mark_read))
        // 会话
        .route(
            "/sessions",
            post(routes::session::create_session).get(routes::session::list_sessions),
        )
        .route("/sessions/{id}", get(routes::session::get_session))
        .route(
            "/sessions/{id}/complete",
            put(routes::session::complete_session),
        )
        .route("/sessions/{id}/cancel", put(routes::session::cancel_session))
        // 评价
        .route("/reviews", post(routes::review::create_review))
        // 机会
        .route(
            "/opportunities",
            post(routes::opportunity::create_opportunity),
        )
        .route(
            "/opportunities/{id}",
            put(routes::opportunity::update_opportunity)
                .delete(routes::opportunity::delete_opportunity),
        )
        // 问答
        .route("/questions", post(routes::question::create_question))
        .route(
            "/questions/{id}",
            delete(routes::question::delete_question),
        )
        .route(
            "/questions/{id}/answers",
            post(routes::question::create_answer),
        )
        .route(
            "/questions/{id}/answers/{answer_id}/accept",
            put(routes::question::accept_answer),
        )
        .merge(admin_routes())
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

async fn not_found() -> AppError {
    AppError::NotFound("接口不存在".into())
}

/// 组装完整的 API 路由，限流和 CORS 由入口按部署方式追加
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_routes())
        .merge(protected_routes(&state));

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    router
        .fallback(not_found)
        .layer(from_fn(log_errors))
        .with_state(state)
}
