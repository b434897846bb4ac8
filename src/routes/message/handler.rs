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
    models::ConnectionStatus,
    routes::connection::connection_for,
    utils::{Claims, ensure_len, success_to_api_response},
};

use super::model::{Message, MessageListQuery, SendMessageRequest, UnreadCount};

#[axum::debug_handler]
pub async fn send_message(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let body = req.body.trim();
    ensure_len("消息内容", body, 1, 5000)?;

    let connection = connection_for(&state, connection_id, claims.sub).await?;
    if connection.status != ConnectionStatus::Active {
        return Err(AppError::InvalidState("只能在进行中的连接里发送消息".into()));
    }

    let message = Message::create(
        &state.pool,
        connection_id,
        claims.sub,
        connection.counterpart(claims.sub),
        body,
    )
    .await?;
    tracing::debug!("Message {} sent on connection {}", message.message_id, connection_id);

    Ok((StatusCode::CREATED, success_to_api_response(message)))
}

/// 已结束的连接仍可查看历史消息
#[axum::debug_handler]
pub async fn list_messages(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
    Query(query): Query<MessageListQuery>,
) -> AppResult<impl IntoResponse> {
    let query = query.validated()?;
    connection_for(&state, connection_id, claims.sub).await?;
    let messages = Message::list(&state.pool, connection_id, &query).await?;

    Ok((StatusCode::OK, success_to_api_response(messages)))
}

#[axum::debug_handler]
pub async fn mark_read(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let message = Message::mark_read(&state.pool, message_id, claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("消息"))?;

    Ok((StatusCode::OK, success_to_api_response(message)))
}

#[axum::debug_handler]
pub async fn unread_count(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let unread = Message::unread_count(&state.pool, claims.sub).await?;
    Ok((StatusCode::OK, success_to_api_response(UnreadCount { unread })))
}
