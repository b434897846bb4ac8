use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    extract::{Json, Path, Query},
    email::EmailTemplate,
    error::{AppError, AppResult},
    models::{ConnectionAction, ConnectionStatus, UserRole},
    routes::user::User,
    utils::{Claims, ensure_len, success_to_api_response},
};

use super::model::{Connection, ConnectionListQuery, CreateConnectionRequest};

/// 取调用者参与的连接，非参与者一律视为不存在
pub(crate) async fn connection_for(
    state: &AppState,
    connection_id: Uuid,
    user_id: Uuid,
) -> AppResult<Connection> {
    Connection::find_for_participant(&state.pool, connection_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("连接"))
}

#[axum::debug_handler]
pub async fn create_connection(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<CreateConnectionRequest>,
) -> AppResult<impl IntoResponse> {
    if claims.role != UserRole::Mentee {
        return Err(AppError::forbidden("只有学员可以发起导师申请"));
    }
    if req.mentor_id == claims.sub {
        return Err(AppError::validation("不能向自己发起申请"));
    }
    let message = req.message.as_deref().unwrap_or_default().trim();
    ensure_len("申请留言", message, 0, 1000)?;

    let mentor = User::find_by_id(&state.pool, req.mentor_id)
        .await?
        .filter(|u| u.is_active && u.role == UserRole::Mentor)
        .ok_or_else(|| AppError::not_found("导师"))?;

    let connection = Connection::create(&state.pool, claims.sub, mentor.user_id, message).await?;
    tracing::info!(
        "Connection {} requested by {} to mentor {}",
        connection.connection_id,
        claims.sub,
        mentor.user_id
    );

    state.notify(
        &mentor.email,
        EmailTemplate::ConnectionRequest {
            mentor_name: connection.mentor_name.clone(),
            mentee_name: connection.mentee_name.clone(),
            message: connection.message.clone(),
            link: state.app_link(&format!("connections/{}", connection.connection_id)),
        },
    );

    Ok((StatusCode::CREATED, success_to_api_response(connection)))
}

#[axum::debug_handler]
pub async fn list_connections(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(query): Query<ConnectionListQuery>,
) -> AppResult<impl IntoResponse> {
    let connections = Connection::list_for_user(&state.pool, claims.sub, query.status).await?;
    Ok((StatusCode::OK, success_to_api_response(connections)))
}

#[axum::debug_handler]
pub async fn get_connection(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let connection = connection_for(&state, connection_id, claims.sub).await?;
    Ok((StatusCode::OK, success_to_api_response(connection)))
}

async fn apply_action(
    state: &AppState,
    claims: &Claims,
    connection_id: Uuid,
    action: ConnectionAction,
) -> AppResult<Connection> {
    let connection = connection_for(state, connection_id, claims.sub).await?;
    let actor = connection
        .participant(claims.sub)
        .ok_or_else(|| AppError::not_found("连接"))?;

    let next = connection.status.apply(action, actor)?;
    if !Connection::transition(&state.pool, connection_id, connection.status, next).await? {
        return Err(AppError::InvalidState(
            "连接状态已被修改，请刷新后重试".into(),
        ));
    }

    tracing::info!(
        "Connection {} {:?} -> {:?} by {}",
        connection_id,
        connection.status,
        next,
        claims.sub
    );

    let updated = connection_for(state, connection_id, claims.sub).await?;
    notify_mentee(state, &updated).await;
    Ok(updated)
}

/// 接受/拒绝后通知学员
async fn notify_mentee(state: &AppState, connection: &Connection) {
    let template = match connection.status {
        ConnectionStatus::Active => EmailTemplate::ConnectionAccepted {
            mentee_name: connection.mentee_name.clone(),
            mentor_name: connection.mentor_name.clone(),
            link: state.app_link(&format!("connections/{}", connection.connection_id)),
        },
        ConnectionStatus::Rejected => EmailTemplate::ConnectionRejected {
            mentee_name: connection.mentee_name.clone(),
            mentor_name: connection.mentor_name.clone(),
        },
        _ => return,
    };

    match User::find_by_id(&state.pool, connection.mentee_id).await {
        Ok(Some(mentee)) => state.notify(&mentee.email, template),
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to load mentee for notification: {}", e),
    }
}

#[axum::debug_handler]
pub async fn accept_connection(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let connection = apply_action(&state, &claims, connection_id, ConnectionAction::Accept).await?;
    Ok((StatusCode::OK, success_to_api_response(connection)))
}

#[axum::debug_handler]
pub async fn reject_connection(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let connection = apply_action(&state, &claims, connection_id, ConnectionAction::Reject).await?;
    Ok((StatusCode::OK, success_to_api_response(connection)))
}

#[axum::debug_handler]
pub async fn cancel_connection(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let connection = apply_action(&state, &claims, connection_id, ConnectionAction::Cancel).await?;
    Ok((StatusCode::OK, success_to_api_response(connection)))
}

#[axum::debug_handler]
pub async fn end_connection(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let connection = apply_action(&state, &claims, connection_id, ConnectionAction::End).await?;
    Ok((StatusCode::OK, success_to_api_response(connection)))
}
