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
    email::EmailTemplate,
    error::{AppError, AppResult},
    models::{ConnectionStatus, SessionAction},
    routes::{connection::connection_for, user::User},
    utils::{Claims, success_to_api_response},
};

use super::model::{CreateSessionRequest, Session, SessionListQuery};

pub(crate) async fn session_for(
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
) -> AppResult<Session> {
    Session::find_for_participant(&state.pool, session_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("会话"))
}

#[axum::debug_handler]
pub async fn create_session(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    let req = req.validated(Utc::now())?;

    let connection = connection_for(&state, req.connection_id, claims.sub).await?;
    if connection.status != ConnectionStatus::Active {
        return Err(AppError::InvalidState("只有进行中的连接可以预约会话".into()));
    }

    let session = Session::create(&state.pool, claims.sub, &req).await?;
    tracing::info!(
        "Session {} scheduled on connection {} for {}",
        session.session_id,
        connection.connection_id,
        session.scheduled_at
    );

    let (scheduler_name, recipient_name) = if claims.sub == connection.mentee_id {
        (connection.mentee_name.clone(), connection.mentor_name.clone())
    } else {
        (connection.mentor_name.clone(), connection.mentee_name.clone())
    };
    match User::find_by_id(&state.pool, connection.counterpart(claims.sub)).await {
        Ok(Some(recipient)) => state.notify(
            &recipient.email,
            EmailTemplate::SessionScheduled {
                recipient_name,
                scheduler_name,
                topic: session.topic.clone(),
                scheduled_at: session.scheduled_at,
                duration_minutes: session.duration_minutes,
                meeting_url: session.meeting_url.clone(),
            },
        ),
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to load session recipient: {}", e),
    }

    Ok((StatusCode::CREATED, success_to_api_response(session)))
}

#[axum::debug_handler]
pub async fn list_sessions(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(query): Query<SessionListQuery>,
) -> AppResult<impl IntoResponse> {
    let sessions = Session::list_for_user(&state.pool, claims.sub, &query).await?;
    Ok((StatusCode::OK, success_to_api_response(sessions)))
}

#[axum::debug_handler]
pub async fn get_session(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let session = session_for(&state, session_id, claims.sub).await?;
    Ok((StatusCode::OK, success_to_api_response(session)))
}

async fn apply_action(
    state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
    action: SessionAction,
) -> AppResult<Session> {
    let session = session_for(state, session_id, user_id).await?;
    let next = session.status.apply(action)?;

    if !Session::transition(&state.pool, session_id, session.status, next).await? {
        return Err(AppError::InvalidState(
            "会话状态已被修改，请刷新后重试".into(),
        ));
    }
    tracing::info!("Session {} {:?} -> {:?}", session_id, session.status, next);

    session_for(state, session_id, user_id).await
}

#[axum::debug_handler]
pub async fn complete_session(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let session = apply_action(&state, claims.sub, session_id, SessionAction::Complete).await?;
    Ok((StatusCode::OK, success_to_api_response(session)))
}

#[axum::debug_handler]
pub async fn cancel_session(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let session = apply_action(&state, claims.sub, session_id, SessionAction::Cancel).await?;
    Ok((StatusCode::OK, success_to_api_response(session)))
}
