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
    utils::{Claims, success_to_api_response},
};

use super::model::{
    Answer, CreateAnswerRequest, CreateQuestionRequest, Question, QuestionDetail,
    QuestionListQuery,
};

async fn load_question(state: &AppState, question_id: Uuid) -> AppResult<Question> {
    Question::find_by_id(&state.pool, question_id)
        .await?
        .ok_or_else(|| AppError::not_found("问题"))
}

#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionListQuery>,
) -> AppResult<impl IntoResponse> {
    let questions = Question::list(&state.pool, &query).await?;
    Ok((StatusCode::OK, success_to_api_response(questions)))
}

#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let question = load_question(&state, question_id).await?;
    let answers = Answer::list_for_question(&state.pool, question_id).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(QuestionDetail {
            answered: question.is_answered(),
            question,
            answers,
        }),
    ))
}

#[axum::debug_handler]
pub async fn create_question(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<CreateQuestionRequest>,
) -> AppResult<impl IntoResponse> {
    let req = req.validated()?;
    let question = Question::create(&state.pool, claims.sub, req).await?;
    tracing::info!("Question {} asked by {}", question.question_id, claims.sub);

    Ok((StatusCode::CREATED, success_to_api_response(question)))
}

#[axum::debug_handler]
pub async fn create_answer(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    Json(req): Json<CreateAnswerRequest>,
) -> AppResult<impl IntoResponse> {
    if claims.role == UserRole::Mentee {
        return Err(AppError::forbidden("只有导师或管理员可以回答问题"));
    }
    let req = req.validated()?;
    load_question(&state, question_id).await?;

    let answer = Answer::create(&state.pool, question_id, claims.sub, &req.body).await?;
    Ok((StatusCode::CREATED, success_to_api_response(answer)))
}

#[axum::debug_handler]
pub async fn accept_answer(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path((question_id, answer_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let question = load_question(&state, question_id).await?;
    if question.author_id != claims.sub {
        return Err(AppError::forbidden("只有提问者可以采纳回答"));
    }

    if !Question::accept_answer(&state.pool, question_id, answer_id).await? {
        return Err(AppError::not_found("回答"));
    }

    let question = load_question(&state, question_id).await?;
    Ok((StatusCode::OK, success_to_api_response(question)))
}

#[axum::debug_handler]
pub async fn delete_question(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let question = load_question(&state, question_id).await?;
    if question.author_id != claims.sub && !claims.is_admin() {
        return Err(AppError::forbidden("只能删除自己的问题"));
    }

    if !Question::delete(&state.pool, question_id).await? {
        return Err(AppError::not_found("问题"));
    }

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}
