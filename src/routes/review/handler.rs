use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    extract::{Json, Path},
    error::{AppError, AppResult},
    models::SessionStatus,
    routes::session::session_for,
    utils::{Claims, success_to_api_response},
};

use super::model::{CreateReviewRequest, Review, ReviewSummary, UserReviews};

#[axum::debug_handler]
pub async fn create_review(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<CreateReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let req = req.validated()?;

    let session = session_for(&state, req.session_id, claims.sub).await?;
    if session.status != SessionStatus::Completed {
        return Err(AppError::InvalidState("只能评价已完成的会话".into()));
    }

    let reviewee_id = session.counterpart(claims.sub);
    let review = Review::create(&state.pool, claims.sub, reviewee_id, &req).await?;
    tracing::info!(
        "Review {} ({} stars) for user {} on session {}",
        review.review_id,
        review.rating,
        reviewee_id,
        session.session_id
    );

    Ok((StatusCode::CREATED, success_to_api_response(review)))
}

#[axum::debug_handler]
pub async fn list_user_reviews(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let summary = ReviewSummary::for_user(&state.pool, user_id).await?;
    let reviews = Review::list_for_reviewee(&state.pool, user_id).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(UserReviews { summary, reviews }),
    ))
}
