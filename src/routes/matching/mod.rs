use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    extract::Query,
    error::{AppError, AppResult},
    matching::rank,
    models::UserRole,
    routes::user::{Profile, UserSummary},
    utils::{Claims, success_to_api_response},
};

const MAX_MATCHES: usize = 50;

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MentorMatch {
    pub mentor: UserSummary,
    pub score: usize,
    pub matched_keywords: Vec<String>,
}

/// 按学员兴趣为可用导师打分排序
#[axum::debug_handler]
pub async fn find_matches(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> AppResult<impl IntoResponse> {
    if claims.role != UserRole::Mentee {
        return Err(AppError::forbidden("只有学员可以获取导师推荐"));
    }
    let limit = query
        .limit
        .unwrap_or(state.config.match_limit as usize)
        .clamp(1, MAX_MATCHES);

    let profile = Profile::find(&state.pool, claims.sub).await?;
    let candidates = UserSummary::mentor_candidates(&state.pool, claims.sub).await?;
    tracing::debug!(
        "Ranking {} mentor candidates for {}",
        candidates.len(),
        claims.sub
    );

    let matches: Vec<MentorMatch> = rank(&profile.interests, candidates, limit)
        .into_iter()
        .map(|(mentor, s)| MentorMatch {
            mentor,
            score: s.score,
            matched_keywords: s.matched,
        })
        .collect();

    Ok((StatusCode::OK, success_to_api_response(matches)))
}
