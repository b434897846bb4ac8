use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::ensure_len;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub review_id: Uuid,
    pub session_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    pub reviewee_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub session_id: Uuid,
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

impl CreateReviewRequest {
    pub fn validated(mut self) -> Result<Self, AppError> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::validation("评分必须在1到5之间"));
        }
        self.comment = self.comment.trim().to_string();
        ensure_len("评价内容", &self.comment, 0, 2000)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, FromRow)]
pub struct ReviewSummary {
    pub average_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UserReviews {
    pub summary: ReviewSummary,
    pub reviews: Vec<Review>,
}

const REVIEW_SELECT: &str = r#"
    SELECT
        r.review_id, r.session_id, r.reviewer_id, u.full_name AS reviewer_name,
        r.reviewee_id, r.rating, r.comment, r.created_at
    FROM reviews r
    JOIN users u ON u.user_id = r.reviewer_id
"#;

impl Review {
    pub async fn create(
        pool: &PgPool,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        req: &CreateReviewRequest,
    ) -> Result<Self, AppError> {
        let review_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO reviews (review_id, session_id, reviewer_id, reviewee_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(review_id)
        .bind(req.session_id)
        .bind(reviewer_id)
        .bind(reviewee_id)
        .bind(req.rating)
        .bind(&req.comment)
        .execute(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("已经评价过该会话".into()),
            other => other,
        })?;

        let review = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.review_id = $1"))
            .bind(review_id)
            .fetch_one(pool)
            .await?;
        Ok(review)
    }

    pub async fn list_for_reviewee(
        pool: &PgPool,
        reviewee_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.reviewee_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(reviewee_id)
        .fetch_all(pool)
        .await
    }
}

impl ReviewSummary {
    pub async fn for_user(pool: &PgPool, reviewee_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ReviewSummary>(
            r#"
            SELECT
                COALESCE(AVG(rating), 0)::FLOAT8 AS average_rating,
                COUNT(*) AS review_count
            FROM reviews
            WHERE reviewee_id = $1
            "#,
        )
        .bind(reviewee_id)
        .fetch_one(pool)
        .await
    }
}
