use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::matching::normalize_tags;
use crate::models::OpportunityKind;
use crate::utils::{ensure_len, like_pattern};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Opportunity {
    pub opportunity_id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub description: String,
    pub kind: OpportunityKind,
    pub organization: String,
    pub location: String,
    pub tags: String,
    pub apply_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OpportunityListQuery {
    pub kind: Option<OpportunityKind>,
    pub q: Option<String>,
    #[serde(default)]
    pub include_expired: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateOpportunityRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: OpportunityKind,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: String,
    pub apply_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// 部分更新：`apply_url` 传空串表示清除，`clear_deadline` 为 true 时去掉截止时间
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOpportunityRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<OpportunityKind>,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub tags: Option<String>,
    pub apply_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_deadline: bool,
    pub is_active: Option<bool>,
}

fn check_apply_url(url: &Option<String>) -> Result<(), AppError> {
    if let Some(url) = url.as_deref().filter(|u| !u.is_empty()) {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(AppError::validation("申请链接必须是 http(s) 链接"));
        }
    }
    Ok(())
}

impl CreateOpportunityRequest {
    pub fn validated(mut self, now: DateTime<Utc>) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        ensure_len("标题", &self.title, 1, 200)?;
        ensure_len("描述", &self.description, 0, 10_000)?;
        self.tags = normalize_tags(&self.tags);
        self.apply_url = self
            .apply_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        check_apply_url(&self.apply_url)?;
        if matches!(self.deadline, Some(deadline) if deadline <= now) {
            return Err(AppError::validation("截止时间必须晚于当前时间"));
        }
        Ok(self)
    }
}

impl UpdateOpportunityRequest {
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.title = self.title.map(|t| t.trim().to_string());
        if let Some(title) = &self.title {
            ensure_len("标题", title, 1, 200)?;
        }
        if let Some(description) = &self.description {
            ensure_len("描述", description, 0, 10_000)?;
        }
        self.tags = self.tags.map(|t| normalize_tags(&t));
        self.apply_url = self.apply_url.map(|u| u.trim().to_string());
        check_apply_url(&self.apply_url)?;
        if self.clear_deadline && self.deadline.is_some() {
            return Err(AppError::validation("不能同时设置和清除截止时间"));
        }
        Ok(self)
    }
}

const OPPORTUNITY_COLUMNS: &str = "opportunity_id, posted_by, title, description, kind, \
                                   organization, location, tags, apply_url, deadline, is_active, \
                                   created_at, updated_at";

impl Opportunity {
    pub async fn list(
        pool: &PgPool,
        query: &OpportunityListQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = query
            .q
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern);

        sqlx::query_as::<_, Opportunity>(&format!(
            r#"
            SELECT {OPPORTUNITY_COLUMNS} FROM opportunities
            WHERE ($1::opportunity_kind IS NULL OR kind = $1)
              AND ($2::TEXT IS NULL OR title ILIKE $2 OR organization ILIKE $2 OR tags ILIKE $2)
              AND ($3 OR (is_active AND (deadline IS NULL OR deadline > NOW())))
            ORDER BY deadline ASC NULLS LAST, created_at DESC
            "#
        ))
        .bind(query.kind)
        .bind(pattern.as_deref())
        .bind(query.include_expired)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        opportunity_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE opportunity_id = $1"
        ))
        .bind(opportunity_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        posted_by: Uuid,
        req: CreateOpportunityRequest,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&format!(
            r#"
            INSERT INTO opportunities (
                opportunity_id, posted_by, title, description, kind, organization,
                location, tags, apply_url, deadline
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {OPPORTUNITY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(posted_by)
        .bind(req.title)
        .bind(req.description)
        .bind(req.kind)
        .bind(req.organization)
        .bind(req.location)
        .bind(req.tags)
        .bind(req.apply_url)
        .bind(req.deadline)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        opportunity_id: Uuid,
        req: UpdateOpportunityRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&format!(
            r#"
            UPDATE opportunities SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                kind = COALESCE($4, kind),
                organization = COALESCE($5, organization),
                location = COALESCE($6, location),
                tags = COALESCE($7, tags),
                apply_url = NULLIF(COALESCE($8, apply_url), ''),
                deadline = CASE WHEN $11 THEN NULL ELSE COALESCE($9, deadline) END,
                is_active = COALESCE($10, is_active),
                updated_at = NOW()
            WHERE opportunity_id = $1
            RETURNING {OPPORTUNITY_COLUMNS}
            "#
        ))
        .bind(opportunity_id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.kind)
        .bind(req.organization)
        .bind(req.location)
        .bind(req.tags)
        .bind(req.apply_url)
        .bind(req.deadline)
        .bind(req.is_active)
        .bind(req.clear_deadline)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, opportunity_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM opportunities WHERE opportunity_id = $1")
            .bind(opportunity_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
