use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::cache::{JsonCache, expert_key};
use crate::error::AppError;
use crate::matching::{Candidate, normalize_tags};
use crate::utils::{ensure_len, is_valid_email, like_pattern};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expert {
    pub expert_id: Uuid,
    pub name: String,
    pub title: String,
    pub expertise: String,
    pub bio: String,
    pub contact_email: Option<String>,
    pub avatar_url: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate for Expert {
    fn expertise(&self) -> &str {
        &self.expertise
    }

    // 专家没有评分，推荐专家排在前面
    fn average_rating(&self) -> f64 {
        if self.is_featured { 1.0 } else { 0.0 }
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Deserialize)]
pub struct ExpertListQuery {
    pub q: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ExpertMatchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

/// 部分更新：缺省字段保持不变，`contact_email`/`avatar_url` 传空串表示清除
#[derive(Debug, Default, Deserialize)]
pub struct ExpertPayload {
    pub name: Option<String>,
    pub title: Option<String>,
    pub expertise: Option<String>,
    pub bio: Option<String>,
    pub contact_email: Option<String>,
    pub avatar_url: Option<String>,
    pub is_featured: Option<bool>,
}

impl ExpertPayload {
    /// `creating` 为 true 时姓名必填
    pub fn validated(mut self, creating: bool) -> Result<Self, AppError> {
        self.name = self.name.map(|n| n.trim().to_string());
        match &self.name {
            Some(name) => ensure_len("姓名", name, 1, 100)?,
            None if creating => return Err(AppError::validation("姓名不能为空")),
            None => {}
        }
        if let Some(title) = &self.title {
            ensure_len("头衔", title, 0, 120)?;
        }
        if let Some(bio) = &self.bio {
            ensure_len("简介", bio, 0, 4000)?;
        }
        self.expertise = self.expertise.map(|e| normalize_tags(&e));
        self.contact_email = self.contact_email.map(|e| e.trim().to_lowercase());
        self.avatar_url = self.avatar_url.map(|u| u.trim().to_string());
        if let Some(email) = self.contact_email.as_deref().filter(|e| !e.is_empty()) {
            if !is_valid_email(email) {
                return Err(AppError::validation("联系邮箱格式无效"));
            }
        }
        Ok(self)
    }
}

const EXPERT_COLUMNS: &str = "expert_id, name, title, expertise, bio, contact_email, avatar_url, \
                              is_featured, created_at, updated_at";

impl Expert {
    pub async fn list(pool: &PgPool, query: &ExpertListQuery) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = query
            .q
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern);

        sqlx::query_as::<_, Expert>(&format!(
            r#"
            SELECT {EXPERT_COLUMNS} FROM experts
            WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR title ILIKE $1 OR expertise ILIKE $1)
              AND ($2::BOOLEAN IS NULL OR is_featured = $2)
            ORDER BY is_featured DESC, name ASC
            "#
        ))
        .bind(pattern.as_deref())
        .bind(query.featured)
        .fetch_all(pool)
        .await
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Expert>(&format!("SELECT {EXPERT_COLUMNS} FROM experts"))
            .fetch_all(pool)
            .await
    }

    /// 先查缓存，未命中时查库并回填
    pub async fn find_by_id(
        pool: &PgPool,
        cache: &JsonCache,
        expert_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let key = expert_key(expert_id);
        if let Some(expert) = cache.get::<Expert>(&key).await {
            return Ok(Some(expert));
        }

        let expert = sqlx::query_as::<_, Expert>(&format!(
            "SELECT {EXPERT_COLUMNS} FROM experts WHERE expert_id = $1"
        ))
        .bind(expert_id)
        .fetch_optional(pool)
        .await?;

        if let Some(ref e) = expert {
            cache.set(&key, e).await;
        }
        Ok(expert)
    }

    pub async fn create(pool: &PgPool, payload: ExpertPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Expert>(&format!(
            r#"
            INSERT INTO experts (
                expert_id, name, title, expertise, bio, contact_email, avatar_url, is_featured
            )
            VALUES ($1, $2, COALESCE($3, ''), COALESCE($4, ''), COALESCE($5, ''),
                    NULLIF($6, ''), NULLIF($7, ''), COALESCE($8, FALSE))
            RETURNING {EXPERT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(payload.name)
        .bind(payload.title)
        .bind(payload.expertise)
        .bind(payload.bio)
        .bind(payload.contact_email)
        .bind(payload.avatar_url)
        .bind(payload.is_featured)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        cache: &JsonCache,
        expert_id: Uuid,
        payload: ExpertPayload,
    ) -> Result<Option<Self>, sqlx::Error> {
        let expert = sqlx::query_as::<_, Expert>(&format!(
            r#"
            UPDATE experts SET
                name = COALESCE($2, name),
                title = COALESCE($3, title),
                expertise = COALESCE($4, expertise),
                bio = COALESCE($5, bio),
                contact_email = NULLIF(COALESCE($6, contact_email), ''),
                avatar_url = NULLIF(COALESCE($7, avatar_url), ''),
                is_featured = COALESCE($8, is_featured),
                updated_at = NOW()
            WHERE expert_id = $1
            RETURNING {EXPERT_COLUMNS}
            "#
        ))
        .bind(expert_id)
        .bind(payload.name)
        .bind(payload.title)
        .bind(payload.expertise)
        .bind(payload.bio)
        .bind(payload.contact_email)
        .bind(payload.avatar_url)
        .bind(payload.is_featured)
        .fetch_optional(pool)
        .await?;

        cache.invalidate(&expert_key(expert_id)).await;
        Ok(expert)
    }

    pub async fn delete(
        pool: &PgPool,
        cache: &JsonCache,
        expert_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM experts WHERE expert_id = $1")
            .bind(expert_id)
            .execute(pool)
            .await?;

        cache.invalidate(&expert_key(expert_id)).await;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_name() {
        let err = ExpertPayload::default().validated(true).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(ExpertPayload::default().validated(false).is_ok());
    }

    #[test]
    fn expertise_is_normalized_and_email_checked() {
        let payload = ExpertPayload {
            name: Some(" Grace Hopper ".into()),
            expertise: Some("COBOL, compilers, cobol".into()),
            ..Default::default()
        }
        .validated(true)
        .unwrap();
        assert_eq!(payload.name.as_deref(), Some("Grace Hopper"));
        assert_eq!(payload.expertise.as_deref(), Some("cobol, compilers"));

        let bad = ExpertPayload {
            name: Some("Grace".into()),
            contact_email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(bad.validated(true).is_err());
    }

    #[test]
    fn contact_email_is_trimmed_and_empty_means_clear() {
        let payload = ExpertPayload {
            contact_email: Some("  Grace@Navy.MIL ".into()),
            avatar_url: Some("".into()),
            ..Default::default()
        }
        .validated(false)
        .unwrap();
        assert_eq!(payload.contact_email.as_deref(), Some("grace@navy.mil"));
        assert_eq!(payload.avatar_url.as_deref(), Some(""));

        let cleared = ExpertPayload {
            contact_email: Some("   ".into()),
            ..Default::default()
        }
        .validated(false)
        .unwrap();
        assert_eq!(cleared.contact_email.as_deref(), Some(""));
    }
}
