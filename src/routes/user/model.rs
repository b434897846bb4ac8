use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::matching::{Candidate, normalize_tags};
use crate::models::UserRole;
use crate::utils::{PageQuery, ensure_len, like_pattern};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 返回给客户端的用户信息（不含密码哈希）
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub headline: String,
    pub bio: String,
    pub interests: String,
    pub expertise: String,
    pub location: String,
    pub avatar_url: Option<String>,
    pub available: bool,
    pub updated_at: DateTime<Utc>,
}

/// 公开的用户卡片：档案 + 评价汇总
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub user_id: Uuid,
    pub full_name: String,
    pub role: UserRole,
    pub headline: String,
    pub bio: String,
    pub interests: String,
    pub expertise: String,
    pub location: String,
    pub avatar_url: Option<String>,
    pub available: bool,
    pub average_rating: f64,
    pub review_count: i64,
}

impl Candidate for UserSummary {
    fn expertise(&self) -> &str {
        &self.expertise
    }

    fn average_rating(&self) -> f64 {
        self.average_rating
    }

    fn display_name(&self) -> &str {
        &self.full_name
    }
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<String>,
    pub expertise: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub available: Option<bool>,
}

impl UpdateProfileRequest {
    /// 校验长度并规范化标签字段
    pub fn normalized(mut self) -> Result<Self, AppError> {
        if let Some(headline) = &self.headline {
            ensure_len("简介标题", headline, 0, 120)?;
        }
        if let Some(bio) = &self.bio {
            ensure_len("个人介绍", bio, 0, 2000)?;
        }
        if let Some(location) = &self.location {
            ensure_len("所在地", location, 0, 120)?;
        }
        if let Some(url) = &self.avatar_url {
            if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AppError::validation("头像地址必须是 http(s) 链接"));
            }
        }
        self.interests = self.interests.map(|s| normalize_tags(&s));
        self.expertise = self.expertise.map(|s| normalize_tags(&s));
        if let Some(interests) = &self.interests {
            ensure_len("兴趣", interests, 0, 500)?;
        }
        if let Some(expertise) = &self.expertise {
            ensure_len("专长", expertise, 0, 500)?;
        }
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserInfo,
    pub profile: Profile,
}

/// 用户卡片查询，评价按被评价人聚合
pub(crate) const SUMMARY_SELECT: &str = r#"
    SELECT
        u.user_id, u.full_name, u.role,
        p.headline, p.bio, p.interests, p.expertise, p.location, p.avatar_url, p.available,
        COALESCE(r.average_rating, 0)::FLOAT8 AS average_rating,
        COALESCE(r.review_count, 0) AS review_count
    FROM users u
    JOIN user_profiles p ON p.user_id = u.user_id
    LEFT JOIN (
        SELECT reviewee_id, AVG(rating)::FLOAT8 AS average_rating, COUNT(*) AS review_count
        FROM reviews
        GROUP BY reviewee_id
    ) r ON r.reviewee_id = u.user_id
"#;

const USER_COLUMNS: &str =
    "user_id, email, full_name, password_hash, role, is_active, created_at, updated_at";

impl User {
    /// 创建用户并同时创建空档案
    pub async fn create(
        pool: &PgPool,
        email: &str,
        full_name: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_id, email, full_name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(full_name)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1)")
            .bind(user.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Created {} user {}", role.as_str(), user.user_id);
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(pool)
        .await
    }

    pub async fn update_password(
        pool: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE user_id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// 管理后台列表，包含已停用用户
    pub async fn list_all(
        pool: &PgPool,
        role: Option<UserRole>,
        q: Option<&str>,
        page: &PageQuery,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let pattern = q.filter(|s| !s.trim().is_empty()).map(like_pattern);

        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::TEXT IS NULL OR full_name ILIKE $2 OR email ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(role)
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::TEXT IS NULL OR full_name ILIKE $2 OR email ILIKE $2)
            "#,
        )
        .bind(role)
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await?;

        Ok((users, total))
    }

    pub async fn set_role(
        pool: &PgPool,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET role = $1, updated_at = NOW()
            WHERE user_id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(role)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_active(
        pool: &PgPool,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET is_active = $1, updated_at = NOW()
            WHERE user_id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(is_active)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 删除用户，关联数据由外键级联删除
    pub async fn delete(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl Profile {
    pub async fn find(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT user_id, headline, bio, interests, expertise, location, avatar_url,
                   available, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// 部分更新，未提供的字段保持原值；空字符串头像表示清除
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<Self, sqlx::Error> {
        let clear_avatar = req.avatar_url.as_deref() == Some("");
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE user_profiles SET
                headline = COALESCE($2, headline),
                bio = COALESCE($3, bio),
                interests = COALESCE($4, interests),
                expertise = COALESCE($5, expertise),
                location = COALESCE($6, location),
                avatar_url = CASE WHEN $8 THEN NULL ELSE COALESCE($7, avatar_url) END,
                available = COALESCE($9, available),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, headline, bio, interests, expertise, location, avatar_url,
                      available, updated_at
            "#,
        )
        .bind(user_id)
        .bind(req.headline)
        .bind(req.bio)
        .bind(req.interests)
        .bind(req.expertise)
        .bind(req.location)
        .bind(req.avatar_url.filter(|u| !u.is_empty()))
        .bind(clear_avatar)
        .bind(req.available)
        .fetch_one(pool)
        .await
    }
}

impl UserSummary {
    pub async fn find(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(&format!(
            "{SUMMARY_SELECT} WHERE u.user_id = $1 AND u.is_active"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 活跃用户目录，q 匹配姓名、标题和专长
    pub async fn list(
        pool: &PgPool,
        role: Option<UserRole>,
        q: Option<&str>,
        page: &PageQuery,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let pattern = q.filter(|s| !s.trim().is_empty()).map(like_pattern);
        let filter = r#"
            WHERE u.is_active
              AND ($1::user_role IS NULL OR u.role = $1)
              AND ($2::TEXT IS NULL OR u.full_name ILIKE $2 OR p.headline ILIKE $2
                   OR p.expertise ILIKE $2)
        "#;

        let items = sqlx::query_as::<_, UserSummary>(&format!(
            "{SUMMARY_SELECT} {filter} ORDER BY u.created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(role)
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM users u JOIN user_profiles p ON p.user_id = u.user_id {filter}"
        ))
        .bind(role)
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await?;

        Ok((items, total))
    }

    /// 匹配候选导师：活跃、可预约、与该学员没有进行中的连接
    pub async fn mentor_candidates(
        pool: &PgPool,
        mentee_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(&format!(
            r#"
            {SUMMARY_SELECT}
            WHERE u.role = 'mentor'
              AND u.is_active
              AND p.available
              AND u.user_id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM connections c
                  WHERE c.mentee_id = $1
                    AND c.mentor_id = u.user_id
                    AND c.status IN ('pending', 'active')
              )
            "#
        ))
        .bind(mentee_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_normalizes_tags() {
        let req = UpdateProfileRequest {
            interests: Some(" Rust , Databases,rust".into()),
            expertise: Some("".into()),
            ..Default::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(req.interests.as_deref(), Some("rust, databases"));
        assert_eq!(req.expertise.as_deref(), Some(""));
    }

    #[test]
    fn profile_update_rejects_non_http_avatar() {
        let req = UpdateProfileRequest {
            avatar_url: Some("javascript:alert(1)".into()),
            ..Default::default()
        };
        assert!(matches!(req.normalized(), Err(AppError::Validation(_))));
    }

    #[test]
    fn empty_avatar_is_allowed_for_clearing() {
        let req = UpdateProfileRequest {
            avatar_url: Some(String::new()),
            ..Default::default()
        };
        assert!(req.normalized().is_ok());
    }
}
