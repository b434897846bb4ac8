use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::SessionStatus;
use crate::utils::ensure_len;

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 240;

/// 会话记录，附带所属连接的双方
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub connection_id: Uuid,
    pub mentee_id: Uuid,
    pub mentor_id: Uuid,
    pub scheduled_by: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub topic: String,
    pub meeting_url: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if self.mentee_id == user_id {
            self.mentor_id
        } else {
            self.mentee_id
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub connection_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub topic: String,
    pub meeting_url: Option<String>,
}

impl CreateSessionRequest {
    pub fn validated(mut self, now: DateTime<Utc>) -> Result<Self, AppError> {
        self.topic = self.topic.trim().to_string();
        self.meeting_url = self
            .meeting_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if self.scheduled_at <= now {
            return Err(AppError::validation("会话时间必须晚于当前时间"));
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(AppError::validation(format!(
                "会话时长必须在{}到{}分钟之间",
                MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
            )));
        }
        ensure_len("主题", &self.topic, 1, 200)?;
        if let Some(url) = &self.meeting_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(AppError::validation("会议链接必须是 http(s) 链接"));
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub status: Option<SessionStatus>,
    /// 只看未来的会话
    #[serde(default)]
    pub upcoming: bool,
}

const SESSION_SELECT: &str = r#"
    SELECT
        s.session_id, s.connection_id, c.mentee_id, c.mentor_id, s.scheduled_by,
        s.scheduled_at, s.duration_minutes, s.topic, s.meeting_url, s.status,
        s.created_at, s.updated_at
    FROM sessions s
    JOIN connections c ON c.connection_id = s.connection_id
"#;

impl Session {
    pub async fn create(
        pool: &PgPool,
        scheduled_by: Uuid,
        req: &CreateSessionRequest,
    ) -> Result<Self, sqlx::Error> {
        let session_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO sessions (
                session_id, connection_id, scheduled_by, scheduled_at,
                duration_minutes, topic, meeting_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session_id)
        .bind(req.connection_id)
        .bind(scheduled_by)
        .bind(req.scheduled_at)
        .bind(req.duration_minutes)
        .bind(&req.topic)
        .bind(req.meeting_url.as_deref())
        .execute(pool)
        .await?;

        sqlx::query_as::<_, Session>(&format!("{SESSION_SELECT} WHERE s.session_id = $1"))
            .bind(session_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_for_participant(
        pool: &PgPool,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Session>(&format!(
            "{SESSION_SELECT} WHERE s.session_id = $1 AND (c.mentee_id = $2 OR c.mentor_id = $2)"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        query: &SessionListQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Session>(&format!(
            r#"
            {SESSION_SELECT}
            WHERE (c.mentee_id = $1 OR c.mentor_id = $1)
              AND ($2::session_status IS NULL OR s.status = $2)
              AND (NOT $3 OR s.scheduled_at > NOW())
            ORDER BY s.scheduled_at ASC
            "#
        ))
        .bind(user_id)
        .bind(query.status)
        .bind(query.upcoming)
        .fetch_all(pool)
        .await
    }

    pub async fn transition(
        pool: &PgPool,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET status = $3, updated_at = NOW()
            WHERE session_id = $1 AND status = $2
            "#,
        )
        .bind(session_id)
        .bind(from)
        .bind(to)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(offset: Duration, duration_minutes: i32, topic: &str) -> CreateSessionRequest {
        CreateSessionRequest {
            connection_id: Uuid::new_v4(),
            scheduled_at: Utc::now() + offset,
            duration_minutes,
            topic: topic.into(),
            meeting_url: Some("  ".into()),
        }
    }

    #[test]
    fn valid_request_is_trimmed() {
        let req = request(Duration::hours(2), 60, "  Career planning ")
            .validated(Utc::now())
            .unwrap();
        assert_eq!(req.topic, "Career planning");
        assert!(req.meeting_url.is_none());
    }

    #[test]
    fn past_time_is_rejected() {
        assert!(
            request(Duration::minutes(-5), 60, "x")
                .validated(Utc::now())
                .is_err()
        );
    }

    #[test]
    fn duration_bounds() {
        let now = Utc::now();
        assert!(request(Duration::hours(1), 14, "x").validated(now).is_err());
        assert!(request(Duration::hours(1), 15, "x").validated(now).is_ok());
        assert!(request(Duration::hours(1), 240, "x").validated(now).is_ok());
        assert!(request(Duration::hours(1), 241, "x").validated(now).is_err());
    }

    #[test]
    fn blank_topic_is_rejected() {
        assert!(
            request(Duration::hours(1), 30, "   ")
                .validated(Utc::now())
                .is_err()
        );
    }
}
