use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub message_id: Uuid,
    pub connection_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// 按 `(created_at, message_id)` 倒序的游标分页，
/// `before`/`before_id` 为上一页最后一条的时间和 ID
#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub before: Option<DateTime<Utc>>,
    pub before_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl MessageListQuery {
    pub fn validated(self) -> Result<Self, AppError> {
        if self.before_id.is_some() && self.before.is_none() {
            return Err(AppError::validation("before_id 必须与 before 一起使用"));
        }
        Ok(self)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

const MESSAGE_COLUMNS: &str =
    "message_id, connection_id, sender_id, recipient_id, body, read_at, created_at";

impl Message {
    pub async fn create(
        pool: &PgPool,
        connection_id: Uuid,
        sender_id: Uuid,
        recipient_id: Uuid,
        body: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (message_id, connection_id, sender_id, recipient_id, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(connection_id)
        .bind(sender_id)
        .bind(recipient_id)
        .bind(body)
        .fetch_one(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        connection_id: Uuid,
        query: &MessageListQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE connection_id = $1
              AND (
                $2::TIMESTAMPTZ IS NULL
                OR created_at < $2
                OR (created_at = $2 AND $3::UUID IS NOT NULL AND message_id < $3)
              )
            ORDER BY created_at DESC, message_id DESC
            LIMIT $4
            "#
        ))
        .bind(connection_id)
        .bind(query.before)
        .bind(query.before_id)
        .bind(query.limit())
        .fetch_all(pool)
        .await
    }

    /// 仅收件人可标记；重复标记保留第一次的时间
    pub async fn mark_read(
        pool: &PgPool,
        message_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            UPDATE messages SET read_at = COALESCE(read_at, NOW())
            WHERE message_id = $1 AND recipient_id = $2
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message_id)
        .bind(recipient_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn unread_count(pool: &PgPool, recipient_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(recipient_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let q = |limit| MessageListQuery {
            before: None,
            before_id: None,
            limit,
        };
        assert_eq!(q(None).limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(q(Some(0)).limit(), 1);
        assert_eq!(q(Some(500)).limit(), MAX_PAGE_LIMIT);
    }

    #[test]
    fn cursor_id_needs_timestamp() {
        let orphan = MessageListQuery {
            before: None,
            before_id: Some(Uuid::new_v4()),
            limit: None,
        };
        assert!(matches!(orphan.validated(), Err(AppError::Validation(_))));

        let full = MessageListQuery {
            before: Some(Utc::now()),
            before_id: Some(Uuid::new_v4()),
            limit: None,
        };
        assert!(full.validated().is_ok());
    }
}
