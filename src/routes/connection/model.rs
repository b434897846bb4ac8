use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ConnectionStatus, Participant};

/// 连接记录，附带双方姓名
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Connection {
    pub connection_id: Uuid,
    pub mentee_id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_name: String,
    pub mentor_name: String,
    pub status: ConnectionStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConnectionRequest {
    pub mentor_id: Uuid,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionListQuery {
    pub status: Option<ConnectionStatus>,
}

impl Connection {
    /// 调用者在连接中的身份；非参与者返回 None
    pub fn participant(&self, user_id: Uuid) -> Option<Participant> {
        if self.mentee_id == user_id {
            Some(Participant::Mentee)
        } else if self.mentor_id == user_id {
            Some(Participant::Mentor)
        } else {
            None
        }
    }

    /// 另一方的 ID
    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if self.mentee_id == user_id {
            self.mentor_id
        } else {
            self.mentee_id
        }
    }
}

const CONNECTION_SELECT: &str = r#"
    SELECT
        c.connection_id, c.mentee_id, c.mentor_id,
        mentee.full_name AS mentee_name, mentor.full_name AS mentor_name,
        c.status, c.message, c.created_at, c.updated_at
    FROM connections c
    JOIN users mentee ON mentee.user_id = c.mentee_id
    JOIN users mentor ON mentor.user_id = c.mentor_id
"#;

impl Connection {
    pub async fn create(
        pool: &PgPool,
        mentee_id: Uuid,
        mentor_id: Uuid,
        message: &str,
    ) -> Result<Self, AppError> {
        let connection_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO connections (connection_id, mentee_id, mentor_id, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(connection_id)
        .bind(mentee_id)
        .bind(mentor_id)
        .bind(message)
        .execute(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("与该导师已有进行中的连接".into()),
            other => other,
        })?;

        let connection = sqlx::query_as::<_, Connection>(&format!(
            "{CONNECTION_SELECT} WHERE c.connection_id = $1"
        ))
        .bind(connection_id)
        .fetch_one(pool)
        .await?;

        Ok(connection)
    }

    /// 只返回调用者参与的连接，避免泄露其它连接是否存在
    pub async fn find_for_participant(
        pool: &PgPool,
        connection_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Connection>(&format!(
            "{CONNECTION_SELECT} WHERE c.connection_id = $1 AND (c.mentee_id = $2 OR c.mentor_id = $2)"
        ))
        .bind(connection_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Connection>(&format!(
            r#"
            {CONNECTION_SELECT}
            WHERE (c.mentee_id = $1 OR c.mentor_id = $1)
              AND ($2::connection_status IS NULL OR c.status = $2)
            ORDER BY c.created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// 条件更新：只有当前状态仍为 `from` 时才写入，并发的另一次转移会失败
    pub async fn transition(
        pool: &PgPool,
        connection_id: Uuid,
        from: ConnectionStatus,
        to: ConnectionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE connections
            SET status = $3, updated_at = NOW()
            WHERE connection_id = $1 AND status = $2
            "#,
        )
        .bind(connection_id)
        .bind(from)
        .bind(to)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
