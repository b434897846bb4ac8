use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::matching::normalize_tags;
use crate::utils::{ensure_len, like_pattern};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Question {
    pub question_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub title: String,
    pub body: String,
    pub tags: String,
    pub accepted_answer_id: Option<Uuid>,
    pub answer_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn is_answered(&self) -> bool {
        self.accepted_answer_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Answer {
    pub answer_id: Uuid,
    pub question_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub answered: bool,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionListQuery {
    pub q: Option<String>,
    pub answered: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: String,
}

impl CreateQuestionRequest {
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        self.body = self.body.trim().to_string();
        ensure_len("标题", &self.title, 1, 200)?;
        ensure_len("问题内容", &self.body, 1, 10_000)?;
        self.tags = normalize_tags(&self.tags);
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAnswerRequest {
    pub body: String,
}

impl CreateAnswerRequest {
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.body = self.body.trim().to_string();
        ensure_len("回答内容", &self.body, 1, 10_000)?;
        Ok(self)
    }
}

const QUESTION_SELECT: &str = r#"
    SELECT
        q.question_id, q.author_id, u.full_name AS author_name, q.title, q.body, q.tags,
        q.accepted_answer_id,
        (SELECT COUNT(*) FROM answers a WHERE a.question_id = q.question_id) AS answer_count,
        q.created_at, q.updated_at
    FROM questions q
    JOIN users u ON u.user_id = q.author_id
"#;

const ANSWER_SELECT: &str = r#"
    SELECT a.answer_id, a.question_id, a.author_id, u.full_name AS author_name, a.body, a.created_at
    FROM answers a
    JOIN users u ON u.user_id = a.author_id
"#;

impl Question {
    pub async fn list(pool: &PgPool, query: &QuestionListQuery) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = query
            .q
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern);

        sqlx::query_as::<_, Question>(&format!(
            r#"{QUESTION_SELECT}
            WHERE ($1::TEXT IS NULL OR q.title ILIKE $1 OR q.body ILIKE $1 OR q.tags ILIKE $1)
              AND ($2::BOOLEAN IS NULL OR (q.accepted_answer_id IS NOT NULL) = $2)
            ORDER BY q.created_at DESC
            "#
        ))
        .bind(pattern.as_deref())
        .bind(query.answered)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, question_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Question>(&format!("{QUESTION_SELECT} WHERE q.question_id = $1"))
            .bind(question_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        author_id: Uuid,
        req: CreateQuestionRequest,
    ) -> Result<Self, sqlx::Error> {
        let question_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO questions (question_id, author_id, title, body, tags)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(question_id)
        .bind(author_id)
        .bind(req.title)
        .bind(req.body)
        .bind(req.tags)
        .execute(pool)
        .await?;

        sqlx::query_as::<_, Question>(&format!("{QUESTION_SELECT} WHERE q.question_id = $1"))
            .bind(question_id)
            .fetch_one(pool)
            .await
    }

    /// 只接受属于该问题的回答
    pub async fn accept_answer(
        pool: &PgPool,
        question_id: Uuid,
        answer_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE questions SET accepted_answer_id = $2, updated_at = NOW()
            WHERE question_id = $1
              AND EXISTS (SELECT 1 FROM answers WHERE answer_id = $2 AND question_id = $1)
            "#,
        )
        .bind(question_id)
        .bind(answer_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, question_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM questions WHERE question_id = $1")
            .bind(question_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl Answer {
    pub async fn list_for_question(
        pool: &PgPool,
        question_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Answer>(&format!(
            "{ANSWER_SELECT} WHERE a.question_id = $1 ORDER BY a.created_at ASC"
        ))
        .bind(question_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        question_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Self, sqlx::Error> {
        let answer_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO answers (answer_id, question_id, author_id, body)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(answer_id)
        .bind(question_id)
        .bind(author_id)
        .bind(body)
        .execute(pool)
        .await?;

        sqlx::query_as::<_, Answer>(&format!("{ANSWER_SELECT} WHERE a.answer_id = $1"))
            .bind(answer_id)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_request_is_trimmed_and_tagged() {
        let req = CreateQuestionRequest {
            title: "  How do I learn Rust? ".into(),
            body: " lifetimes confuse me ".into(),
            tags: "Rust,rust, Beginner".into(),
        }
        .validated()
        .unwrap();

        assert_eq!(req.title, "How do I learn Rust?");
        assert_eq!(req.body, "lifetimes confuse me");
        assert_eq!(req.tags, "rust, beginner");
    }

    #[test]
    fn blank_question_is_rejected() {
        let req = CreateQuestionRequest {
            title: "   ".into(),
            body: "body".into(),
            tags: String::new(),
        };
        assert!(req.validated().is_err());
    }

    #[test]
    fn blank_answer_is_rejected() {
        let req = CreateAnswerRequest { body: "\n ".into() };
        assert!(req.validated().is_err());
    }
}
