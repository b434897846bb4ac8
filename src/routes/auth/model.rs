use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::UserRole;
use crate::routes::user::UserInfo;
use crate::utils::{ensure_len, is_valid_email};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
}

impl RegisterRequest {
    /// 校验并规范化（邮箱转小写、姓名去空白）
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.email = self.email.trim().to_lowercase();
        self.full_name = self.full_name.trim().to_string();

        if !is_valid_email(&self.email) {
            return Err(AppError::validation("邮箱格式无效"));
        }
        if self.role == UserRole::Admin {
            return Err(AppError::validation("不能注册管理员账号"));
        }
        ensure_len("姓名", &self.full_name, 1, 100)?;
        validate_password(&self.password)?;
        Ok(self)
    }
}

/// bcrypt 只处理前 72 字节
pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 || password.len() > 72 {
        return Err(AppError::validation("密码长度必须在8到72个字节之间"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserInfo,
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

pub struct PasswordResetToken;

impl PasswordResetToken {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 消费令牌并更新密码，两步在同一事务内完成；令牌无效时返回 None
    pub async fn consume(
        pool: &PgPool,
        token_hash: &str,
        new_password_hash: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE password_reset_tokens
            SET used_at = NOW()
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE user_id = $2")
            .bind(new_password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // 同一用户的其它未使用令牌一并作废
        sqlx::query(
            "UPDATE password_reset_tokens SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, role: UserRole) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            full_name: "  Ada Lovelace ".into(),
            role,
        }
    }

    #[test]
    fn register_normalizes_email_and_name() {
        let req = request(" Ada@Example.COM ", "password123", UserRole::Mentee)
            .validated()
            .unwrap();
        assert_eq!(req.email, "ada@example.com");
        assert_eq!(req.full_name, "Ada Lovelace");
    }

    #[test]
    fn register_rejects_admin_role() {
        let err = request("ada@example.com", "password123", UserRole::Admin)
            .validated()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn password_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("exactly8").is_ok());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }
}
