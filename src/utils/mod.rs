use axum::Json;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::UserRole;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // 用户ID
    pub role: UserRole, // 签发时的角色
    pub exp: i64,       // 过期时间
    pub iat: i64,       // 签发时间
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub fn generate_token(
    user_id: Uuid,
    role: UserRole,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = (now + Duration::seconds(config.jwt_expiration().as_secs() as i64)).timestamp();

    let claims = Claims {
        sub: user_id,
        role,
        exp: expiration,
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 生成一次性重置令牌，返回 (明文, sha256 摘要)，数据库只存摘要
pub fn generate_reset_token() -> (String, String) {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let digest = hash_reset_token(&token);
    (token, digest)
}

pub fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// 通用的API响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 错误码，0表示成功
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const CONFLICT: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INVALID_STATE: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// 分页参数
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.page_size() as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.limit()
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

/// 带分页的响应数据
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, page: &PageQuery, total: i64) -> Self {
        Self {
            items,
            pagination: Pagination {
                page: page.page(),
                page_size: page.page_size(),
                total,
            },
        }
    }
}

/// 校验字符数范围（按 Unicode 字符计）
pub fn ensure_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::validation(format!(
            "{}长度必须在{}到{}个字符之间",
            field, min, max
        )));
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// 把 `%` 和 `_` 转义后包成 ILIKE 模式
pub fn like_pattern(q: &str) -> String {
    let escaped = q
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> Config {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://localhost/test"),
            ("REDIS_URL", "redis://localhost"),
            ("JWT_SECRET", "unit-test-secret"),
        ]
        .into_iter()
        .collect();
        Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap()
    }

    #[test]
    fn token_round_trip_keeps_subject_and_role() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let (token, exp) = generate_token(user_id, UserRole::Mentor, &config).unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, UserRole::Mentor);
        assert_eq!(claims.exp, exp);
        assert!(!claims.is_admin());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = test_config();
        let mut other = config.clone();
        other.jwt_secret = "another-secret".into();
        let (token, _) = generate_token(Uuid::new_v4(), UserRole::Mentee, &other).unwrap();
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn reset_token_digest_matches() {
        let (token, digest) = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_reset_token(&token), digest);
        assert_ne!(token, digest);
    }

    #[test]
    fn page_query_clamps_values() {
        let q = PageQuery {
            page: Some(0),
            page_size: Some(1000),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.page_size(), 100);
        assert_eq!(q.offset(), 0);

        let q = PageQuery {
            page: Some(3),
            page_size: None,
        };
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada.example.com"));
        assert!(!is_valid_email("ada@localhost"));
        assert!(!is_valid_email("a da@example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" rust "), "%rust%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
    }

    #[test]
    fn password_hash_verifies() {
        let hashed = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }
}
