use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("请求过于频繁，请在{0}秒后重试")]
    RateLimited(u64),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{}不存在", what))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Conflict(_) => (StatusCode::CONFLICT, error_codes::CONFLICT),
            AppError::InvalidState(_) => (StatusCode::CONFLICT, error_codes::INVALID_STATE),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMIT),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let msg = match &self {
            // 内部错误细节只写日志，不返回给客户端
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "内部服务器错误".to_string()
            }
            other => other.to_string(),
        };

        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("记录不存在".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("记录已存在".into())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::Validation("关联的记录不存在".into())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("请求体格式无效: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(format!("查询参数无效: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("路径参数无效: {}", rejection.body_text()))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("password hashing failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("token encoding failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            AppError::validation("x").status_and_code(),
            (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR)
        );
        assert_eq!(
            AppError::InvalidState("x".into()).status_and_code(),
            (StatusCode::CONFLICT, error_codes::INVALID_STATE)
        );
        assert_eq!(
            AppError::RateLimited(60).status_and_code().0,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn other_sqlx_errors_become_internal() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
