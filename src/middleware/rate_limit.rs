use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{config::Config, error::AppError};

#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

/// 依次取 x-real-ip、x-forwarded-for 的第一个非空项、连接地址
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
                .map(str::to_string)
        })
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// 窗口内第 limit+1 个请求开始拒绝
pub fn over_limit(count: i64, limit: u32) -> bool {
    count > i64::from(limit)
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Config) -> Self {
        Self {
            redis,
            config: Arc::new(config),
        }
    }

    /// 固定窗口计数，返回当前窗口内的请求数。
    /// 计数键在同一事务里带 TTL 创建，不会留下永不过期的键
    async fn hit(&self, ip: &str) -> redis::RedisResult<i64> {
        let key = format!("rate_limit:{}", ip);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(&key)
            .arg(0)
            .arg("EX")
            .arg(self.config.rate_limit_window().as_secs())
            .arg("NX")
            .ignore()
            .incr(&key, 1)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    pub async fn check_rate_limit(&self, req: Request, next: Next) -> Response {
        let remote = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let ip = client_ip(req.headers(), remote);

        match self.hit(&ip).await {
            Ok(count) if over_limit(count, self.config.rate_limit_requests) => {
                tracing::info!("Rate limit exceeded for {} ({} requests)", ip, count);
                return AppError::RateLimited(self.config.rate_limit_window().as_secs())
                    .into_response();
            }
            Ok(_) => {}
            // Redis 不可用时放行
            Err(e) => tracing::warn!("Rate limiter unavailable, allowing request: {}", e),
        }

        next.run(req).await
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn real_ip_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static(" 10.0.0.1 "));
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers, None), "10.0.0.1");
    }

    #[test]
    fn forwarded_for_skips_empty_entries() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" , 203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, None), "203.0.113.7");
    }

    #[test]
    fn limit_applies_after_the_last_allowed_request() {
        assert!(!over_limit(1, 100));
        assert!(!over_limit(100, 100));
        assert!(over_limit(101, 100));
        assert!(over_limit(1, 0));
    }

    #[test]
    fn rejection_uses_rate_limit_code() {
        let response = AppError::RateLimited(60).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn falls_back_to_socket_address() {
        let addr: SocketAddr = "192.0.2.5:4000".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(addr)), "192.0.2.5");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }
}
