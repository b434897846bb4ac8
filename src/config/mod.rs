use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub reset_token_expiration_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub db_max_connections: u32,
    pub match_limit: u32,
    pub cache_ttl_secs: u64,
    pub app_base_url: String,
    pub email_from: String,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源加载配置，测试中直接传入 HashMap
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        // JWT_EXPIRATION 允许 "24h" 这种写法
        let jwt_expiration = or_default("JWT_EXPIRATION", "24")
            .trim_end_matches('h')
            .parse::<u64>()
            .unwrap_or(24);
        let reset_expiration = or_default("RESET_TOKEN_EXPIRATION", "30")
            .trim_end_matches('m')
            .parse::<u64>()
            .unwrap_or(30);

        let mut api_base_uri = or_default("API_BASE_URI", "/api");
        if !api_base_uri.starts_with('/') {
            api_base_uri.insert(0, '/');
        }

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            reset_token_expiration_secs: reset_expiration * 60,
            rate_limit_window_secs: or_default("RATE_LIMIT_WINDOW", "60").parse().unwrap_or(60),
            rate_limit_requests: or_default("RATE_LIMIT_REQUESTS", "100")
                .parse()
                .unwrap_or(100),
            server_host: or_default("SERVER_HOST", "0.0.0.0"),
            server_port: or_default("SERVER_PORT", "3000").parse().unwrap_or(3000),
            api_base_uri,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", "10").parse().unwrap_or(10),
            match_limit: or_default("MATCH_LIMIT", "10").parse().unwrap_or(10),
            cache_ttl_secs: or_default("CACHE_TTL", "600").parse().unwrap_or(600),
            app_base_url: or_default("APP_BASE_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            email_from: or_default("EMAIL_FROM", "MentorLink <no-reply@mentorlink.local>"),
            email_api_url: lookup("EMAIL_API_URL").filter(|v| !v.is_empty()),
            email_api_key: lookup("EMAIL_API_KEY").filter(|v| !v.is_empty()),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn reset_token_expiration(&self) -> Duration {
        Duration::from_secs(self.reset_token_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/mentorlink"),
        ("REDIS_URL", "redis://localhost"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.api_base_uri, "/api");
        assert_eq!(config.jwt_expiration_secs, 24 * 3600);
        assert_eq!(config.reset_token_expiration_secs, 30 * 60);
        assert_eq!(config.rate_limit_requests, 100);
        assert_eq!(config.match_limit, 10);
        assert!(config.email_api_url.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn hour_suffix_and_base_uri_are_normalized() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("JWT_EXPIRATION", "2h"));
        pairs.push(("API_BASE_URI", "v1"));
        pairs.push(("APP_BASE_URL", "https://mentorlink.app/"));
        pairs.push(("EMAIL_API_URL", ""));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.jwt_expiration().as_secs(), 7200);
        assert_eq!(config.api_base_uri, "/v1");
        assert_eq!(config.app_base_url, "https://mentorlink.app");
        assert!(config.email_api_url.is_none());
    }
}
