use std::sync::Arc;

use cache::JsonCache;
use config::Config;
use email::{EmailTemplate, Mailer};
use redis::Client as RedisClient;
use sqlx::PgPool;

pub mod cache;
pub mod config;
pub mod email;
pub mod error;
pub mod extract;
pub mod matching;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub redis: Arc<RedisClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// 异步发送模板邮件，失败只记日志
    pub fn notify(&self, to: &str, template: EmailTemplate) {
        email::dispatch(&self.mailer, &self.config.email_from, to, template);
    }

    pub fn cache(&self) -> JsonCache {
        JsonCache::new(self.redis.clone(), self.config.cache_ttl_secs)
    }

    /// 前端页面链接，用于邮件正文
    pub fn app_link(&self, path: &str) -> String {
        format!("{}/{}", self.config.app_base_url, path.trim_start_matches('/'))
    }
}
