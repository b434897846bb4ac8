//! 邮件模板与发送
//!
//! 配置了 `EMAIL_API_URL` 时走 HTTP 邮件服务，否则只记日志。发送失败不影响
//! 触发它的请求。

mod templates;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;

pub use templates::{EmailTemplate, RenderedEmail};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email service responded with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// 未配置邮件服务时使用
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email delivery disabled, logging message instead"
        );
        tracing::debug!("Email body:\n{}", email.text);
        Ok(())
    }
}

pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

/// 邮件服务无响应时，后台发送任务最多等待这么久
const EMAIL_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>) -> Result<Self, MailError> {
        Self::with_timeout(endpoint, api_key, EMAIL_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(&email);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

pub fn mailer_from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.email_api_url {
        Some(url) => match HttpMailer::new(url.clone(), config.email_api_key.clone()) {
            Ok(mailer) => {
                tracing::info!("Email delivery via {}", url);
                Arc::new(mailer)
            }
            Err(e) => {
                tracing::error!("Failed to build email client, logging emails instead: {}", e);
                Arc::new(LogMailer)
            }
        },
        None => Arc::new(LogMailer),
    }
}

/// 渲染模板并在后台发送，失败只记日志
pub fn dispatch(mailer: &Arc<dyn Mailer>, from: &str, to: &str, template: EmailTemplate) {
    let RenderedEmail { subject, text } = template.render();
    let email = OutgoingEmail {
        from: from.to_string(),
        to: to.to_string(),
        subject,
        text,
    };
    let name = template.name();
    let mailer = Arc::clone(mailer);

    tokio::spawn(async move {
        let to = email.to.clone();
        match mailer.send(email).await {
            Ok(()) => tracing::info!("Sent {} email to {}", name, to),
            Err(e) => tracing::warn!("Failed to send {} email to {}: {}", name, to, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_renders_and_sends_in_background() {
        let recorder = Arc::new(RecordingMailer::default());
        let mailer: Arc<dyn Mailer> = recorder.clone();

        dispatch(
            &mailer,
            "noreply@test",
            "ada@example.com",
            EmailTemplate::Welcome {
                name: "Ada".into(),
                role: "mentee".into(),
            },
        );

        for _ in 0..50 {
            if !recorder.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ada@example.com");
        assert_eq!(sent[0].subject, "Welcome to MentorLink");
    }

    #[tokio::test]
    async fn log_mailer_never_fails() {
        let email = OutgoingEmail {
            from: "a".into(),
            to: "b".into(),
            subject: "c".into(),
            text: "d".into(),
        };
        assert!(LogMailer.send(email).await.is_ok());
    }

    #[tokio::test]
    async fn http_mailer_gives_up_on_a_silent_server() {
        // 只接受连接、从不响应的服务
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mailer = HttpMailer::with_timeout(
            format!("http://{}/send", addr),
            Some("key".into()),
            Duration::from_millis(200),
        )
        .unwrap();
        let email = OutgoingEmail {
            from: "noreply@test".into(),
            to: "ada@example.com".into(),
            subject: "hi".into(),
            text: "hello".into(),
        };

        let result = tokio::time::timeout(Duration::from_secs(5), mailer.send(email))
            .await
            .expect("send should time out on its own");
        match result {
            Err(MailError::Transport(e)) => assert!(e.is_timeout(), "{}", e),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
