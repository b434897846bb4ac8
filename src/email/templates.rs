use chrono::{DateTime, Utc};

/// 渲染后的邮件内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub enum EmailTemplate {
    Welcome {
        name: String,
        role: String,
    },
    ConnectionRequest {
        mentor_name: String,
        mentee_name: String,
        message: String,
        link: String,
    },
    ConnectionAccepted {
        mentee_name: String,
        mentor_name: String,
        link: String,
    },
    ConnectionRejected {
        mentee_name: String,
        mentor_name: String,
    },
    SessionScheduled {
        recipient_name: String,
        scheduler_name: String,
        topic: String,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i32,
        meeting_url: Option<String>,
    },
    PasswordReset {
        name: String,
        link: String,
        expires_in_minutes: u64,
    },
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::Welcome { .. } => "welcome",
            EmailTemplate::ConnectionRequest { .. } => "connection_request",
            EmailTemplate::ConnectionAccepted { .. } => "connection_accepted",
            EmailTemplate::ConnectionRejected { .. } => "connection_rejected",
            EmailTemplate::SessionScheduled { .. } => "session_scheduled",
            EmailTemplate::PasswordReset { .. } => "password_reset",
        }
    }

    pub fn render(&self) -> RenderedEmail {
        match self {
            EmailTemplate::Welcome { name, role } => RenderedEmail {
                subject: "Welcome to MentorLink".into(),
                text: format!(
                    "Hi {name},\n\nYour {role} account is ready. Complete your profile so we can \
                     find the right matches for you.\n\nThe MentorLink team"
                ),
            },
            EmailTemplate::ConnectionRequest {
                mentor_name,
                mentee_name,
                message,
                link,
            } => {
                let note = if message.trim().is_empty() {
                    String::new()
                } else {
                    format!("\n\nTheir note:\n> {}", message.trim())
                };
                RenderedEmail {
                    subject: format!("{mentee_name} would like you as a mentor"),
                    text: format!(
                        "Hi {mentor_name},\n\n{mentee_name} sent you a mentorship request.{note}\n\n\
                         Review it here: {link}"
                    ),
                }
            }
            EmailTemplate::ConnectionAccepted {
                mentee_name,
                mentor_name,
                link,
            } => RenderedEmail {
                subject: format!("{mentor_name} accepted your request"),
                text: format!(
                    "Hi {mentee_name},\n\n{mentor_name} accepted your mentorship request. \
                     Schedule your first session: {link}"
                ),
            },
            EmailTemplate::ConnectionRejected {
                mentee_name,
                mentor_name,
            } => RenderedEmail {
                subject: "Update on your mentorship request".into(),
                text: format!(
                    "Hi {mentee_name},\n\n{mentor_name} is not able to take on your request right \
                     now. Check your matches for other mentors."
                ),
            },
            EmailTemplate::SessionScheduled {
                recipient_name,
                scheduler_name,
                topic,
                scheduled_at,
                duration_minutes,
                meeting_url,
            } => {
                let when = scheduled_at.format("%Y-%m-%d %H:%M UTC");
                let url = meeting_url
                    .as_deref()
                    .map(|u| format!("\nJoin: {u}"))
                    .unwrap_or_default();
                RenderedEmail {
                    subject: format!("Session scheduled: {topic}"),
                    text: format!(
                        "Hi {recipient_name},\n\n{scheduler_name} scheduled a {duration_minutes}-minute \
                         session on \"{topic}\" for {when}.{url}"
                    ),
                }
            }
            EmailTemplate::PasswordReset {
                name,
                link,
                expires_in_minutes,
            } => RenderedEmail {
                subject: "Reset your MentorLink password".into(),
                text: format!(
                    "Hi {name},\n\nUse this link to reset your password: {link}\n\
                     It expires in {expires_in_minutes} minutes. If you did not ask for this, \
                     ignore this email."
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn connection_request_includes_note_when_present() {
        let mail = EmailTemplate::ConnectionRequest {
            mentor_name: "Grace".into(),
            mentee_name: "Ada".into(),
            message: "  I'd love help with compilers ".into(),
            link: "http://app/connections/1".into(),
        }
        .render();
        assert_eq!(mail.subject, "Ada would like you as a mentor");
        assert!(mail.text.contains("> I'd love help with compilers"));
        assert!(mail.text.contains("http://app/connections/1"));
    }

    #[test]
    fn connection_request_omits_empty_note() {
        let mail = EmailTemplate::ConnectionRequest {
            mentor_name: "Grace".into(),
            mentee_name: "Ada".into(),
            message: "   ".into(),
            link: "l".into(),
        }
        .render();
        assert!(!mail.text.contains("Their note"));
    }

    #[test]
    fn session_scheduled_formats_time_and_link() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 15, 30, 0).unwrap();
        let template = EmailTemplate::SessionScheduled {
            recipient_name: "Ada".into(),
            scheduler_name: "Grace".into(),
            topic: "Parsers".into(),
            scheduled_at: at,
            duration_minutes: 45,
            meeting_url: Some("https://meet/x".into()),
        };
        assert_eq!(template.name(), "session_scheduled");
        let mail = template.render();
        assert!(mail.text.contains("2026-03-01 15:30 UTC"));
        assert!(mail.text.contains("45-minute"));
        assert!(mail.text.contains("Join: https://meet/x"));
    }
}
