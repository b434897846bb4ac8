//! 跨模块共享的领域类型：角色以及连接、会话的状态机

mod connection;
mod session;

pub use connection::{ConnectionAction, ConnectionStatus, Participant};
pub use session::{SessionAction, SessionStatus};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Mentee,
    Mentor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Mentee => "mentee",
            UserRole::Mentor => "mentor",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "opportunity_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    Job,
    Internship,
    Mentorship,
    Event,
    Scholarship,
}
