use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Complete,
    Cancel,
}

impl SessionStatus {
    pub fn apply(self, action: SessionAction) -> Result<SessionStatus, AppError> {
        match (self, action) {
            (SessionStatus::Scheduled, SessionAction::Complete) => Ok(SessionStatus::Completed),
            (SessionStatus::Scheduled, SessionAction::Cancel) => Ok(SessionStatus::Cancelled),
            (status, _) => Err(AppError::InvalidState(format!(
                "会话状态为{:?}，不能再变更",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_session_can_complete_or_cancel() {
        assert_eq!(
            SessionStatus::Scheduled.apply(SessionAction::Complete).unwrap(),
            SessionStatus::Completed
        );
        assert_eq!(
            SessionStatus::Scheduled.apply(SessionAction::Cancel).unwrap(),
            SessionStatus::Cancelled
        );
    }

    #[test]
    fn finished_sessions_are_final() {
        for status in [SessionStatus::Completed, SessionStatus::Cancelled] {
            assert!(status.apply(SessionAction::Complete).is_err());
            assert!(status.apply(SessionAction::Cancel).is_err());
        }
    }
}
