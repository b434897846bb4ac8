use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "connection_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Active,
    Rejected,
    Cancelled,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    Accept,
    Reject,
    Cancel,
    End,
}

/// 操作者在连接中的身份
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    Mentee,
    Mentor,
}

impl ConnectionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionAction::Accept => "accept",
            ConnectionAction::Reject => "reject",
            ConnectionAction::Cancel => "cancel",
            ConnectionAction::End => "end",
        }
    }
}

impl ConnectionStatus {
    /// 计算状态转移。返回值为目标状态，调用方用 `WHERE status = 当前状态` 落库
    pub fn apply(
        self,
        action: ConnectionAction,
        actor: Participant,
    ) -> Result<ConnectionStatus, AppError> {
        use ConnectionAction::*;
        use ConnectionStatus::*;

        let (required_from, to) = match action {
            Accept => (Pending, Active),
            Reject => (Pending, Rejected),
            Cancel => (Pending, Cancelled),
            End => (Active, Ended),
        };

        let allowed_actor = match action {
            Accept | Reject => actor == Participant::Mentor,
            Cancel => actor == Participant::Mentee,
            End => true,
        };
        if !allowed_actor {
            return Err(AppError::forbidden(format!(
                "当前身份不能执行{}操作",
                action.as_str()
            )));
        }

        if self != required_from {
            return Err(AppError::InvalidState(format!(
                "连接状态为{:?}，不能执行{}操作",
                self,
                action.as_str()
            )));
        }

        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentor_accepts_pending_request() {
        let next = ConnectionStatus::Pending
            .apply(ConnectionAction::Accept, Participant::Mentor)
            .unwrap();
        assert_eq!(next, ConnectionStatus::Active);
    }

    #[test]
    fn mentee_cannot_accept_own_request() {
        let err = ConnectionStatus::Pending
            .apply(ConnectionAction::Accept, Participant::Mentee)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn only_mentee_cancels() {
        assert_eq!(
            ConnectionStatus::Pending
                .apply(ConnectionAction::Cancel, Participant::Mentee)
                .unwrap(),
            ConnectionStatus::Cancelled
        );
        assert!(
            ConnectionStatus::Pending
                .apply(ConnectionAction::Cancel, Participant::Mentor)
                .is_err()
        );
    }

    #[test]
    fn either_side_ends_active_connection() {
        for actor in [Participant::Mentee, Participant::Mentor] {
            assert_eq!(
                ConnectionStatus::Active
                    .apply(ConnectionAction::End, actor)
                    .unwrap(),
                ConnectionStatus::Ended
            );
        }
    }

    #[test]
    fn terminal_states_reject_every_action() {
        let terminal = [
            ConnectionStatus::Rejected,
            ConnectionStatus::Cancelled,
            ConnectionStatus::Ended,
        ];
        for status in terminal {
            for (action, actor) in [
                (ConnectionAction::Accept, Participant::Mentor),
                (ConnectionAction::Reject, Participant::Mentor),
                (ConnectionAction::Cancel, Participant::Mentee),
                (ConnectionAction::End, Participant::Mentee),
            ] {
                let err = status.apply(action, actor).unwrap_err();
                assert!(matches!(err, AppError::InvalidState(_)), "{:?}", status);
            }
        }
    }

    #[test]
    fn active_connection_cannot_be_accepted_again() {
        let err = ConnectionStatus::Active
            .apply(ConnectionAction::Accept, Participant::Mentor)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
