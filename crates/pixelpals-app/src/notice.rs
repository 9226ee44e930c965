//! User-facing announcements.

use pixelpals_client::{ClientAction, ConnectionState, MatchNotification};

/// Something the frontend should show outside the regular views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Push-channel state changed.
    Connection(ConnectionState),
    /// A match was accepted or closed.
    Match(MatchNotification),
    /// The credential expired; the user must log in again.
    SessionExpired {
        /// What reported the expiry.
        reason: String,
    },
    /// An operation failed.
    Error {
        /// Description.
        message: String,
    },
}

impl Notice {
    /// Notice carried by a client action, if it is one.
    pub fn from_action(action: &ClientAction) -> Option<Self> {
        match action {
            ClientAction::ConnectionChanged(state) => Some(Self::Connection(*state)),
            ClientAction::MatchUpdate(notification) => Some(Self::Match(notification.clone())),
            ClientAction::SessionExpired { reason } => {
                Some(Self::SessionExpired { reason: reason.clone() })
            },
            ClientAction::Error { message } => Some(Self::Error { message: message.clone() }),
            ClientAction::OpenTransport { .. }
            | ClientAction::Send(_)
            | ClientAction::SendHeartbeat
            | ClientAction::CloseTransport { .. }
            | ClientAction::Fetch { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_actions_are_not_notices() {
        assert_eq!(Notice::from_action(&ClientAction::SendHeartbeat), None);
        assert_eq!(
            Notice::from_action(&ClientAction::ConnectionChanged(ConnectionState::Connecting)),
            Some(Notice::Connection(ConnectionState::Connecting))
        );
    }
}
