use std::fmt;

/// Where a relay session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    /// Connected, nothing in flight; the next capture may start.
    Live,
    /// One frame sent, its reply not yet rendered.
    AwaitingAck,
    Closing,
    /// Terminal. A new session needs a new controller.
    Failed(String),
}

impl SessionState {
    /// The legal transition relation.
    ///
    /// Apart from `Live` and `AwaitingAck` alternating, a session never
    /// moves back to an earlier state.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Live)
                | (Connecting, Closing)
                | (Connecting, Failed(_))
                | (Live, AwaitingAck)
                | (Live, Closing)
                | (Live, Failed(_))
                | (AwaitingAck, Live)
                | (AwaitingAck, Closing)
                | (AwaitingAck, Failed(_))
                | (Closing, Idle)
        )
    }

    /// True once a started session has nothing left to do.
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Failed(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Live => write!(f, "live"),
            SessionState::AwaitingAck => write!(f, "awaiting ack"),
            SessionState::Closing => write!(f, "closing"),
            SessionState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// What a dashboard shows for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayStatus {
    Connecting,
    Live,
    /// Not streaming; the reason is set when the session failed.
    Offline(Option<String>),
}

impl From<&SessionState> for RelayStatus {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Connecting => RelayStatus::Connecting,
            SessionState::Live | SessionState::AwaitingAck => RelayStatus::Live,
            SessionState::Idle | SessionState::Closing => RelayStatus::Offline(None),
            SessionState::Failed(reason) => RelayStatus::Offline(Some(reason.clone())),
        }
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayStatus::Connecting => write!(f, "connecting"),
            RelayStatus::Live => write!(f, "live"),
            RelayStatus::Offline(None) => write!(f, "offline"),
            RelayStatus::Offline(Some(reason)) => write!(f, "offline: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_states() -> Vec<SessionState> {
        vec![
            SessionState::Idle,
            SessionState::Connecting,
            SessionState::Live,
            SessionState::AwaitingAck,
            SessionState::Closing,
            SessionState::Failed("x".to_string()),
        ]
    }

    #[test]
    fn test_live_and_awaiting_ack_alternate() {
        assert!(SessionState::Live.can_transition_to(&SessionState::AwaitingAck));
        assert!(SessionState::AwaitingAck.can_transition_to(&SessionState::Live));
    }

    #[test]
    fn test_closing_never_returns_to_live() {
        assert!(!SessionState::Closing.can_transition_to(&SessionState::Live));
        assert!(!SessionState::Closing.can_transition_to(&SessionState::AwaitingAck));
        assert!(SessionState::Closing.can_transition_to(&SessionState::Idle));
    }

    #[test]
    fn test_failed_is_terminal() {
        let failed = SessionState::Failed("gone".to_string());
        for next in all_states() {
            assert!(!failed.can_transition_to(&next), "failed -> {next}");
        }
    }

    #[test]
    fn test_idle_only_starts_connecting() {
        for next in all_states() {
            assert_eq!(
                SessionState::Idle.can_transition_to(&next),
                next == SessionState::Connecting
            );
        }
    }

    #[test]
    fn test_status_hides_transport_details() {
        assert_eq!(RelayStatus::from(&SessionState::AwaitingAck), RelayStatus::Live);
        assert_eq!(RelayStatus::from(&SessionState::Closing), RelayStatus::Offline(None));
        assert_eq!(
            RelayStatus::from(&SessionState::Failed("connection lost".to_string())),
            RelayStatus::Offline(Some("connection lost".to_string()))
        );
        assert_eq!(RelayStatus::Offline(None).to_string(), "offline");
    }
}
