//! Events emitted by the session manager for front ends to render.

use serde::{Deserialize, Serialize};

use crate::SessionId;

/// Notification from the core to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new tab was opened and its shell is running
    SessionCreated {
        /// Session identifier
        id: SessionId,
        /// Display label
        label: String,
    },
    /// Decoded text was appended to a session's scrollback
    Output {
        /// Session identifier
        id: SessionId,
        /// Appended chunk, verbatim
        text: String,
    },
    /// The shell exited by itself; the tab stays open
    SessionExited {
        /// Session identifier
        id: SessionId,
        /// Exit code, when the OS reported one
        code: Option<i32>,
    },
    /// A tab was closed and removed
    SessionClosed {
        /// Session identifier
        id: SessionId,
    },
    /// A shell could not be started; no tab was opened
    LaunchFailed {
        /// Label the tab would have received
        label: String,
        /// Human-readable cause
        error: String,
    },
    /// Part of a process tree survived termination
    CleanupIncomplete {
        /// Session identifier
        id: SessionId,
        /// Human-readable cause
        error: String,
    },
    /// Every session has been torn down; the application should exit
    Shutdown,
}

impl SessionEvent {
    /// The session this event concerns, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            SessionEvent::SessionCreated { id, .. }
            | SessionEvent::Output { id, .. }
            | SessionEvent::SessionExited { id, .. }
            | SessionEvent::SessionClosed { id }
            | SessionEvent::CleanupIncomplete { id, .. } => Some(*id),
            SessionEvent::LaunchFailed { .. } | SessionEvent::Shutdown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let id = SessionId::new();
        let event = SessionEvent::Output {
            id,
            text: "hello\n".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "output");
        assert_eq!(json["text"], "hello\n");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn test_shutdown_has_no_session() {
        assert_eq!(SessionEvent::Shutdown.session_id(), None);
        let id = SessionId::new();
        assert_eq!(SessionEvent::SessionClosed { id }.session_id(), Some(id));
    }
}
