//! Error types for tabterm.

use thiserror::Error;

use crate::SessionId;

/// Main error type for tabterm operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The shell executable could not be found or spawned
    #[error("Failed to launch shell: {0}")]
    Launch(String),

    /// Write attempted after the process stopped accepting input
    #[error("Process input channel is closed")]
    ChannelClosed,

    /// Process was already gone when termination was attempted
    #[error("Process {0} already exited")]
    TerminationRace(u32),

    /// The OS refused to kill a process in the tree
    #[error("Could not terminate process {pid}: {reason}")]
    TerminationDenied {
        /// Process that survived the kill attempt
        pid: u32,
        /// OS-reported reason
        reason: String,
    },

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by a single shell process share the workspace error type.
pub type ProcessError = Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_error() {
        let err = Error::Launch("no such file: cmd.exe".to_string());
        assert_eq!(err.to_string(), "Failed to launch shell: no such file: cmd.exe");
    }

    #[test]
    fn test_channel_closed_error() {
        assert_eq!(
            Error::ChannelClosed.to_string(),
            "Process input channel is closed"
        );
    }

    #[test]
    fn test_termination_race_error() {
        let err = Error::TerminationRace(4242);
        assert_eq!(err.to_string(), "Process 4242 already exited");
    }

    #[test]
    fn test_termination_denied_error() {
        let err = Error::TerminationDenied {
            pid: 7,
            reason: "Operation not permitted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not terminate process 7: Operation not permitted"
        );
    }

    #[test]
    fn test_session_not_found_error() {
        let session_id = SessionId::new();
        let err = Error::SessionNotFound(session_id);
        assert!(err.to_string().starts_with("Session not found:"));
    }

    #[test]
    fn test_config_error() {
        let err = Error::Config("shell.command cannot be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: shell.command cannot be empty"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
