//! Session identity and process lifecycle types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a shell session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a shell process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Handle constructed, nothing spawned yet
    NotStarted,
    /// Process is running and accepting input
    Running,
    /// A tree kill is in progress
    Terminating,
    /// Process has exited or been killed
    Terminated,
}

impl ProcessState {
    /// Whether the process can still receive input.
    pub fn accepts_input(&self) -> bool {
        matches!(self, ProcessState::Running)
    }
}

/// Snapshot of a session as shown in a tab strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session identifier
    pub id: SessionId,
    /// Display label ("Terminal N")
    pub label: String,
    /// OS process id, if the shell is running
    pub pid: Option<u32>,
    /// Process state
    pub state: ProcessState,
    /// Whether this session receives input
    pub active: bool,
}
