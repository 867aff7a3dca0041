//! # tabterm-session
//!
//! Session lifecycle management for tabterm.
//!
//! This crate provides:
//! - Per-session command history with cursor navigation
//! - Command normalization before it reaches the shell
//! - Scrollback (transcript) buffering
//! - Session creation, input submission and teardown
//! - The bounded multi-session manager and its event pump
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on tabterm-core and
//! tabterm-process to manage shell session lifecycles.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod history;
pub mod manager;
pub mod scrollback;
pub mod session;

// Re-export commonly used types
pub use command::{normalize_command, OutgoingCommand};
pub use history::{Direction, SessionHistory};
pub use manager::{CloseOutcome, SessionManager, SessionManagerConfig, ShutdownReport};
pub use scrollback::Scrollback;
pub use session::{Session, SessionOptions};
