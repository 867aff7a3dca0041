//! # tabterm-core
//!
//! Core types for tabterm.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other tabterm crates. It provides:
//!
//! - Session types (SessionId, SessionInfo, ProcessState)
//! - The event stream consumed by front ends (SessionEvent)
//! - Host configuration (HostConfig)
//! - Platform detection for default shell selection
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other tabterm crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod event;
pub mod platform;
pub mod session;

// Re-export commonly used types
pub use config::{HostConfig, SessionSettings, ShellSettings};
pub use error::{Error, ProcessError, Result};
pub use event::SessionEvent;
pub use platform::Platform;
pub use session::{ProcessState, SessionId, SessionInfo};
