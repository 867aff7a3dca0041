//! tabterm console library
//!
//! Argument parsing and the line-oriented console that drives a
//! [`tabterm_session::SessionManager`]. The binary is in main.rs.

pub mod cli;
pub mod console;

// Re-export commonly used types
pub use cli::{CliOptions, USAGE};
pub use console::{CommandError, Console, ConsoleCommand, Flow};
