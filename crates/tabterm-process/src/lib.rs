//! # tabterm-process
//!
//! Shell subprocess management for tabterm.
//!
//! This crate provides:
//! - Shell process spawning with stdout and stderr merged into one stream
//! - Non-blocking input writes
//! - Lossy UTF-8 decoding of output chunks
//! - Process-tree termination (the shell and everything it spawned)
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on tabterm-core and is
//! driven by tabterm-session.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decode;
pub mod process;
pub mod tree;

// Re-export commonly used types
pub use decode::Utf8ChunkDecoder;
pub use process::{ProcessEvent, ProcessEventSender, ProcessHandle};
pub use tree::{is_process_alive, kill_tree, ProcessTreeKiller, SystemTreeKiller};
