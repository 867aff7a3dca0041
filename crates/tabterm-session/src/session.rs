//! Shell session: one process, its history and its transcript.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use tabterm_core::{Error, HostConfig, ProcessState, Result, SessionId, SessionInfo};
use tabterm_process::{ProcessEventSender, ProcessHandle, ProcessTreeKiller, SystemTreeKiller};

use crate::command::normalize_command;
use crate::history::{Direction, SessionHistory};
use crate::scrollback::Scrollback;

/// How each session's shell is launched and bounded.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Shell executable
    pub command: String,
    /// Shell startup arguments
    pub args: Vec<String>,
    /// Rewrite `cd <path>` to force a drive switch
    pub drive_switch_cd: bool,
    /// Scrollback cap in bytes (0 = unbounded)
    pub scrollback_limit: usize,
    /// Wait bound for a killed shell to be reaped
    pub termination_timeout: Duration,
    /// Process-tree kill backend
    pub killer: Arc<dyn ProcessTreeKiller>,
}

impl SessionOptions {
    /// Options for running `command` with defaults for everything else.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            ..Self::from_config(&HostConfig::default())
        }
    }

    /// Options derived from host configuration.
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            command: config.shell.command.clone(),
            args: config.shell.args.clone(),
            drive_switch_cd: config.shell.drive_switch_cd,
            scrollback_limit: config.sessions.scrollback_limit,
            termination_timeout: config.sessions.termination_timeout(),
            killer: Arc::new(SystemTreeKiller::new()),
        }
    }
}

/// A shell session bound to one UI tab.
#[derive(Debug)]
pub struct Session {
    /// Session identifier
    id: SessionId,

    /// Display label
    label: String,

    /// Shell process
    process: ProcessHandle,

    /// Submitted commands
    history: SessionHistory,

    /// Decoded transcript
    scrollback: Scrollback,

    /// Whether `cd` commands get the drive-switch rewrite
    drive_switch_cd: bool,

    /// Set when a write found the input channel closed
    dead: bool,

    /// Exit code once the shell exited by itself
    exit_code: Option<i32>,
}

impl Session {
    /// Create a session and start its shell immediately.
    ///
    /// Output and exit notifications for this session are delivered on
    /// `events`. Must be called from within a tokio runtime.
    pub fn create(
        id: SessionId,
        label: impl Into<String>,
        options: &SessionOptions,
        events: ProcessEventSender,
    ) -> Result<Self> {
        let label = label.into();
        info!(
            "Creating session: id={}, label='{}', command='{}'",
            id, label, options.command
        );

        let mut process = ProcessHandle::with_killer(id, Arc::clone(&options.killer));
        process.set_termination_timeout(options.termination_timeout);
        process.start(&options.command, &options.args, events)?;

        Ok(Self {
            id,
            label,
            process,
            history: SessionHistory::new(),
            scrollback: Scrollback::with_limit(options.scrollback_limit),
            drive_switch_cd: options.drive_switch_cd,
            dead: false,
            exit_code: None,
        })
    }

    /// Get the session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get the display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get the command history.
    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Get the transcript.
    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Get the shell process handle.
    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }

    /// Submit one line of user input.
    ///
    /// Blank input sends a bare newline and is not recorded. Anything else
    /// is recorded verbatim, normalized, and written with a trailing
    /// newline. If the shell no longer accepts input the write is discarded,
    /// the session is marked dead and [`Error::ChannelClosed`] is returned.
    pub fn submit(&mut self, raw: &str) -> Result<()> {
        let outgoing = normalize_command(raw, self.drive_switch_cd);

        if let Some(entry) = &outgoing.history {
            self.history.record(entry);
        }

        debug!("Submitting to session: id={}, payload={:?}", self.id, outgoing.payload);
        self.process.write(outgoing.as_bytes()).map_err(|e| {
            if matches!(e, Error::ChannelClosed) {
                warn!("Discarding input for dead session: id={}", self.id);
                self.dead = true;
            }
            e
        })
    }

    /// Move through history, returning the text to show in the input line.
    ///
    /// `None` means the fresh (empty) input line.
    pub fn navigate_history(&mut self, direction: Direction) -> Option<String> {
        self.history.navigate(direction).map(str::to_string)
    }

    /// Append decoded shell output to the transcript.
    pub fn append_output(&mut self, text: &str) {
        self.scrollback.append(text);
    }

    /// Record that the shell exited by itself.
    pub fn mark_exited(&mut self, code: Option<i32>) {
        info!("Shell exited: id={}, code={:?}", self.id, code);
        self.exit_code = code;
        self.dead = true;
    }

    /// Exit code, if the shell exited by itself.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Whether the shell is running and accepting input.
    pub fn is_alive(&self) -> bool {
        !self.dead && self.process.is_alive()
    }

    /// Process state of the shell.
    pub fn state(&self) -> ProcessState {
        self.process.state()
    }

    /// Kill the shell's process tree. Idempotent.
    pub async fn terminate(&self) -> Result<()> {
        info!("Terminating session: id={}", self.id);
        self.process.terminate_tree().await
    }

    /// Tab-strip snapshot of this session.
    pub fn info(&self, active: bool) -> SessionInfo {
        SessionInfo {
            id: self.id,
            label: self.label.clone(),
            pid: self.process.pid(),
            state: self.process.state(),
            active,
        }
    }
}
