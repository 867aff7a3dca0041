//! Shell subprocess handle with merged output and tree teardown.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use tabterm_core::{Error, ProcessState, Result, SessionId};

use crate::decode::Utf8ChunkDecoder;
use crate::tree::{kill_tree, ProcessTreeKiller, SystemTreeKiller};

/// Read buffer size for stdout/stderr.
const READ_CHUNK: usize = 4096;

/// How long the exit waiter lets the output readers drain after the shell
/// exits. Grandchildren that inherited the pipes can keep them open forever.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Something a shell process reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// Decoded output from stdout or stderr
    Output {
        /// Owning session
        id: SessionId,
        /// Decoded text
        text: String,
    },
    /// The process exited or was reaped after a kill
    Exited {
        /// Owning session
        id: SessionId,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
    },
}

/// Channel on which process tasks deliver [`ProcessEvent`]s.
pub type ProcessEventSender = mpsc::UnboundedSender<ProcessEvent>;

/// Handle to one spawned shell process.
///
/// Output is pushed to the event channel given to [`ProcessHandle::start`];
/// writes are queued to a writer task and never block the caller.
pub struct ProcessHandle {
    /// Session this process belongs to
    id: SessionId,
    /// OS process id once started
    pid: Option<u32>,
    /// Lifecycle state, shared with the exit waiter task
    state: Arc<watch::Sender<ProcessState>>,
    /// Queue feeding the stdin writer task
    stdin_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    /// Tree enumeration and kill backend
    killer: Arc<dyn ProcessTreeKiller>,
    /// Upper bound on waiting for a killed process to be reaped
    termination_timeout: Duration,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("id", &self.id)
            .field("pid", &self.pid)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl ProcessHandle {
    /// Create an unstarted handle using the OS process table for teardown.
    pub fn new(id: SessionId) -> Self {
        Self::with_killer(id, Arc::new(SystemTreeKiller::new()))
    }

    /// Create an unstarted handle with a custom tree killer.
    pub fn with_killer(id: SessionId, killer: Arc<dyn ProcessTreeKiller>) -> Self {
        let (state, _) = watch::channel(ProcessState::NotStarted);
        Self {
            id,
            pid: None,
            state: Arc::new(state),
            stdin_tx: None,
            killer,
            termination_timeout: Duration::from_secs(2),
        }
    }

    /// Set how long [`terminate_tree`](Self::terminate_tree) waits for the
    /// killed shell to be reaped.
    pub fn set_termination_timeout(&mut self, timeout: Duration) {
        self.termination_timeout = timeout;
    }

    /// Spawn the shell.
    ///
    /// Stdout and stderr are both read into `events`, so callers see a
    /// single merged stream. Must be called from within a tokio runtime.
    ///
    /// # Arguments
    /// * `command` - Shell executable (e.g., "cmd.exe", "/bin/bash")
    /// * `args` - Startup arguments
    /// * `events` - Where output and exit notifications are delivered
    pub fn start(
        &mut self,
        command: &str,
        args: &[String],
        events: ProcessEventSender,
    ) -> Result<()> {
        if *self.state.borrow() != ProcessState::NotStarted {
            return Err(Error::Launch(format!(
                "process for session {} was already started",
                self.id
            )));
        }

        info!(
            "Spawning shell: session={}, command='{}', args={:?}",
            self.id, command, args
        );

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                error!("Failed to spawn shell '{}': {}", command, e);
                Error::Launch(format!("{command}: {e}"))
            })?;

        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdin = child.stdin.take();

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            readers.push(tokio::spawn(read_stream(self.id, "stdout", stdout, events.clone())));
        }
        if let Some(stderr) = stderr {
            readers.push(tokio::spawn(read_stream(self.id, "stderr", stderr, events.clone())));
        }

        if let Some(stdin) = stdin {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(write_stream(self.id, stdin, rx));
            self.stdin_tx = Some(tx);
        }

        self.pid = pid;
        self.state.send_replace(ProcessState::Running);

        let id = self.id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("Failed to wait for shell: session={}, {}", id, e);
                    None
                }
            };
            state.send_replace(ProcessState::Terminated);
            debug!("Shell exited: session={}, code={:?}", id, code);

            for reader in readers {
                let _ = tokio::time::timeout(DRAIN_GRACE, reader).await;
            }
            let _ = events.send(ProcessEvent::Exited { id, code });
        });

        info!("Shell spawned: session={}, pid={:?}", self.id, pid);
        Ok(())
    }

    /// Queue bytes for the shell's stdin.
    ///
    /// Returns [`Error::ChannelClosed`] once the process is terminating,
    /// terminated, or its stdin pipe has broken.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        if !self.state.borrow().accepts_input() {
            return Err(Error::ChannelClosed);
        }

        let tx = self.stdin_tx.as_ref().ok_or(Error::ChannelClosed)?;
        debug!("Queueing {} bytes: session={}", data.len(), self.id);
        tx.send(data.to_vec()).map_err(|_| Error::ChannelClosed)
    }

    /// Kill the shell and all of its descendants.
    ///
    /// Idempotent: only the first call against a running process does any
    /// work. Processes that already exited are ignored; a denied kill is
    /// logged and returned as [`Error::TerminationDenied`] after the rest
    /// of the tree has been attempted.
    pub async fn terminate_tree(&self) -> Result<()> {
        let began = self.state.send_if_modified(|state| {
            if *state == ProcessState::Running {
                *state = ProcessState::Terminating;
                true
            } else {
                false
            }
        });

        if !began {
            debug!(
                "Terminate skipped: session={}, state={:?}",
                self.id,
                *self.state.borrow()
            );
            return Ok(());
        }

        let Some(pid) = self.pid else {
            self.state.send_replace(ProcessState::Terminated);
            return Ok(());
        };

        info!("Terminating process tree: session={}, pid={}", self.id, pid);
        let result = kill_tree(self.killer.as_ref(), pid);

        let mut rx = self.state.subscribe();
        let reaped = tokio::time::timeout(
            self.termination_timeout,
            rx.wait_for(|state| *state == ProcessState::Terminated),
        )
        .await;

        if reaped.is_err() {
            warn!(
                "Shell did not exit within {:?}: session={}, pid={}",
                self.termination_timeout, self.id, pid
            );
        }

        // Stop accepting input even if the process outlived the timeout.
        self.state.send_replace(ProcessState::Terminated);

        result
    }

    /// OS process id while the process is alive.
    pub fn pid(&self) -> Option<u32> {
        match *self.state.borrow() {
            ProcessState::Running | ProcessState::Terminating => self.pid,
            ProcessState::NotStarted | ProcessState::Terminated => None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// Whether the process is running and accepting input.
    pub fn is_alive(&self) -> bool {
        self.state().accepts_input()
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.state() != ProcessState::Running {
            return;
        }
        if let Some(pid) = self.pid {
            warn!(
                "Process handle dropped while running, killing tree: session={}, pid={}",
                self.id, pid
            );
            let _ = kill_tree(self.killer.as_ref(), pid);
            self.state.send_replace(ProcessState::Terminated);
        }
    }
}

/// Pump one output pipe into the event channel until EOF.
async fn read_stream<R>(id: SessionId, name: &'static str, mut pipe: R, events: ProcessEventSender)
where
    R: AsyncRead + Unpin,
{
    let mut decoder = Utf8ChunkDecoder::new();
    let mut buffer = vec![0u8; READ_CHUNK];

    loop {
        let n = match pipe.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("Read from {} failed: session={}, {}", name, id, e);
                break;
            }
        };

        debug!("Read {} bytes from {}: session={}", n, name, id);
        let text = decoder.decode(&buffer[..n]);
        if !text.is_empty() && events.send(ProcessEvent::Output { id, text }).is_err() {
            return;
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        let _ = events.send(ProcessEvent::Output { id, text: tail });
    }
}

/// Drain queued input into the shell's stdin.
async fn write_stream(id: SessionId, mut stdin: ChildStdin, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(data) = rx.recv().await {
        if let Err(e) = stdin.write_all(&data).await {
            debug!("Write to stdin failed: session={}, {}", id, e);
            break;
        }
        if let Err(e) = stdin.flush().await {
            debug!("Flush of stdin failed: session={}, {}", id, e);
            break;
        }
    }
}
