//! Session manager for coordinating multiple shell sessions.
//!
//! The manager is owned by a single event-loop task. Shell processes report
//! through one internal channel; [`SessionManager::next_event`] applies
//! those reports to the owning session and hands UI-facing
//! [`SessionEvent`]s back to the caller.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use tabterm_core::{Error, HostConfig, Result, SessionEvent, SessionId, SessionInfo};
use tabterm_process::ProcessEvent;

use crate::history::Direction;
use crate::session::{Session, SessionOptions};

/// Configuration for session manager.
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,

    /// How every session's shell is launched
    pub session: SessionOptions,
}

impl SessionManagerConfig {
    /// Manager configuration derived from host configuration.
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            max_sessions: config.sessions.max_sessions,
            session: SessionOptions::from_config(config),
        }
    }
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self::from_config(&HostConfig::default())
    }
}

/// What a close request turned into.
#[derive(Debug)]
pub enum CloseOutcome {
    /// The session was closed; others remain
    Closed,
    /// It was the last session, so everything was shut down
    Shutdown(ShutdownReport),
}

impl CloseOutcome {
    /// Whether the close turned into a full shutdown.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, CloseOutcome::Shutdown(_))
    }
}

/// Result of tearing down every session.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Every session that was closed, in tab order
    pub closed: Vec<SessionId>,
    /// Sessions whose process tree could not be fully killed
    pub failures: Vec<(SessionId, Error)>,
}

impl ShutdownReport {
    /// Whether every process tree was terminated.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Session manager for coordinating multiple shell sessions.
#[derive(Debug)]
pub struct SessionManager {
    /// Open sessions in tab order
    sessions: Vec<Session>,

    /// Session receiving input
    active: Option<SessionId>,

    /// Sessions ever created, for "Terminal N" labels
    tabs_created: usize,

    /// Manager configuration
    config: SessionManagerConfig,

    /// Handed to each process for output and exit reports
    process_tx: mpsc::UnboundedSender<ProcessEvent>,

    /// Process reports awaiting routing
    process_rx: mpsc::UnboundedReceiver<ProcessEvent>,

    /// Lifecycle events not yet handed to the UI
    pending: VecDeque<SessionEvent>,

    /// Set once every session has been torn down
    shut_down: bool,
}

impl SessionManager {
    /// Create a new session manager with default configuration.
    pub fn new() -> Self {
        Self::with_config(SessionManagerConfig::default())
    }

    /// Create a new session manager with custom configuration.
    pub fn with_config(config: SessionManagerConfig) -> Self {
        let (process_tx, process_rx) = mpsc::unbounded_channel();
        Self {
            sessions: Vec::new(),
            active: None,
            tabs_created: 0,
            config,
            process_tx,
            process_rx,
            pending: VecDeque::new(),
            shut_down: false,
        }
    }

    /// Open a new session and make it active.
    ///
    /// Returns `Ok(None)` without side effects when the manager is at
    /// capacity or has been shut down. A shell that fails to launch yields
    /// [`SessionEvent::LaunchFailed`] and an error; it does not take a slot.
    pub fn create_session(&mut self) -> Result<Option<SessionId>> {
        if self.shut_down {
            debug!("Ignoring session creation after shutdown");
            return Ok(None);
        }

        if self.sessions.len() >= self.config.max_sessions {
            debug!(
                "Session limit reached ({}), ignoring creation request",
                self.config.max_sessions
            );
            return Ok(None);
        }

        let label = format!("Terminal {}", self.tabs_created + 1);
        let mut id = SessionId::new();
        while self.position(&id).is_some() {
            id = SessionId::new();
        }

        let session = match Session::create(id, &label, &self.config.session, self.process_tx.clone()) {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to launch session '{}': {}", label, e);
                self.pending.push_back(SessionEvent::LaunchFailed {
                    label,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        self.tabs_created += 1;
        self.sessions.push(session);
        self.active = Some(id);
        self.pending
            .push_back(SessionEvent::SessionCreated { id, label: label.clone() });

        info!("Session opened: id={}, label='{}'", id, label);
        Ok(Some(id))
    }

    /// Close a session.
    ///
    /// Closing the last remaining session shuts the whole manager down, so
    /// zero sessions never persist while the application is open.
    pub async fn close_session(&mut self, id: &SessionId) -> Result<CloseOutcome> {
        let index = self.position(id).ok_or(Error::SessionNotFound(*id))?;

        if self.sessions.len() == 1 {
            info!("Closing last session, shutting down: id={}", id);
            let report = self.shutdown_all().await;
            return Ok(CloseOutcome::Shutdown(report));
        }

        let session = self.sessions.remove(index);
        if let Err(e) = session.terminate().await {
            warn!("Incomplete cleanup for session {}: {}", id, e);
            self.pending.push_back(SessionEvent::CleanupIncomplete {
                id: *id,
                error: e.to_string(),
            });
        }
        self.pending.push_back(SessionEvent::SessionClosed { id: *id });

        if self.active == Some(*id) {
            let next = index.min(self.sessions.len() - 1);
            self.active = self.sessions.get(next).map(|s| *s.id());
        }

        info!("Session closed: id={}", id);
        Ok(CloseOutcome::Closed)
    }

    /// Terminate every session's process tree.
    ///
    /// Best effort: a failure in one session does not stop the others from
    /// being terminated. Must run before application exit so no shell is
    /// left orphaned. Calling it again is a no-op.
    pub async fn shutdown_all(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        if self.shut_down {
            return report;
        }

        let sessions = std::mem::take(&mut self.sessions);
        let ids: Vec<SessionId> = sessions.iter().map(|s| *s.id()).collect();
        info!("Shutting down {} session(s)", ids.len());

        // Terminations run concurrently; each may wait out the full timeout
        let mut tasks = JoinSet::new();
        for (index, session) in sessions.into_iter().enumerate() {
            tasks.spawn(async move { (index, session.terminate().await) });
        }

        let mut outcomes = Vec::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("Terminate task failed: {}", e),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        for (index, result) in outcomes {
            if let Err(e) = result {
                let id = ids[index];
                warn!("Incomplete cleanup for session {}: {}", id, e);
                self.pending.push_back(SessionEvent::CleanupIncomplete {
                    id,
                    error: e.to_string(),
                });
                report.failures.push((id, e));
            }
        }

        for id in ids {
            self.pending.push_back(SessionEvent::SessionClosed { id });
            report.closed.push(id);
        }

        self.active = None;
        self.shut_down = true;
        self.pending.push_back(SessionEvent::Shutdown);

        info!(
            "Shutdown complete: closed={}, failures={}",
            report.closed.len(),
            report.failures.len()
        );
        report
    }

    /// Submit a line of input to a session.
    pub fn submit(&mut self, id: &SessionId, text: &str) -> Result<()> {
        self.session_mut(id)?.submit(text)
    }

    /// Navigate a session's command history.
    pub fn navigate_history(
        &mut self,
        id: &SessionId,
        direction: Direction,
    ) -> Result<Option<String>> {
        Ok(self.session_mut(id)?.navigate_history(direction))
    }

    /// Mark a session as the one receiving input.
    pub fn focus(&mut self, id: &SessionId) -> Result<()> {
        self.position(id).ok_or(Error::SessionNotFound(*id))?;
        debug!("Focus moved: id={}", id);
        self.active = Some(*id);
        Ok(())
    }

    /// Wait for the next event for the UI.
    ///
    /// Lifecycle events queued by create/close/shutdown come first. Output
    /// is appended to the owning session's scrollback before it is
    /// returned; reports for sessions that were already closed are dropped.
    /// Pends while nothing is queued and no process is producing output.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            let report = self.process_rx.recv().await?;
            if let Some(event) = self.apply(report) {
                return Some(event);
            }
        }
    }

    /// Drain every event that is ready without waiting.
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        let mut events: Vec<SessionEvent> = self.pending.drain(..).collect();
        while let Ok(report) = self.process_rx.try_recv() {
            if let Some(event) = self.apply(report) {
                events.push(event);
            }
        }
        events
    }

    /// Route one process report to its session.
    fn apply(&mut self, report: ProcessEvent) -> Option<SessionEvent> {
        match report {
            ProcessEvent::Output { id, text } => match self.find_mut(&id) {
                Some(session) => {
                    session.append_output(&text);
                    Some(SessionEvent::Output { id, text })
                }
                None => {
                    debug!("Dropping output for closed session: id={}", id);
                    None
                }
            },
            ProcessEvent::Exited { id, code } => {
                let session = self.find_mut(&id)?;
                session.mark_exited(code);
                Some(SessionEvent::SessionExited { id, code })
            }
        }
    }

    /// Currently focused session.
    pub fn active(&self) -> Option<SessionId> {
        self.active
    }

    /// Get a session by ID.
    pub fn session(&self, id: &SessionId) -> Result<&Session> {
        self.sessions
            .iter()
            .find(|s| s.id() == id)
            .ok_or(Error::SessionNotFound(*id))
    }

    /// Get a mutable session by ID.
    pub fn session_mut(&mut self, id: &SessionId) -> Result<&mut Session> {
        self.find_mut(id).ok_or(Error::SessionNotFound(*id))
    }

    fn find_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    fn position(&self, id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }

    /// Open sessions in tab order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    /// Session IDs in tab order.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| *s.id()).collect()
    }

    /// Tab-strip snapshot of every open session.
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|s| s.info(self.active == Some(*s.id())))
            .collect()
    }

    /// Get the number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Maximum number of concurrent sessions.
    pub fn max_sessions(&self) -> usize {
        self.config.max_sessions
    }

    /// Whether [`shutdown_all`](Self::shutdown_all) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
