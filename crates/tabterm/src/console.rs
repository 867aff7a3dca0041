//! Line-oriented console front end.
//!
//! Lines starting with `:` control tabs; anything else goes to the active
//! session. Session events are printed as they arrive, either prefixed with
//! the tab label or as JSON lines.

use std::collections::HashMap;
use std::io::Write;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use tabterm_core::{Error, SessionEvent, SessionId};
use tabterm_session::{CloseOutcome, Direction, SessionManager, ShutdownReport};

/// Error parsing a console command.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// Command word not recognised
    #[error("unknown command ':{0}'")]
    Unknown(String),

    /// Required argument missing
    #[error(":{0} requires a tab number")]
    MissingTab(&'static str),

    /// Tab argument is not a positive number
    #[error("invalid tab number '{0}'")]
    InvalidTab(String),
}

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Open a new tab
    New,
    /// Close tab n (1-based), or the active tab
    Close(Option<usize>),
    /// Focus tab n (1-based)
    Focus(usize),
    /// Recall an older history entry
    Up,
    /// Recall a newer history entry
    Down,
    /// List tabs
    List,
    /// Print the active tab's history
    History,
    /// Shut everything down
    Quit,
    /// Send the line to the active shell
    Submit(String),
}

impl ConsoleCommand {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Self::Submit(line.to_string()));
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let tab = words.next();

        match name {
            "new" => Ok(Self::New),
            "close" => tab.map(parse_tab).transpose().map(Self::Close),
            "focus" => parse_tab(tab.ok_or(CommandError::MissingTab("focus"))?).map(Self::Focus),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "list" => Ok(Self::List),
            "history" => Ok(Self::History),
            "quit" | "q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Input line as text; undecodable bytes become U+FFFD.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn parse_tab(word: &str) -> Result<usize, CommandError> {
    match word.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidTab(word.to_string())),
    }
}

/// Whether the console loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading
    Continue,
    /// Leave the loop and shut down
    Exit,
}

/// Console bound to a session manager and an output sink.
#[derive(Debug)]
pub struct Console<W: Write> {
    manager: SessionManager,
    out: W,
    json: bool,

    /// Labels survive session removal so close events can be named
    labels: HashMap<SessionId, String>,

    /// Session whose output ended mid-line
    open_line: Option<SessionId>,

    /// Report from closing the last tab
    closing_report: Option<ShutdownReport>,
}

impl<W: Write> Console<W> {
    /// Create a console.
    pub fn new(manager: SessionManager, out: W, json: bool) -> Self {
        Self {
            manager,
            out,
            json,
            labels: HashMap::new(),
            open_line: None,
            closing_report: None,
        }
    }

    /// The session manager.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// The output sink.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Open the first tab and run until EOF, Ctrl-C, `:quit` or the last
    /// tab closing. Every shell is torn down before this returns, including
    /// when the loop stops on an error.
    pub async fn run<R>(&mut self, input: R) -> anyhow::Result<ShutdownReport>
    where
        R: AsyncBufRead + Unpin,
    {
        let outcome = self.drive(input).await;
        if let Err(e) = &outcome {
            warn!("Console stopped on error, shutting down: {}", e);
        }

        let report = self.manager.shutdown_all().await;
        let report = self.closing_report.take().unwrap_or(report);
        let drained = self.drain_events();

        outcome?;
        drained?;
        Ok(report)
    }

    async fn drive<R>(&mut self, input: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.manager.create_session()?;

        let mut lines = input.split(b'\n');
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            let flow = tokio::select! {
                line = lines.next_segment() => match line? {
                    Some(bytes) => self.handle_line(&decode_line(&bytes)).await?,
                    None => {
                        info!("Input closed");
                        Flow::Exit
                    }
                },
                event = self.manager.next_event() => match event {
                    Some(event) => self.render(&event)?,
                    None => Flow::Exit,
                },
                _ = &mut ctrl_c => {
                    info!("Interrupted");
                    Flow::Exit
                }
            };

            if flow == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Print whatever the manager has queued.
    fn drain_events(&mut self) -> std::io::Result<()> {
        for event in self.manager.poll_events() {
            self.render(&event)?;
        }
        self.out.flush()
    }

    /// Act on one line of input.
    pub async fn handle_line(&mut self, line: &str) -> anyhow::Result<Flow> {
        let command = match ConsoleCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.notice(&e.to_string())?;
                return Ok(Flow::Continue);
            }
        };
        debug!("Console command: {:?}", command);

        match command {
            ConsoleCommand::Submit(text) => {
                let Some(id) = self.manager.active() else {
                    self.notice("no active session")?;
                    return Ok(Flow::Continue);
                };
                match self.manager.submit(&id, &text) {
                    Ok(()) => {}
                    Err(Error::ChannelClosed) => {
                        let message = format!("{} has exited; input discarded", self.label(&id));
                        self.notice(&message)?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            ConsoleCommand::New => match self.manager.create_session() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    let message =
                        format!("session limit reached ({})", self.manager.max_sessions());
                    self.notice(&message)?;
                }
                // Reported through the LaunchFailed event
                Err(_) => {}
            },
            ConsoleCommand::Close(tab) => {
                let target = match tab {
                    Some(n) => self.tab(n),
                    None => self.manager.active(),
                };
                let Some(id) = target else {
                    self.notice("no such tab")?;
                    return Ok(Flow::Continue);
                };
                if let CloseOutcome::Shutdown(report) = self.manager.close_session(&id).await? {
                    self.closing_report = Some(report);
                    return Ok(Flow::Exit);
                }
            }
            ConsoleCommand::Focus(n) => match self.tab(n) {
                Some(id) => {
                    self.manager.focus(&id)?;
                    let message = format!("focused {}", self.label(&id));
                    self.notice(&message)?;
                }
                None => self.notice("no such tab")?,
            },
            ConsoleCommand::Up => self.recall(Direction::Older)?,
            ConsoleCommand::Down => self.recall(Direction::Newer)?,
            ConsoleCommand::List => self.list()?,
            ConsoleCommand::History => {
                if let Some(id) = self.manager.active() {
                    let entries = self.manager.session(&id)?.history().entries().to_vec();
                    for (n, entry) in entries.iter().enumerate() {
                        self.notice(&format!("{:>4}  {}", n + 1, entry))?;
                    }
                }
            }
            ConsoleCommand::Quit => return Ok(Flow::Exit),
        }

        Ok(Flow::Continue)
    }

    /// Print one session event.
    pub fn render(&mut self, event: &SessionEvent) -> std::io::Result<Flow> {
        if let SessionEvent::SessionCreated { id, label } = event {
            self.labels.insert(*id, label.clone());
        }

        if self.json {
            serde_json::to_writer(&mut self.out, event)?;
            writeln!(self.out)?;
        } else {
            match event {
                SessionEvent::Output { id, text } => self.print_output(id, text)?,
                SessionEvent::SessionCreated { label, .. } => {
                    self.line(&format!("[{label}] opened"))?
                }
                SessionEvent::SessionExited { id, code } => {
                    let code = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
                    let message = format!("[{}] shell exited (code {code})", self.label(id));
                    self.line(&message)?
                }
                SessionEvent::SessionClosed { id } => {
                    let message = format!("[{}] closed", self.label(id));
                    self.line(&message)?
                }
                SessionEvent::LaunchFailed { label, error } => {
                    self.line(&format!("[{label}] failed to start: {error}"))?
                }
                SessionEvent::CleanupIncomplete { id, error } => {
                    let message = format!("[{}] cleanup incomplete: {error}", self.label(id));
                    self.line(&message)?
                }
                SessionEvent::Shutdown => self.line("all sessions closed")?,
            }
        }
        self.out.flush()?;

        if let SessionEvent::SessionClosed { id } = event {
            self.labels.remove(id);
        }

        Ok(if *event == SessionEvent::Shutdown {
            Flow::Exit
        } else {
            Flow::Continue
        })
    }

    /// Prefix each output line with its tab label.
    fn print_output(&mut self, id: &SessionId, text: &str) -> std::io::Result<()> {
        let label = self.label(id);
        for piece in text.split_inclusive('\n') {
            if self.open_line != Some(*id) {
                if self.open_line.is_some() {
                    writeln!(self.out)?;
                }
                write!(self.out, "[{label}] ")?;
            }
            write!(self.out, "{piece}")?;
            self.open_line = (!piece.ends_with('\n')).then_some(*id);
        }
        Ok(())
    }

    /// Show the history entry the active tab's cursor moved to.
    fn recall(&mut self, direction: Direction) -> anyhow::Result<()> {
        if let Some(id) = self.manager.active() {
            let recalled = self.manager.navigate_history(&id, direction)?;
            self.notice(&format!("> {}", recalled.unwrap_or_default()))?;
        }
        Ok(())
    }

    fn list(&mut self) -> std::io::Result<()> {
        for (n, info) in self.manager.list_sessions().into_iter().enumerate() {
            let marker = if info.active { '*' } else { ' ' };
            let pid = info.pid.map_or_else(|| "-".to_string(), |p| p.to_string());
            self.notice(&format!(
                "{marker} {}: {} pid={pid} {:?}",
                n + 1,
                info.label,
                info.state
            ))?;
        }
        Ok(())
    }

    fn tab(&self, n: usize) -> Option<SessionId> {
        self.manager.session_ids().get(n.checked_sub(1)?).copied()
    }

    fn label(&self, id: &SessionId) -> String {
        self.labels
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Front-end message, kept out of the JSON event stream.
    fn notice(&mut self, message: &str) -> std::io::Result<()> {
        if self.json {
            info!("{}", message);
            Ok(())
        } else {
            self.line(message)
        }
    }

    fn line(&mut self, message: &str) -> std::io::Result<()> {
        if self.open_line.take().is_some() {
            writeln!(self.out)?;
        }
        writeln!(self.out, "{message}")
    }
}
