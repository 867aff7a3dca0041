//! Per-session command history with cursor navigation.

/// Which way to move through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the oldest entry (Up arrow)
    Older,
    /// Towards the fresh input line (Down arrow)
    Newer,
}

impl Direction {
    /// Cursor delta for this direction.
    pub fn offset(self) -> isize {
        match self {
            Direction::Older => -1,
            Direction::Newer => 1,
        }
    }
}

impl TryFrom<i32> for Direction {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Direction::Older),
            1 => Ok(Direction::Newer),
            other => Err(other),
        }
    }
}

/// Ordered log of submitted commands.
///
/// The cursor ranges over `0..=len`; `len` is the fresh input line.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    entries: Vec<String>,
    cursor: usize,
}

impl SessionHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submitted command.
    ///
    /// Empty commands and exact repeats of the previous entry are not
    /// appended. The cursor returns to the fresh line either way.
    pub fn record(&mut self, command: &str) {
        let repeat = self.entries.last().is_some_and(|last| last == command);
        if !command.is_empty() && !repeat {
            self.entries.push(command.to_string());
        }
        self.cursor = self.entries.len();
    }

    /// Move the cursor and return the entry it lands on.
    ///
    /// Returns `None` when the cursor lands on the fresh line or the history
    /// is empty. Moving past either end clamps; there is no wraparound.
    pub fn navigate(&mut self, direction: Direction) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }

        self.cursor = self
            .cursor
            .saturating_add_signed(direction.offset())
            .min(self.entries.len());

        self.entries.get(self.cursor).map(String::as_str)
    }

    /// All recorded entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
