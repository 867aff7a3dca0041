//! Session transcript buffering.

/// Accumulated, decoded shell output for one session.
///
/// Appends are verbatim. When a byte limit is set, the oldest text is
/// dropped (at a character boundary) to stay within it.
#[derive(Debug, Clone, Default)]
pub struct Scrollback {
    /// Transcript text
    text: String,
    /// Byte cap (0 = unbounded)
    limit: usize,
}

impl Scrollback {
    /// Create an unbounded scrollback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scrollback capped at `limit` bytes (0 = unbounded).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Append a chunk of output.
    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if self.limit == 0 || self.text.len() <= self.limit {
            return;
        }

        let mut cut = self.text.len() - self.limit;
        while !self.text.is_char_boundary(cut) {
            cut += 1;
        }

        self.text.drain(..cut);
    }

    /// Whole transcript.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current transcript size in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether nothing has been appended (or everything was dropped).
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrollback_new() {
        let scrollback = Scrollback::new();
        assert!(scrollback.is_empty());
        assert_eq!(scrollback.len(), 0);
    }

    #[test]
    fn test_scrollback_append_is_verbatim() {
        let mut scrollback = Scrollback::new();
        scrollback.append("C:\\>");
        scrollback.append("dir\r\n");

        assert_eq!(scrollback.text(), "C:\\>dir\r\n");
        assert_eq!(scrollback.len(), 9);
    }

    #[test]
    fn test_scrollback_unbounded_by_default() {
        let mut scrollback = Scrollback::with_limit(0);
        let chunk = "x".repeat(10_000);
        scrollback.append(&chunk);
        scrollback.append(&chunk);
        assert_eq!(scrollback.len(), 20_000);
    }

    #[test]
    fn test_scrollback_limit_drops_oldest() {
        let mut scrollback = Scrollback::with_limit(8);
        scrollback.append("0123456789");
        assert_eq!(scrollback.text(), "23456789");

        scrollback.append("ab");
        assert_eq!(scrollback.text(), "456789ab");
    }

    #[test]
    fn test_scrollback_limit_respects_char_boundaries() {
        let mut scrollback = Scrollback::with_limit(5);
        // Each Cyrillic letter is two bytes.
        scrollback.append("абвг");
        assert!(scrollback.len() <= 5);
        assert_eq!(scrollback.text(), "вг");
    }
}
