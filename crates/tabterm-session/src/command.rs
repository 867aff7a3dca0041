//! Turning a submitted input line into what history keeps and what the
//! shell receives.
//!
//! The two differ on purpose: history keeps exactly what was typed, while
//! the shell gets a trimmed and possibly rewritten command.

/// Drive-switch flag understood by `cmd.exe`'s `cd`.
const DRIVE_SWITCH_FLAG: &str = "/d";

/// Result of normalizing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingCommand {
    /// Text to record in history (`None` for blank input)
    pub history: Option<String>,
    /// Text to write to the shell, newline-terminated
    pub payload: String,
}

impl OutgoingCommand {
    /// Payload as UTF-8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.payload.as_bytes()
    }
}

/// Normalize a raw input line.
///
/// - Blank input sends a bare newline and records nothing.
/// - Otherwise the untrimmed input is recorded and the trimmed input is sent
///   with a single trailing newline.
/// - With `drive_switch_cd`, `cd <path>` becomes `cd /d <path>` unless the
///   flag is already there, and a bare `cd` becomes a bare newline instead
///   of printing the current directory.
pub fn normalize_command(raw: &str, drive_switch_cd: bool) -> OutgoingCommand {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return OutgoingCommand {
            history: None,
            payload: "\n".to_string(),
        };
    }

    let payload = if drive_switch_cd {
        rewrite_cd(trimmed)
    } else {
        None
    }
    .unwrap_or_else(|| format!("{trimmed}\n"));

    OutgoingCommand {
        history: Some(raw.to_string()),
        payload,
    }
}

/// Rewrite `cd` forms; `None` means send the command unchanged.
fn rewrite_cd(trimmed: &str) -> Option<String> {
    // A single newline, not a rewritten "\n" plus the usual terminator
    if trimmed.eq_ignore_ascii_case("cd") {
        return Some("\n".to_string());
    }

    let is_cd = trimmed
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("cd "));
    if !is_cd {
        return None;
    }

    let target = &trimmed[3..];
    let has_flag = target
        .trim_start()
        .get(..DRIVE_SWITCH_FLAG.len())
        .is_some_and(|flag| flag.eq_ignore_ascii_case(DRIVE_SWITCH_FLAG));

    if has_flag {
        None
    } else {
        Some(format!("cd {DRIVE_SWITCH_FLAG} {target}\n"))
    }
}
