//! Platform detection for choosing the default host shell.
//!
//! The host shell and its startup incantation differ per platform: `cmd.exe`
//! needs its code page switched to UTF-8 before output round-trips cleanly,
//! while POSIX shells already speak UTF-8.

/// Platform families with distinct default shells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Native Windows, hosting `cmd.exe`
    Windows,
    /// Linux, macOS, WSL and other Unix-like targets
    Unix,
}

impl Platform {
    /// Detect the current platform.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Whether the default shell is `cmd.exe`.
    pub fn uses_cmd_shell(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Default shell executable and startup arguments.
    ///
    /// `cmd.exe /k chcp 65001` keeps the shell interactive after switching
    /// its output code page to UTF-8. Elsewhere `$SHELL` is used, falling
    /// back to `/bin/sh`.
    pub fn default_shell(&self) -> (String, Vec<String>) {
        match self {
            Platform::Windows => (
                "cmd.exe".to_string(),
                vec!["/k".to_string(), "chcp 65001".to_string()],
            ),
            Platform::Unix => {
                let shell = std::env::var("SHELL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "/bin/sh".to_string());
                (shell, Vec::new())
            }
        }
    }
}
