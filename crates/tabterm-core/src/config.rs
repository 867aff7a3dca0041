//! Configuration types for tabterm.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Error, Platform};

/// Host configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Shell launch settings
    pub shell: ShellSettings,
    /// Session manager settings
    pub sessions: SessionSettings,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl HostConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: HostConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.sessions.max_sessions == 0 {
            return Err(Error::Config("sessions.max_sessions must be > 0".to_string()));
        }

        if self.shell.command.trim().is_empty() {
            return Err(Error::Config("shell.command cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Which shell each session launches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Shell executable
    pub command: String,
    /// Startup arguments
    pub args: Vec<String>,
    /// Rewrite `cd <path>` to `cd /d <path>` so drive changes succeed
    pub drive_switch_cd: bool,
}

impl Default for ShellSettings {
    fn default() -> Self {
        let platform = Platform::detect();
        let (command, args) = platform.default_shell();
        Self {
            command,
            args,
            drive_switch_cd: platform.uses_cmd_shell(),
        }
    }
}

/// Session manager limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,
    /// Scrollback cap in bytes per session (0 = unbounded)
    pub scrollback_limit: usize,
    /// How long to wait for a killed shell to be reaped
    pub termination_timeout_ms: u64,
}

impl SessionSettings {
    /// Termination timeout as a [`Duration`].
    pub fn termination_timeout(&self) -> Duration {
        Duration::from_millis(self.termination_timeout_ms)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: 7,
            scrollback_limit: 1024 * 1024,
            termination_timeout_ms: 2000,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            shell: ShellSettings::default(),
            sessions: SessionSettings::default(),
            log_level: "info".to_string(),
        }
    }
}
