//! Command-line options.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tabterm_core::HostConfig;

/// Usage text printed for `--help`.
pub const USAGE: &str = "\
Usage: tabterm [OPTIONS]

Options:
  --config <PATH>        Load host configuration from a YAML file
  --shell <COMMAND>      Shell to launch in every session
  --max-sessions <N>     Maximum number of concurrent sessions
  --json                 Print events as JSON lines
  -h, --help             Print this help
";

/// Parsed command-line options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    /// YAML configuration file
    pub config: Option<PathBuf>,
    /// Shell override
    pub shell: Option<String>,
    /// Session cap override
    pub max_sessions: Option<usize>,
    /// Emit JSON lines instead of prefixed text
    pub json: bool,
    /// Print usage and exit
    pub help: bool,
}

impl CliOptions {
    /// Parse arguments, excluding the program name.
    pub fn parse<I, S>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config requires a path")?;
                    options.config = Some(PathBuf::from(path));
                }
                "--shell" => {
                    options.shell = Some(args.next().context("--shell requires a command")?);
                }
                "--max-sessions" => {
                    let value = args.next().context("--max-sessions requires a number")?;
                    let max = value
                        .parse()
                        .with_context(|| format!("invalid --max-sessions value '{value}'"))?;
                    options.max_sessions = Some(max);
                }
                "--json" => options.json = true,
                "-h" | "--help" => options.help = true,
                other => bail!("unknown argument '{other}'"),
            }
        }

        Ok(options)
    }

    /// Resolve host configuration: file (or defaults), then overrides.
    pub fn host_config(&self) -> anyhow::Result<HostConfig> {
        let mut config = match &self.config {
            Some(path) => HostConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => HostConfig::default(),
        };

        if let Some(shell) = &self.shell {
            config.shell.command = shell.clone();
            config.shell.args.clear();
        }
        if let Some(max) = self.max_sessions {
            config.sessions.max_sessions = max;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let options = CliOptions::parse(Vec::<String>::new()).unwrap();
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn test_parse_all_flags() {
        let options = CliOptions::parse([
            "--config",
            "host.yaml",
            "--shell",
            "/bin/bash",
            "--max-sessions",
            "3",
            "--json",
        ])
        .unwrap();

        assert_eq!(options.config, Some(PathBuf::from("host.yaml")));
        assert_eq!(options.shell.as_deref(), Some("/bin/bash"));
        assert_eq!(options.max_sessions, Some(3));
        assert!(options.json);
        assert!(!options.help);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(CliOptions::parse(["--verbose"]).is_err());
    }

    #[test]
    fn test_parse_missing_value() {
        assert!(CliOptions::parse(["--shell"]).is_err());
        assert!(CliOptions::parse(["--max-sessions", "many"]).is_err());
    }

    #[test]
    fn test_shell_override_clears_args() {
        let options = CliOptions::parse(["--shell", "/bin/sh"]).unwrap();
        let config = options.host_config().unwrap();
        assert_eq!(config.shell.command, "/bin/sh");
        assert!(config.shell.args.is_empty());
    }

    #[test]
    fn test_zero_sessions_rejected() {
        let options = CliOptions::parse(["--max-sessions", "0"]).unwrap();
        assert!(options.host_config().is_err());
    }
}
