//! # tabterm
//!
//! Hosts several interactive shell sessions side by side from one console.
//!
//! ## Architecture
//!
//! This is Layer 3 - the binary that ties together:
//! - tabterm-core: Core types, events and configuration
//! - tabterm-session: Session lifecycle and multi-session management

use tabterm::{CliOptions, Console, USAGE};
use tabterm_session::{SessionManager, SessionManagerConfig};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let options = CliOptions::parse(std::env::args().skip(1))?;
    if options.help {
        print!("{USAGE}");
        return Ok(());
    }

    let config = options.host_config()?;

    // Initialize logging; stdout carries session output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!(
        "tabterm v{} starting: shell='{}', max_sessions={}",
        env!("CARGO_PKG_VERSION"),
        config.shell.command,
        config.sessions.max_sessions
    );

    let manager = SessionManager::with_config(SessionManagerConfig::from_config(&config));
    let mut console = Console::new(manager, std::io::stdout(), options.json);

    let report = console.run(BufReader::new(tokio::io::stdin())).await?;

    if !report.is_clean() {
        for (id, error) in &report.failures {
            tracing::warn!("Session {} left processes behind: {}", id, error);
        }
    }

    tracing::info!("tabterm shutting down");

    Ok(())
}
