//! pwsh-mcp: PowerShell terminal automation server
//!
//! Speaks line-delimited JSON-RPC on stdin/stdout until stdin closes.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use pwsh_mcp::{
    automation::create_backend,
    config::{LogFormat, ServerConfig},
    rpc::{Dispatcher, serve},
    tools::TerminalTools,
};
use tokio::io::{BufReader, stdin, stdout};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    // stdout carries the protocol, so logs go to stderr
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pwsh_mcp=info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(std::io::stderr().is_terminal()).init(),
    }

    info!("pwsh-mcp {} starting", env!("CARGO_PKG_VERSION"));
    info!("Transport: stdio (line-delimited JSON-RPC)");

    let automation = create_backend(&config).context("failed to create automation backend")?;
    info!("Backend initialized: {}", automation.backend_name());
    info!("Terminal title patterns: {:?}", config.window_titles);
    info!("Default timeout: {}s", config.default_timeout_secs);

    let dispatcher = Dispatcher::new(TerminalTools::new(automation, config));
    serve(&dispatcher, BufReader::new(stdin()), stdout()).await?;

    info!("pwsh-mcp shutting down");
    Ok(())
}
