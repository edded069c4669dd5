//! Server configuration
//!
//! All settings have defaults and can be overridden through `PWSH_MCP_*`
//! environment variables. The server has no command-line flags.

use std::{path::PathBuf, time::Duration};

/// Title patterns tried, in order, when looking for the terminal window
pub const DEFAULT_WINDOW_TITLES: &[&str] =
    &["Windows PowerShell", "PowerShell", "Windows Terminal", "Command Prompt", "cmd"];

/// Default script timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// Largest accepted script timeout in seconds
pub const MAX_TIMEOUT_SECS: f64 = 300.0;

/// Height of the terminal title bar trimmed from captures
pub const DEFAULT_TITLEBAR_HEIGHT: u32 = 35;

/// Which automation backend the server drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The native desktop backend (Windows only)
    Native,
    /// In-memory test double, no desktop required
    Mock,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value '{value}' for {variable}: {reason}")]
pub struct ConfigError {
    /// Environment variable name
    pub variable: String,
    /// Offending value
    pub value: String,
    /// What was expected instead
    pub reason: String,
}

/// Runtime configuration for the server and its tool handlers
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Terminal title patterns, tried in order
    pub window_titles: Vec<String>,
    /// Timeout used when `execute_pwsh_script` omits one
    pub default_timeout_secs: f64,
    /// Upper bound for caller-supplied timeouts
    pub max_timeout_secs: f64,
    /// Settle delay after pasting a single-line script
    pub singleline_delay: Duration,
    /// Settle delay after pasting a multi-line script
    pub multiline_delay: Duration,
    /// Pixels trimmed from the top of the window when excluding the title bar
    pub titlebar_height: u32,
    /// Launch a terminal when no window matches
    pub launch_terminal: bool,
    /// Focus attempts after launching a terminal
    pub launch_attempts: u32,
    /// Delay between focus attempts after launching
    pub launch_retry_delay: Duration,
    /// Bound applied to every native adapter call
    pub operation_timeout: Duration,
    /// Directory for captures that have no explicit save path
    pub capture_dir: Option<PathBuf>,
    /// Automation backend
    pub backend: BackendKind,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            window_titles: DEFAULT_WINDOW_TITLES.iter().map(|t| t.to_string()).collect(),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_timeout_secs: MAX_TIMEOUT_SECS,
            singleline_delay: Duration::from_secs(1),
            multiline_delay: Duration::from_secs(2),
            titlebar_height: DEFAULT_TITLEBAR_HEIGHT,
            launch_terminal: true,
            launch_attempts: 10,
            launch_retry_delay: Duration::from_millis(500),
            operation_timeout: Duration::from_secs(10),
            capture_dir: None,
            backend: BackendKind::Native,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Builds a configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("PWSH_MCP_WINDOW_TITLES") {
            let titles: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if titles.is_empty() {
                return Err(invalid("PWSH_MCP_WINDOW_TITLES", &raw, "at least one title is required"));
            }
            config.window_titles = titles;
        }

        if let Some(raw) = lookup("PWSH_MCP_DEFAULT_TIMEOUT") {
            let secs: f64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("PWSH_MCP_DEFAULT_TIMEOUT", &raw, "expected a number"))?;
            if !(secs > 0.0 && secs <= config.max_timeout_secs) {
                return Err(invalid(
                    "PWSH_MCP_DEFAULT_TIMEOUT",
                    &raw,
                    "must be greater than 0 and at most 300",
                ));
            }
            config.default_timeout_secs = secs;
        }

        if let Some(raw) = lookup("PWSH_MCP_TITLEBAR_HEIGHT") {
            config.titlebar_height = raw
                .trim()
                .parse()
                .map_err(|_| invalid("PWSH_MCP_TITLEBAR_HEIGHT", &raw, "expected a pixel count"))?;
        }

        if let Some(raw) = lookup("PWSH_MCP_LAUNCH_TERMINAL") {
            config.launch_terminal = parse_bool(&raw)
                .ok_or_else(|| invalid("PWSH_MCP_LAUNCH_TERMINAL", &raw, "expected true or false"))?;
        }

        if let Some(raw) = lookup("PWSH_MCP_CAPTURE_DIR") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.capture_dir = Some(PathBuf::from(trimmed));
            }
        }

        if let Some(raw) = lookup("PWSH_MCP_BACKEND") {
            config.backend = match raw.trim().to_lowercase().as_str() {
                "native" => BackendKind::Native,
                "mock" => BackendKind::Mock,
                _ => return Err(invalid("PWSH_MCP_BACKEND", &raw, "expected native or mock")),
            };
        }

        if let Some(raw) = lookup("PWSH_MCP_LOG_FORMAT") {
            config.log_format = match raw.trim().to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(invalid("PWSH_MCP_LOG_FORMAT", &raw, "expected text or json")),
            };
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(variable: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError {
        variable: variable.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
