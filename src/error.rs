//! Error types for terminal automation and tool handling
//!
//! Two layers of errors live here:
//!
//! - [`AutomationError`]: failures of the OS-level primitives (window focus,
//!   clipboard, keystroke injection, screen capture, terminal launch).
//! - [`ToolError`]: failures surfaced by a tool handler, which wrap
//!   automation failures and add argument validation, encoding and I/O.
//!
//! Every error knows its wire code, a stable snake_case kind and a
//! remediation hint, so the dispatcher can turn it into a JSON-RPC error
//! object without inspecting the variant.

use rmcp::model::{ErrorCode, ErrorData};
use serde_json::json;

/// Result type alias for automation operations
pub type AutomationResult<T> = Result<T, AutomationError>;

/// Result type alias for tool handlers
pub type ToolResult<T> = Result<T, ToolError>;

/// Server-defined JSON-RPC error codes (the -32000..-32099 range)
pub mod codes {
    /// No terminal window matched the configured title patterns
    pub const WINDOW_NOT_FOUND: i32 = -32001;
    /// Clipboard could not be read or written
    pub const CLIPBOARD: i32 = -32002;
    /// Screen capture failed or the region was invalid
    pub const CAPTURE: i32 = -32003;
    /// Keystroke injection failed
    pub const INPUT: i32 = -32004;
    /// A native call exceeded its time bound
    pub const OPERATION_TIMEOUT: i32 = -32005;
    /// The terminal could not be launched or the backend is unusable
    pub const BACKEND: i32 = -32006;
}

/// Failure of an OS-level automation primitive
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutomationError {
    /// No visible window title matched any of the configured patterns
    #[error("Terminal window not found (tried: {})", patterns.join(", "))]
    WindowNotFound {
        /// Title patterns that were tried, in order
        patterns: Vec<String>,
    },

    /// The clipboard could not be opened, read or written
    #[error("Clipboard error: {reason}")]
    Clipboard {
        /// Backend-specific failure description
        reason: String,
    },

    /// The requested screen region could not be captured
    #[error("Capture error: {reason}")]
    Capture {
        /// Why the capture failed
        reason: String,
    },

    /// Simulated keystrokes were rejected by the OS
    #[error("Input injection failed: {reason}")]
    Input {
        /// Why injection failed
        reason: String,
    },

    /// A native call did not complete within its bound
    #[error("{operation} timed out after {duration_ms}ms")]
    OperationTimeout {
        /// Name of the adapter operation
        operation: String,
        /// Bound that was exceeded
        duration_ms: u64,
    },

    /// None of the terminal launch commands could be started
    #[error("Failed to launch a terminal (tried: {})", attempts.join("; "))]
    LaunchFailed {
        /// Command lines that were attempted
        attempts: Vec<String>,
    },

    /// The automation backend cannot run on this platform or build
    #[error("Automation backend '{backend}' is not available on this platform")]
    BackendNotAvailable {
        /// Name of the unavailable backend
        backend: String,
    },

    /// An adapter operation aborted unexpectedly, e.g. its worker panicked
    #[error("{operation} failed unexpectedly: {reason}")]
    Internal {
        /// Name of the adapter operation
        operation: String,
        /// Failure description
        reason: String,
    },
}

impl AutomationError {
    /// Convenience constructor for [`AutomationError::Clipboard`]
    pub fn clipboard(reason: impl Into<String>) -> Self {
        Self::Clipboard {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`AutomationError::Capture`]
    pub fn capture(reason: impl Into<String>) -> Self {
        Self::Capture {
            reason: reason.into(),
        }
    }

    /// Error for an adapter operation whose worker task died
    pub fn internal(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Internal {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`AutomationError::Input`]
    pub fn input(reason: impl Into<String>) -> Self {
        Self::Input {
            reason: reason.into(),
        }
    }

    /// Stable snake_case identifier of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AutomationError::WindowNotFound { .. } => "window_not_found",
            AutomationError::Clipboard { .. } => "clipboard_error",
            AutomationError::Capture { .. } => "capture_error",
            AutomationError::Input { .. } => "input_error",
            AutomationError::OperationTimeout { .. } => "operation_timeout",
            AutomationError::LaunchFailed { .. } => "launch_failed",
            AutomationError::BackendNotAvailable { .. } => "backend_not_available",
            AutomationError::Internal { .. } => "internal_error",
        }
    }

    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i32 {
        match self {
            AutomationError::WindowNotFound { .. } => codes::WINDOW_NOT_FOUND,
            AutomationError::Clipboard { .. } => codes::CLIPBOARD,
            AutomationError::Capture { .. } => codes::CAPTURE,
            AutomationError::Input { .. } => codes::INPUT,
            AutomationError::OperationTimeout { .. } => codes::OPERATION_TIMEOUT,
            AutomationError::LaunchFailed { .. } | AutomationError::BackendNotAvailable { .. } => {
                codes::BACKEND
            }
            AutomationError::Internal { .. } => ErrorCode::INTERNAL_ERROR.0,
        }
    }

    /// Returns a user-facing hint describing how to recover
    pub fn remediation_hint(&self) -> &'static str {
        match self {
            AutomationError::WindowNotFound { .. } => {
                "Open Windows Terminal or PowerShell, or set PWSH_MCP_WINDOW_TITLES to match the \
                 title of your terminal window."
            }
            AutomationError::Clipboard { .. } => {
                "Another application may be holding the clipboard, or it contains non-text data. \
                 Copy some text and retry."
            }
            AutomationError::Capture { .. } => {
                "Make sure the terminal window is visible on screen and the requested region lies \
                 inside its client area."
            }
            AutomationError::Input { .. } => {
                "Keystroke injection is blocked when the desktop is locked or a higher-privilege \
                 window has focus. Unlock the session and retry."
            }
            AutomationError::OperationTimeout { .. } => {
                "The desktop did not respond in time. Check that the session is interactive and \
                 not blocked by a modal dialog."
            }
            AutomationError::LaunchFailed { .. } => {
                "Install Windows Terminal (wt.exe) or PowerShell 7 (pwsh.exe), or start a \
                 terminal manually before calling the tool."
            }
            AutomationError::BackendNotAvailable { .. } => {
                "The native backend requires Windows. Set PWSH_MCP_BACKEND=mock to run the server \
                 without a desktop."
            }
            AutomationError::Internal { .. } => {
                "Retry the call. If it keeps failing, restart the server with \
                 RUST_LOG=pwsh_mcp=debug and check its log output."
            }
        }
    }
}

/// Failure surfaced by a tool handler
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Missing or malformed tool arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// What was wrong with the arguments
        reason: String,
    },

    /// The requested tool name is not one of the exposed tools
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// Tool name as sent by the caller
        name: String,
    },

    /// An automation primitive failed
    #[error(transparent)]
    Automation(#[from] AutomationError),

    /// Captured pixels could not be encoded
    #[error("Failed to encode image: {reason}")]
    Encoding {
        /// Encoder failure description
        reason: String,
    },

    /// A capture file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Convenience constructor for [`ToolError::InvalidArguments`]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// Stable snake_case identifier of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::UnknownTool { .. } => "unknown_tool",
            ToolError::Automation(e) => e.kind(),
            ToolError::Encoding { .. } => "encoding_failed",
            ToolError::Io(_) => "io_error",
        }
    }

    /// JSON-RPC error code for this failure
    pub fn code(&self) -> ErrorCode {
        match self {
            ToolError::InvalidArguments { .. } => ErrorCode::INVALID_PARAMS,
            ToolError::UnknownTool { .. } => ErrorCode::METHOD_NOT_FOUND,
            ToolError::Automation(e) => ErrorCode(e.code()),
            ToolError::Encoding { .. } | ToolError::Io(_) => ErrorCode::INTERNAL_ERROR,
        }
    }

    /// Returns a user-facing hint describing how to recover
    pub fn remediation_hint(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments { .. } => {
                "Check the arguments against the input schema returned by tools/list."
            }
            ToolError::UnknownTool { .. } => {
                "Use one of: execute_pwsh_script, get_clipboard, capture_pwsh_response."
            }
            ToolError::Automation(e) => e.remediation_hint(),
            ToolError::Encoding { .. } => "Retry the capture; the captured frame may be corrupt.",
            ToolError::Io(_) => {
                "Check that the save path is writable and the disk has free space."
            }
        }
    }

    /// Converts the error into the JSON-RPC error object sent on the wire
    pub fn to_error_data(&self) -> ErrorData {
        ErrorData::new(
            self.code(),
            self.to_string(),
            Some(json!({
                "kind": self.kind(),
                "hint": self.remediation_hint(),
            })),
        )
    }
}
