//! Tool handlers
//!
//! The three tools exposed over `tools/call`:
//!
//! - `execute_pwsh_script`: paste a script into the terminal and press Enter
//! - `get_clipboard`: read the clipboard as text
//! - `capture_pwsh_response`: screenshot the terminal's client area
//!
//! Handlers are stateless. Every call goes back to the automation backend,
//! so nothing about the window or the clipboard is cached between requests.

use std::{sync::Arc, time::Duration};

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    automation::TerminalAutomation,
    config::ServerConfig,
    error::{AutomationError, ToolError, ToolResult},
    model::{
        CaptureResponse, CaptureResponseParams, ExecuteScriptParams, ExecuteScriptResponse,
        GetClipboardParams, ScriptKind, ScriptShape, WindowBounds,
    },
    util::{
        capture_file::{resolve_save_path, timestamped_path, write_capture},
        encode::{PNG_MIME_TYPE, encode_png, to_base64},
    },
};

/// Name of the script execution tool
pub const EXECUTE_PWSH_SCRIPT: &str = "execute_pwsh_script";
/// Name of the clipboard tool
pub const GET_CLIPBOARD: &str = "get_clipboard";
/// Name of the capture tool
pub const CAPTURE_PWSH_RESPONSE: &str = "capture_pwsh_response";

/// Tool handlers bound to one automation backend
#[derive(Clone)]
pub struct TerminalTools {
    automation: Arc<dyn TerminalAutomation>,
    config: ServerConfig,
}

impl TerminalTools {
    /// Creates handlers over `automation`
    pub fn new(automation: Arc<dyn TerminalAutomation>, config: ServerConfig) -> Self {
        Self { automation, config }
    }

    /// The automation backend in use
    pub fn automation(&self) -> &Arc<dyn TerminalAutomation> {
        &self.automation
    }

    /// Tool descriptors advertised by `tools/list`
    pub fn descriptors() -> Vec<Tool> {
        vec![
            Tool::new(
                EXECUTE_PWSH_SCRIPT,
                "Execute a PowerShell script by pasting it into the terminal window and pressing \
                 Enter. Works for single commands and multi-line scripts. Returns once the \
                 settle delay has elapsed; use capture_pwsh_response to see the output.",
                schema_of::<ExecuteScriptParams>(),
            ),
            Tool::new(
                GET_CLIPBOARD,
                "Return the current clipboard contents as text.",
                schema_of::<GetClipboardParams>(),
            ),
            Tool::new(
                CAPTURE_PWSH_RESPONSE,
                "Capture a PNG screenshot of the terminal window, optionally limited to a region \
                 of its client area and optionally saved to disk.",
                schema_of::<CaptureResponseParams>(),
            ),
        ]
    }

    /// Routes a tool call by name
    ///
    /// `arguments` of `None` is treated as an empty object.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> ToolResult<Value> {
        let arguments = arguments.unwrap_or_else(|| Value::Object(Default::default()));

        let result = match name {
            EXECUTE_PWSH_SCRIPT => {
                let params = parse_arguments(arguments)?;
                serde_json::to_value(self.execute_pwsh_script(params).await?)
            }
            GET_CLIPBOARD => {
                let _: GetClipboardParams = parse_arguments(arguments)?;
                Ok(Value::String(self.get_clipboard().await?))
            }
            CAPTURE_PWSH_RESPONSE => {
                let params = parse_arguments(arguments)?;
                serde_json::to_value(self.capture_pwsh_response(params).await?)
            }
            other => {
                return Err(ToolError::UnknownTool {
                    name: other.to_string(),
                });
            }
        };

        result.map_err(|e| ToolError::Encoding {
            reason: e.to_string(),
        })
    }

    /// Focuses the terminal, launching one if none is open
    ///
    /// After a launch the window is polled up to `launch_attempts` times. If it
    /// never shows up, the original `WindowNotFound` is returned.
    pub async fn ensure_terminal(&self) -> ToolResult<WindowBounds> {
        let not_found = match self.automation.focus_terminal_window().await {
            Ok(bounds) => return Ok(bounds),
            Err(e @ AutomationError::WindowNotFound { .. }) => e,
            Err(e) => return Err(e.into()),
        };

        if !self.config.launch_terminal {
            return Err(not_found.into());
        }

        tracing::info!("Terminal not available, attempting to launch");
        self.automation.launch_terminal().await?;

        for attempt in 1..=self.config.launch_attempts {
            tokio::time::sleep(self.config.launch_retry_delay).await;
            match self.automation.focus_terminal_window().await {
                Ok(bounds) => {
                    tracing::info!("Terminal ready after {} attempt(s)", attempt);
                    return Ok(bounds);
                }
                Err(AutomationError::WindowNotFound { .. }) => {
                    tracing::debug!(
                        "Terminal not ready, attempt {}/{}",
                        attempt,
                        self.config.launch_attempts
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!("Terminal window did not appear after launching");
        Err(not_found.into())
    }

    /// Pastes `script` into the terminal and submits it
    ///
    /// Waits a settle delay afterwards (longer for multi-line scripts),
    /// capped at the timeout. There is no completion signal, so the script
    /// may still be running when this returns.
    pub async fn execute_pwsh_script(
        &self,
        params: ExecuteScriptParams,
    ) -> ToolResult<ExecuteScriptResponse> {
        if params.script.trim().is_empty() {
            return Err(ToolError::invalid_arguments("Script cannot be empty"));
        }

        let timeout = params.timeout.unwrap_or(self.config.default_timeout_secs);
        if !timeout.is_finite() || timeout <= 0.0 || timeout > self.config.max_timeout_secs {
            return Err(ToolError::invalid_arguments(format!(
                "Timeout must be greater than 0 and at most {} seconds, got {}",
                self.config.max_timeout_secs, timeout
            )));
        }

        let shape = ScriptShape::of(&params.script);
        tracing::info!(
            "Preparing to execute {} with {} line(s)",
            shape.kind.label(),
            shape.lines
        );

        self.ensure_terminal().await?;
        self.automation.set_clipboard(&params.script).await?;
        self.automation.paste_and_submit().await?;

        let settle = match shape.kind {
            ScriptKind::SingleCommand => self.config.singleline_delay,
            ScriptKind::MultiLine => self.config.multiline_delay,
        };
        let wait = settle.min(Duration::from_secs_f64(timeout));
        tokio::time::sleep(wait).await;

        let label = shape.kind.label();
        let message = format!(
            "{}{} with {} line{} submitted",
            label[..1].to_uppercase(),
            &label[1..],
            shape.lines,
            if shape.lines == 1 { "" } else { "s" }
        );
        tracing::info!("{}", message);

        Ok(ExecuteScriptResponse {
            success: true,
            lines_count: shape.lines,
            is_multiline: shape.kind == ScriptKind::MultiLine,
            script_type: shape.kind,
            timeout_used: timeout,
            waited_ms: wait.as_millis() as u64,
            message,
        })
    }

    /// Returns the clipboard text verbatim
    pub async fn get_clipboard(&self) -> ToolResult<String> {
        let text = self.automation.get_clipboard().await?;
        tracing::debug!("Retrieved clipboard content: {} characters", text.chars().count());
        Ok(text)
    }

    /// Captures the terminal and returns it as base64 PNG
    pub async fn capture_pwsh_response(
        &self,
        params: CaptureResponseParams,
    ) -> ToolResult<CaptureResponse> {
        let window = self.ensure_terminal().await?;

        let client = if params.exclude_titlebar {
            window.below_titlebar(self.config.titlebar_height)?
        } else {
            window
        };
        let target = match &params.region {
            Some(region) => client.sub_region(region)?,
            None => client,
        };
        tracing::debug!("Capturing {} (window {})", target, window);

        let image = self.automation.capture_region(target).await?;
        let png = encode_png(&image)?;

        let save_to = match (&params.save_path, &self.config.capture_dir) {
            (Some(path), _) => Some(resolve_save_path(path)?),
            (None, Some(dir)) => Some(timestamped_path(dir)),
            (None, None) => None,
        };
        let (saved_to, file_size_bytes) = match save_to {
            Some(path) => {
                let size = write_capture(&path, &png)?;
                (Some(path.display().to_string()), Some(size))
            }
            None => (None, None),
        };

        Ok(CaptureResponse {
            success: true,
            mime_type: PNG_MIME_TYPE.to_string(),
            image: to_base64(&png),
            width: image.width(),
            height: image.height(),
            exclude_titlebar: params.exclude_titlebar,
            saved_to,
            file_size_bytes,
        })
    }
}

fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> ToolResult<T> {
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

fn schema_of<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    Arc::new(schema.as_object().cloned().unwrap_or_default())
}
