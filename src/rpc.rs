//! Line-delimited JSON-RPC 2.0 dispatcher
//!
//! Reads one JSON object per line, routes it and writes one response line
//! per request. Requests are handled strictly in order: a request is fully
//! processed, including any automation and settle delay, before the next
//! line is read.
//!
//! Supported methods:
//!
//! - `initialize`: protocol version, capabilities and server info
//! - `tools/list`: the tool descriptors with their input schemas
//! - `tools/call`: runs a tool by name
//! - `ping`: returns `{}`
//!
//! Messages without an `id` are notifications and never get a response.
//! Malformed input produces an error response and the loop keeps going.

use rmcp::model::{ErrorCode, ErrorData, ProtocolVersion, ServerCapabilities, ServerInfo};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::tools::TerminalTools;

/// Server name reported by `initialize`
pub const SERVER_NAME: &str = "pwsh-mcp";

const INSTRUCTIONS: &str = "Drives a PowerShell terminal window on the local desktop. Use \
                            execute_pwsh_script to run a script, then capture_pwsh_response to \
                            see its output. get_clipboard returns the clipboard text.";

/// Parameters of `tools/call`
#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Routes JSON-RPC messages to the tool handlers
#[derive(Clone)]
pub struct Dispatcher {
    tools: TerminalTools,
}

impl Dispatcher {
    /// Creates a dispatcher over `tools`
    pub fn new(tools: TerminalTools) -> Self {
        Self { tools }
    }

    /// Handles one input line
    ///
    /// Returns the response to write, or `None` for blank lines and
    /// notifications.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Discarding unparseable request: {}", e);
                return Some(parse_error(format!("Parse error: {}", e)));
            }
        };

        let Some(envelope) = message.as_object() else {
            return Some(error_response(Value::Null, invalid_request("Request must be a JSON object")));
        };

        let id = envelope.get("id").cloned();
        let method = match envelope.get("method").and_then(Value::as_str) {
            Some(method) => method,
            None => {
                return Some(error_response(
                    id.unwrap_or(Value::Null),
                    invalid_request("Request is missing a string 'method'"),
                ));
            }
        };

        let Some(id) = id else {
            tracing::debug!("Ignoring notification: {}", method);
            return None;
        };

        let params = envelope.get("params").cloned();
        tracing::debug!("Handling request {} ({})", id, method);

        Some(match self.dispatch(method, params).await {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(error) => {
                tracing::warn!("Request {} ({}) failed: {}", id, method, error.message);
                error_response(id, error)
            }
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ErrorData> {
        match method {
            "initialize" => to_result(self.server_info()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": TerminalTools::descriptors() })),
            "tools/call" => {
                let params: CallParams = params
                    .ok_or_else(|| invalid_params("tools/call requires params"))
                    .and_then(|p| {
                        serde_json::from_value(p).map_err(|e| invalid_params(e.to_string()))
                    })?;

                tracing::info!("Calling tool {}", params.name);
                self.tools
                    .call(&params.name, params.arguments)
                    .await
                    .map_err(|e| {
                        tracing::error!("Tool {} failed: {}", params.name, e);
                        e.to_error_data()
                    })
            }
            other => Err(protocol_error(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
                "method_not_found",
                "Supported methods: initialize, tools/list, tools/call, ping.",
            )),
        }
    }

    fn server_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.protocol_version = ProtocolVersion::V_2024_11_05;
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info.name = SERVER_NAME.to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info.instructions = Some(format!(
            "{} Automation backend: {}.",
            INSTRUCTIONS,
            self.tools.automation().backend_name()
        ));
        info
    }
}

/// Serves requests from `reader` until end of input
///
/// Each response is written as one line and flushed immediately.
pub async fn serve<R, W>(
    dispatcher: &Dispatcher,
    mut reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => dispatcher.handle_line(line).await,
            Err(e) => {
                tracing::warn!("Discarding request that is not valid UTF-8: {}", e);
                Some(parse_error(format!("Parse error: input is not valid UTF-8 ({})", e)))
            }
        };

        if let Some(response) = response {
            let mut out = response.to_string();
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}

fn parse_error(message: String) -> Value {
    error_response(
        Value::Null,
        protocol_error(
            ErrorCode::PARSE_ERROR,
            message,
            "parse_error",
            "Send exactly one UTF-8 encoded JSON object per line.",
        ),
    )
}

fn to_result<T: serde::Serialize>(value: T) -> Result<Value, ErrorData> {
    serde_json::to_value(value).map_err(|e| ErrorData::internal_error(e.to_string(), None))
}

fn error_response(id: Value, error: ErrorData) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

fn protocol_error(
    code: ErrorCode,
    message: impl Into<String>,
    kind: &str,
    hint: &str,
) -> ErrorData {
    ErrorData::new(code, message.into(), Some(json!({ "kind": kind, "hint": hint })))
}

fn invalid_request(message: &str) -> ErrorData {
    protocol_error(
        ErrorCode::INVALID_REQUEST,
        message.to_string(),
        "invalid_request",
        "Requests need a 'method' string and, unless they are notifications, an 'id'.",
    )
}

fn invalid_params(reason: impl Into<String>) -> ErrorData {
    protocol_error(
        ErrorCode::INVALID_PARAMS,
        format!("Invalid params: {}", reason.into()),
        "invalid_params",
        "tools/call expects params {\"name\": <tool>, \"arguments\": {...}}.",
    )
}
