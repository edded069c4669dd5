//! JSON-RPC Test Harness
//!
//! Drives the dispatcher exactly as the binary does, over in-memory
//! streams, with a `MockAutomation` standing in for the desktop.
//!
//! # Usage
//!
//! ```rust
//! use common::rpc_harness::RpcTestContext;
//!
//! #[tokio::test]
//! async fn test_clipboard() {
//!     let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_clipboard("hi"));
//!     let response = ctx.call_tool(1, "get_clipboard", json!({})).await;
//!     assert_eq!(response["result"], "hi");
//! }
//! ```

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use pwsh_mcp::{
    automation::MockAutomation,
    config::ServerConfig,
    rpc::{Dispatcher, serve},
    tools::TerminalTools,
};
use serde_json::{Value, json};

/// Test fixture wrapping a dispatcher over a mock backend
pub struct RpcTestContext {
    /// Dispatcher under test
    pub dispatcher: Dispatcher,
    /// The mock backend, for inspecting pastes and call counts
    pub mock: Arc<MockAutomation>,
}

impl RpcTestContext {
    /// Default mock: one PowerShell window, empty clipboard
    pub fn new_with_mock() -> Self {
        Self::new_with_configured_mock(MockAutomation::new())
    }

    /// Use a pre-configured mock with the fast test configuration
    pub fn new_with_configured_mock(mock: MockAutomation) -> Self {
        Self::new_with_config(mock, fast_config())
    }

    /// Use a pre-configured mock and configuration
    pub fn new_with_config(mock: MockAutomation, config: ServerConfig) -> Self {
        let mock = Arc::new(mock);
        let tools = TerminalTools::new(mock.clone(), config);
        Self {
            dispatcher: Dispatcher::new(tools),
            mock,
        }
    }

    /// Sends one message and returns its response, if any
    pub async fn send(&self, message: Value) -> Option<Value> {
        self.dispatcher.handle_line(&message.to_string()).await
    }

    /// Sends one request, expecting a response
    pub async fn request(&self, message: Value) -> Value {
        self.send(message).await.expect("request should produce a response")
    }

    /// Calls a tool with the given arguments
    pub async fn call_tool(&self, id: i64, name: &str, arguments: Value) -> Value {
        self.request(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments },
        }))
        .await
    }

    /// Runs the full stdin/stdout loop over `input` and returns every
    /// response line, parsed
    pub async fn session(&self, input: &str) -> Vec<Value> {
        self.session_bytes(input.as_bytes()).await
    }

    /// Like [`session`](Self::session), for raw input that may not be UTF-8
    pub async fn session_bytes(&self, input: &[u8]) -> Vec<Value> {
        let mut output = Vec::new();
        serve(&self.dispatcher, input, &mut output)
            .await
            .expect("serve should not fail on in-memory streams");

        String::from_utf8(output)
            .expect("output should be UTF-8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("each output line should be JSON"))
            .collect()
    }
}

/// Default configuration with millisecond delays so tests stay fast
pub fn fast_config() -> ServerConfig {
    ServerConfig {
        singleline_delay: Duration::from_millis(5),
        multiline_delay: Duration::from_millis(10),
        launch_retry_delay: Duration::from_millis(1),
        ..ServerConfig::default()
    }
}

/// Decodes the base64 PNG of a capture result into an image
pub fn decode_capture(result: &Value) -> image::DynamicImage {
    let encoded = result["image"].as_str().expect("capture result should carry an image");
    let bytes = STANDARD.decode(encoded).expect("image should be valid base64");
    assert!(bytes.starts_with(&[0x89, 0x50, 0x4e, 0x47]), "image should be a PNG");
    image::load_from_memory(&bytes).expect("PNG should decode")
}
