//! JSON-RPC Server Integration Tests
//!
//! Exercises the dispatcher end-to-end with `MockAutomation`, checking the
//! exact response envelopes a host process sees.
//!
//! # Running Tests
//!
//! ```powershell
//! cargo test --test rpc_integration_tests
//! ```

mod common;

use std::time::Duration;

use common::rpc_harness::{RpcTestContext, decode_capture, fast_config};
use image::GenericImageView;
use pwsh_mcp::{
    automation::{
        MockAutomation,
        mock::{MOCK_TERMINAL_BOUNDS, MockOperation},
    },
    config::ServerConfig,
    error::AutomationError,
    model::WindowBounds,
};
use serde_json::{Value, json};

// ============================================================================
// Envelope handling
// ============================================================================

/// The canonical clipboard scenario returns the raw string as the result
#[tokio::test]
async fn test_get_clipboard_hello() {
    let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_clipboard("hello"));

    let response = ctx
        .request(json!({
            "id": 1,
            "method": "tools/call",
            "params": { "name": "get_clipboard", "arguments": {} },
        }))
        .await;

    assert_eq!(response, json!({ "jsonrpc": "2.0", "id": 1, "result": "hello" }));
}

/// String and null ids are echoed verbatim
#[tokio::test]
async fn test_ids_echoed_verbatim() {
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx.request(json!({ "id": "req-42", "method": "ping" })).await;
    assert_eq!(response["id"], "req-42");

    let response = ctx.request(json!({ "id": null, "method": "ping" })).await;
    assert!(response.get("id").is_some());
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["result"], json!({}));
}

/// Unknown tool names are reported with the request id preserved
#[tokio::test]
async fn test_unknown_tool_preserves_id() {
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx.call_tool(99, "format_disk", json!({})).await;

    assert_eq!(response["id"], 99);
    assert!(response.get("result").is_none());
    assert_eq!(response["error"]["code"], -32601);
    assert!(response["error"]["message"].as_str().unwrap().contains("format_disk"));
    assert_eq!(response["error"]["data"]["kind"], "unknown_tool");
}

/// A malformed line is answered with a parse error and the loop keeps going
#[tokio::test]
async fn test_malformed_json_then_valid_request() {
    let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_clipboard("still here"));

    let input = concat!(
        "{\"id\": 1, \"method\": \n",
        r#"{"id":2,"method":"tools/call","params":{"name":"get_clipboard","arguments":{}}}"#,
        "\n",
    );
    let responses = ctx.session(input).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(responses[1]["result"], "still here");
}

/// Bytes that are not UTF-8 get a parse error and the next request is served
#[tokio::test]
async fn test_invalid_utf8_then_valid_request() {
    let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_clipboard("still here"));

    let mut input = vec![0xff, 0xfe, b'{', b'}', b'\n'];
    input.extend_from_slice(
        br#"{"id":2,"method":"tools/call","params":{"name":"get_clipboard","arguments":{}}}"#,
    );
    input.push(b'\n');
    let responses = ctx.session_bytes(&input).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[0]["error"]["data"]["kind"], "parse_error");
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(responses[1]["result"], "still here");
}

/// Valid JSON that is not a request object is rejected without ending the loop
#[tokio::test]
async fn test_non_object_lines_then_valid_requests() {
    let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_clipboard("x"));

    let input = concat!(
        "[1, 2, 3]\n",
        r#"{"id":1,"method":"ping"}"#,
        "\n",
        "42\n",
        r#"{"id":2,"method":"tools/call","params":{"name":"get_clipboard"}}"#,
        "\n",
        "\"just a string\"\n",
        "null\n",
        r#"{"id":3,"method":"ping"}"#,
        "\n",
    );
    let responses = ctx.session(input).await;

    assert_eq!(responses.len(), 7);
    for index in [0, 2, 4, 5] {
        assert_eq!(responses[index]["id"], Value::Null);
        assert_eq!(responses[index]["error"]["code"], -32600);
    }
    assert_eq!(responses[1]["id"], 1);
    assert_eq!(responses[1]["result"], json!({}));
    assert_eq!(responses[3]["id"], 2);
    assert_eq!(responses[3]["result"], "x");
    assert_eq!(responses[6]["id"], 3);
    assert_eq!(responses[6]["result"], json!({}));
}

/// Windows line endings are accepted
#[tokio::test]
async fn test_crlf_line_endings() {
    let ctx = RpcTestContext::new_with_mock();

    let responses = ctx
        .session("{\"id\":1,\"method\":\"ping\"}\r\n{\"id\":2,\"method\":\"ping\"}\r\n")
        .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[1]["id"], 2);
}

/// Notifications and blank lines produce no output
#[tokio::test]
async fn test_notifications_are_silent() {
    let ctx = RpcTestContext::new_with_mock();

    let input = concat!(
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        "\n",
        "   \n",
        r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"get_clipboard"}}"#,
        "\n",
    );

    assert!(ctx.session(input).await.is_empty());
}

/// Responses come back in request order, one line each
#[tokio::test]
async fn test_session_handles_requests_in_order() {
    let ctx = RpcTestContext::new_with_mock();

    let input = (1..=5)
        .map(|id| json!({ "jsonrpc": "2.0", "id": id, "method": "ping" }).to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let responses = ctx.session(&input).await;

    let ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test]
async fn test_initialize_handshake() {
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx
        .request(json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "0" },
            },
        }))
        .await;

    let result = &response["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "pwsh-mcp");
    assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_tools_list_has_three_tools() {
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx.request(json!({ "id": 1, "method": "tools/list" })).await;
    let tools = response["result"]["tools"].as_array().unwrap();

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["execute_pwsh_script", "get_clipboard", "capture_pwsh_response"]);

    let execute = &tools[0];
    assert_eq!(execute["inputSchema"]["type"], "object");
    assert!(execute["inputSchema"]["properties"]["script"].is_object());
    assert_eq!(execute["inputSchema"]["required"], json!(["script"]));
    assert!(tools[2]["inputSchema"]["properties"]["region"].is_object());
}

// ============================================================================
// execute_pwsh_script
// ============================================================================

#[tokio::test]
async fn test_execute_pastes_and_reports_status() {
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx
        .call_tool(
            5,
            "execute_pwsh_script",
            json!({ "script": "Get-ChildItem\nGet-Date", "timeout": 12 }),
        )
        .await;

    let result = &response["result"];
    assert_eq!(result["success"], true);
    assert_eq!(result["lines_count"], 2);
    assert_eq!(result["is_multiline"], true);
    assert_eq!(result["script_type"], "multi-line script");
    assert_eq!(result["timeout_used"], 12.0);
    assert_eq!(result["waited_ms"], 10);
    assert_eq!(ctx.mock.submitted(), vec!["Get-ChildItem\nGet-Date"]);
}

/// The clipboard holds the script after execution
#[tokio::test]
async fn test_execute_leaves_script_on_clipboard() {
    let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_clipboard("old"));

    ctx.call_tool(1, "execute_pwsh_script", json!({ "script": "whoami" })).await;
    let response = ctx.call_tool(2, "get_clipboard", json!({})).await;

    assert_eq!(response["result"], "whoami");
}

#[tokio::test]
async fn test_execute_invalid_arguments() {
    let ctx = RpcTestContext::new_with_mock();

    for (id, arguments) in [
        json!({}),
        json!({ "script": "" }),
        json!({ "script": " \t\n" }),
        json!({ "script": "ls", "timeout": 0 }),
        json!({ "script": "ls", "timeout": -5 }),
        json!({ "script": "ls", "timeout": 300.5 }),
        json!({ "script": "ls", "timeout": "10" }),
        json!({ "script": 42 }),
    ]
    .into_iter()
    .enumerate()
    {
        let response = ctx.call_tool(id as i64, "execute_pwsh_script", arguments.clone()).await;
        assert_eq!(response["error"]["code"], -32602, "arguments: {arguments}");
        assert_eq!(response["id"], id as i64);
    }

    assert!(ctx.mock.submitted().is_empty());
}

/// The timeout upper bound is inclusive
#[tokio::test]
async fn test_execute_max_timeout_accepted() {
    let ctx = RpcTestContext::new_with_mock();
    let response = ctx
        .call_tool(1, "execute_pwsh_script", json!({ "script": "ls", "timeout": 300 }))
        .await;
    assert_eq!(response["result"]["timeout_used"], 300.0);
}

#[tokio::test]
async fn test_execute_window_not_found_without_launch() {
    let config = ServerConfig {
        launch_terminal: false,
        ..fast_config()
    };
    let ctx = RpcTestContext::new_with_config(MockAutomation::new().without_window(), config);

    let response = ctx.call_tool(3, "execute_pwsh_script", json!({ "script": "ls" })).await;

    assert_eq!(response["error"]["code"], -32001);
    assert_eq!(response["error"]["data"]["kind"], "window_not_found");
    assert!(response["error"]["data"]["hint"].as_str().unwrap().contains("PWSH_MCP_WINDOW_TITLES"));
    assert_eq!(ctx.mock.launch_calls(), 0);
    assert!(ctx.mock.submitted().is_empty());
}

#[tokio::test]
async fn test_execute_launches_terminal_when_missing() {
    let ctx = RpcTestContext::new_with_configured_mock(
        MockAutomation::new().without_window().with_window_on_launch(),
    );

    let response = ctx.call_tool(4, "execute_pwsh_script", json!({ "script": "ls" })).await;

    assert_eq!(response["result"]["success"], true);
    assert_eq!(ctx.mock.launch_calls(), 1);
    assert_eq!(ctx.mock.submitted(), vec!["ls"]);
}

#[tokio::test]
async fn test_execute_input_failure() {
    let ctx = RpcTestContext::new_with_configured_mock(
        MockAutomation::new()
            .with_error(MockOperation::PasteAndSubmit, AutomationError::input("desktop locked")),
    );

    let response = ctx.call_tool(6, "execute_pwsh_script", json!({ "script": "ls" })).await;

    assert_eq!(response["error"]["code"], -32004);
    assert!(response["error"]["message"].as_str().unwrap().contains("desktop locked"));
}

#[tokio::test]
async fn test_operation_timeout_error_code() {
    let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_error(
        MockOperation::Focus,
        AutomationError::OperationTimeout {
            operation: "focus_terminal_window".to_string(),
            duration_ms: 10_000,
        },
    ));

    let response = ctx.call_tool(8, "capture_pwsh_response", json!({})).await;
    assert_eq!(response["error"]["code"], -32005);
    assert_eq!(response["error"]["data"]["kind"], "operation_timeout");
}

// ============================================================================
// get_clipboard
// ============================================================================

#[tokio::test]
async fn test_get_clipboard_non_text() {
    let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_non_text_clipboard());

    let response = ctx.call_tool(1, "get_clipboard", json!({})).await;

    assert_eq!(response["error"]["code"], -32002);
    assert_eq!(response["error"]["data"]["kind"], "clipboard_error");
}

#[tokio::test]
async fn test_get_clipboard_unicode_verbatim() {
    let text = "Write-Host 'héllo wörld ✓'\r\n\tnext";
    let ctx = RpcTestContext::new_with_configured_mock(MockAutomation::new().with_clipboard(text));

    let response = ctx.call_tool(1, "get_clipboard", json!({})).await;
    assert_eq!(response["result"], text);
}

// ============================================================================
// capture_pwsh_response
// ============================================================================

#[tokio::test]
async fn test_capture_default_excludes_titlebar() {
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx.call_tool(1, "capture_pwsh_response", json!({})).await;
    let result = &response["result"];

    assert_eq!(result["success"], true);
    assert_eq!(result["mime_type"], "image/png");
    assert_eq!(result["exclude_titlebar"], true);

    let image = decode_capture(result);
    assert_eq!(image.dimensions(), (MOCK_TERMINAL_BOUNDS.width, MOCK_TERMINAL_BOUNDS.height - 35));

    // Top-left pixel comes from just below the title bar
    let px = image.to_rgba8().get_pixel(0, 0).0;
    assert_eq!(px[0], (MOCK_TERMINAL_BOUNDS.left % 256) as u8);
    assert_eq!(px[1], ((MOCK_TERMINAL_BOUNDS.top + 35) % 256) as u8);
}

#[tokio::test]
async fn test_capture_region_relative_to_client_area() {
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx
        .call_tool(
            1,
            "capture_pwsh_response",
            json!({ "region": { "x": 10, "y": 20, "width": 64, "height": 32 } }),
        )
        .await;

    let image = decode_capture(&response["result"]);
    assert_eq!(image.dimensions(), (64, 32));

    let px = image.to_rgba8().get_pixel(0, 0).0;
    assert_eq!(px[0], ((MOCK_TERMINAL_BOUNDS.left + 10) % 256) as u8);
    assert_eq!(px[1], ((MOCK_TERMINAL_BOUNDS.top + 35 + 20) % 256) as u8);
}

#[tokio::test]
async fn test_capture_region_out_of_bounds() {
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx
        .call_tool(
            2,
            "capture_pwsh_response",
            json!({ "region": { "x": 1000, "y": 0, "width": 100, "height": 100 } }),
        )
        .await;

    assert_eq!(response["id"], 2);
    assert_eq!(response["error"]["code"], -32003);
    assert_eq!(response["error"]["data"]["kind"], "capture_error");
}

/// A window hanging off the screen edge cannot be captured
#[tokio::test]
async fn test_capture_window_off_screen() {
    let ctx = RpcTestContext::new_with_configured_mock(
        MockAutomation::new()
            .without_window()
            .with_window("Windows PowerShell", WindowBounds::new(1800, 900, 400, 400)),
    );

    let response = ctx.call_tool(1, "capture_pwsh_response", json!({})).await;
    assert_eq!(response["error"]["code"], -32003);
}

#[tokio::test]
async fn test_capture_save_path_gets_png_extension() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("captures").join("after-ls");
    let ctx = RpcTestContext::new_with_mock();

    let response = ctx
        .call_tool(
            1,
            "capture_pwsh_response",
            json!({ "save_path": target.display().to_string(), "exclude_titlebar": false }),
        )
        .await;

    let result = &response["result"];
    let saved = std::path::PathBuf::from(result["saved_to"].as_str().unwrap());
    assert_eq!(saved.extension().unwrap(), "png");
    assert_eq!(saved, target.with_extension("png"));

    let on_disk = std::fs::read(&saved).unwrap();
    assert_eq!(result["file_size_bytes"], on_disk.len() as u64);
    let image = image::load_from_memory(&on_disk).unwrap();
    assert_eq!(image.dimensions(), (MOCK_TERMINAL_BOUNDS.width, MOCK_TERMINAL_BOUNDS.height));
}

#[tokio::test]
async fn test_capture_without_save_path_writes_nothing() {
    let ctx = RpcTestContext::new_with_mock();
    let response = ctx.call_tool(1, "capture_pwsh_response", json!({})).await;

    assert!(response["result"].get("saved_to").is_none());
    assert!(response["result"].get("file_size_bytes").is_none());
}

/// A slow backend still answers; requests are processed one at a time
#[tokio::test]
async fn test_slow_backend_still_answers() {
    let ctx = RpcTestContext::new_with_configured_mock(
        MockAutomation::new()
            .with_clipboard("slow")
            .with_delay(Duration::from_millis(20)),
    );

    let input = concat!(
        r#"{"id":1,"method":"tools/call","params":{"name":"get_clipboard"}}"#,
        "\n",
        r#"{"id":2,"method":"tools/call","params":{"name":"get_clipboard"}}"#,
        "\n",
    );
    let responses = ctx.session(input).await;

    assert_eq!(responses.len(), 2);
    assert!(responses.iter().all(|r| r["result"] == "slow"));
}
