//! Integration tests for MCP protocol handling.
//!
//! These tests verify the JSON-RPC 2.0 protocol implementation, including
//! request/response handling, error responses, and the default catalogue.

use std::sync::Arc;

use serde_json::{json, Value};

use edu_catalog_mcp::catalog::{InMemoryCatalog, MaterialLookup};
use edu_catalog_mcp::mcp::context::CallContext;
use edu_catalog_mcp::mcp::dispatcher::Dispatcher;
use edu_catalog_mcp::mcp::protocol::{parse_message, IncomingMessage, JsonRpcRequest, RequestId};
use edu_catalog_mcp::{resources, tools};

fn catalogue_dispatcher() -> Dispatcher {
    let dispatcher = Dispatcher::default();
    let catalog: Arc<dyn MaterialLookup> = Arc::new(InMemoryCatalog::with_sample_data());
    tools::register_default_tools(&dispatcher, &catalog);
    resources::register_default_resources(&dispatcher);
    dispatcher
}

async fn call(dispatcher: &Dispatcher, method: &str, params: Value) -> Value {
    let request = JsonRpcRequest::new(1, method, Some(params));
    let response = dispatcher.handle(&CallContext::new(), request).await;
    serde_json::to_value(response).unwrap()
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method.as_deref(), Some("initialize"));
        assert_eq!(req.id, RequestId::from(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_tools_list_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": "list-2",
        "method": "tools/list",
        "params": {}
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method.as_deref(), Some("tools/list"));
        assert_eq!(req.id, RequestId::from("list-2"));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_invalid_json() {
    let err = parse_message("not valid json").unwrap_err();
    assert_eq!(err.error().map(|e| e.code), Some(-32700));
    assert_eq!(err.id, RequestId::Null);
}

#[test]
fn test_parse_non_object_is_invalid_request() {
    let err = parse_message("[1, 2, 3]").unwrap_err();
    assert_eq!(err.error().map(|e| e.code), Some(-32600));
}

#[tokio::test]
async fn test_missing_jsonrpc_version_is_rejected_by_dispatcher() {
    let json = r#"{
        "id": 1,
        "method": "ping"
    }"#;

    let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
        panic!("Expected Request");
    };
    let response = Dispatcher::default().handle(&CallContext::new(), req).await;
    assert_eq!(response.error().map(|e| e.code), Some(-32600));
    assert_eq!(response.id, RequestId::from(1));
}

// =============================================================================
// Catalogue Round Trips
// =============================================================================

#[tokio::test]
async fn test_initialize_reports_capabilities() {
    let dispatcher = catalogue_dispatcher();
    let response = call(
        &dispatcher,
        "initialize",
        json!({ "protocolVersion": "2024-11-05", "capabilities": {} }),
    )
    .await;

    let result = &response["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["capabilities"]["resources"]["subscribe"], true);
    assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
    assert_eq!(result["serverInfo"]["name"], "edu-catalog-mcp");
}

#[tokio::test]
async fn test_tools_list_includes_schemas() {
    let dispatcher = catalogue_dispatcher();
    let response = call(&dispatcher, "tools/list", json!({})).await;

    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 5);
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert!(tool["description"].as_str().is_some_and(|d| !d.is_empty()));
    }
}

#[tokio::test]
async fn test_search_then_detail() {
    let dispatcher = catalogue_dispatcher();

    let search = call(
        &dispatcher,
        "tools/call",
        json!({ "name": "search_teaching_materials", "arguments": { "query": "chemical" } }),
    )
    .await;
    let listing = search["result"]["content"][0]["text"].as_str().unwrap();
    let id = listing
        .split("(ID: ")
        .nth(1)
        .and_then(|rest| rest.split(')').next())
        .unwrap()
        .to_string();

    let detail = call(
        &dispatcher,
        "tools/call",
        json!({ "name": "get_material_detail", "arguments": { "material_id": id } }),
    )
    .await;
    let text = detail["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Title: Types of Chemical Reactions"));
    assert!(text.contains("Subject: chemistry"));
}

#[tokio::test]
async fn test_tool_failure_is_internal_error() {
    let dispatcher = catalogue_dispatcher();
    let response = call(
        &dispatcher,
        "tools/call",
        json!({ "name": "get_material_detail", "arguments": { "material_id": "bogus" } }),
    )
    .await;

    assert_eq!(response["error"]["code"], -32603);
    assert_eq!(response["error"]["message"], "invalid material_id format: bogus");
    assert!(response.get("result").is_none());
}

#[tokio::test]
async fn test_read_template_resource() {
    let dispatcher = catalogue_dispatcher();
    let response = call(
        &dispatcher,
        "resources/read",
        json!({ "uri": "template://lesson-plan/5e-model" }),
    )
    .await;

    let content = &response["result"]["contents"][0];
    assert_eq!(content["mimeType"], "application/json");
    let template: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
    assert_eq!(template["phases"].as_array().unwrap().len(), 5);
}
