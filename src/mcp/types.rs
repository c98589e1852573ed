//! MCP payload types carried inside JSON-RPC `params` and `result`.
//!
//! These are the method-specific shapes: capability negotiation, tool and
//! resource listings, tool call results and resource read results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::protocol::SERVER_NAME;

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,

    /// Resource-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities { list_changed: true }),
            resources: Some(ResourceCapabilities {
                list_changed: true,
                subscribe: true,
            }),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Resource-specific capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceCapabilities {
    /// Whether the resource list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,

    /// Whether clients may subscribe to resource updates.
    pub subscribe: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Creates server info with the crate version and the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::named(SERVER_NAME)
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    #[serde(default)]
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
///
/// Every field is optional; only a type mismatch is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Result of the initialize request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version the server speaks.
    pub protocol_version: &'static str,
    /// Advertised capabilities.
    pub capabilities: ServerCapabilities,
    /// Server identity.
    pub server_info: ServerInfo,
    /// Usage instructions for the client.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instructions: String,
}

/// Wire projection of a registered tool, as returned by `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Wire projection of a registered resource, as returned by `resources/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the content.
    pub mime_type: String,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Option<serde_json::Map<String, Value>>,
}

/// Parameters carrying a single resource URI (`resources/read`,
/// `resources/subscribe`, `resources/unsubscribe`).
#[derive(Debug, Clone, Deserialize)]
pub struct UriParams {
    /// Target resource URI.
    pub uri: String,
}

/// Parameters of `notifications/cancelled`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledParams {
    /// ID of the request to cancel.
    pub request_id: crate::mcp::protocol::RequestId,
    /// Optional reason given by the client.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// One content block returned by `resources/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    /// URI of the content.
    pub uri: String,
    /// MIME type of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Textual content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64-encoded binary content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// Result of `resources/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReadResult {
    /// Content blocks.
    pub contents: Vec<ResourceContent>,
}

impl ResourceReadResult {
    /// Creates a result with a single text block.
    #[must_use]
    pub fn text(uri: impl Into<String>, mime_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            contents: vec![ResourceContent {
                uri: uri.into(),
                mime_type: Some(mime_type.into()),
                text: Some(text.into()),
                blob: None,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn capabilities_advertise_subscriptions() {
        let value = serde_json::to_value(ServerCapabilities::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "tools": { "listChanged": true },
                "resources": { "listChanged": true, "subscribe": true }
            })
        );
    }

    #[test]
    fn initialize_params_tolerate_missing_fields() {
        let params: InitializeParams = serde_json::from_value(json!({})).unwrap();
        assert!(params.protocol_version.is_empty());
        assert!(params.client_info.is_none());
    }

    #[test]
    fn initialize_params_reject_wrong_types() {
        let result: Result<InitializeParams, _> =
            serde_json::from_value(json!({ "protocolVersion": 7 }));
        assert!(result.is_err());
    }

    #[test]
    fn tool_call_params_require_name() {
        let result: Result<ToolCallParams, _> = serde_json::from_value(json!({ "arguments": {} }));
        assert!(result.is_err());
    }

    #[test]
    fn tool_call_result_serialisation() {
        let value = serde_json::to_value(ToolCallResult::text("hi")).unwrap();
        assert_eq!(value, json!({ "content": [{ "type": "text", "text": "hi" }] }));

        let value = serde_json::to_value(ToolCallResult::error("bad")).unwrap();
        assert_eq!(value["isError"], true);
    }

    #[test]
    fn resource_read_result_omits_blob() {
        let result = ResourceReadResult::text("a://b", "text/plain", "x");
        let value = serde_json::to_value(result).unwrap();
        assert_eq!(
            value,
            json!({ "contents": [{ "uri": "a://b", "mimeType": "text/plain", "text": "x" }] })
        );
    }
}
