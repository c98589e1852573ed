//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the core message types used in the Model Context Protocol.
//! All messages follow the JSON-RPC 2.0 specification with MCP-specific extensions.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`, which may be `null`)
//! - **Response**: A reply to a request carrying exactly one of `result` or `error`
//! - **Notification**: A one-way message (no `id`, no response expected)
//!
//! Envelope validation (version literal, method presence) is left to the
//! dispatcher so that every well-formed request object gets a response that
//! echoes its `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// The only JSON-RPC version accepted.
pub const JSONRPC_VERSION: &str = "2.0";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "edu-catalog-mcp";

/// Method names understood by the server.
pub mod methods {
    /// Capability negotiation.
    pub const INITIALIZE: &str = "initialize";
    /// Tool discovery.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Tool invocation.
    pub const TOOLS_CALL: &str = "tools/call";
    /// Resource discovery.
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Resource retrieval.
    pub const RESOURCES_READ: &str = "resources/read";
    /// Resource update subscription.
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    /// Resource update unsubscription.
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";
    /// Liveness probe.
    pub const PING: &str = "ping";

    /// Client finished initialisation.
    pub const NOTIFY_INITIALIZED: &str = "notifications/initialized";
    /// Client gave up on an in-flight request.
    pub const NOTIFY_CANCELLED: &str = "notifications/cancelled";
    /// A subscribed resource changed.
    pub const NOTIFY_RESOURCE_UPDATED: &str = "notifications/resources/updated";
    /// The set of registered resources changed.
    pub const NOTIFY_RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    /// The set of registered tools changed.
    pub const NOTIFY_TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
}

/// A JSON-RPC 2.0 request ID.
///
/// Strings, numbers and `null` are all echoed back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(serde_json::Number),
    /// String request ID.
    String(String),
    /// Explicit `null` ID.
    #[default]
    Null,
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for RequestId {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => Ok(()),
        }
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Fields are decoded leniently: a missing `jsonrpc` or `method` is caught
/// by [`JsonRpcRequest::validate`] rather than by deserialisation, so the
/// error response can still echo the request's `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    #[serde(default)]
    pub jsonrpc: String,

    /// Request identifier, echoed in the response.
    #[serde(default)]
    pub id: RequestId,

    /// The method to invoke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Optional parameters for the method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a well-formed request.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: Some(method.into()),
            params,
        }
    }

    /// Validates the envelope and returns the method name.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRequest` error object when the version literal is
    /// not "2.0" or the method is absent or empty.
    pub fn validate(&self) -> Result<&str, JsonRpcErrorData> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(JsonRpcErrorData::with_message(
                ErrorCode::InvalidRequest,
                "jsonrpc field must be \"2.0\"",
            ));
        }
        match self.method.as_deref() {
            Some(method) if !method.is_empty() => Ok(method),
            _ => Err(JsonRpcErrorData::with_message(
                ErrorCode::InvalidRequest,
                "method field is required",
            )),
        }
    }
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and do not expect a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Should be "2.0".
    #[serde(default)]
    pub jsonrpc: String,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// An outgoing JSON-RPC 2.0 notification (server to client).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Creates a `notifications/resources/updated` notification.
    #[must_use]
    pub fn resource_updated(uri: &str) -> Self {
        Self::new(
            methods::NOTIFY_RESOURCE_UPDATED,
            Some(serde_json::json!({ "uri": uri })),
        )
    }

    /// Creates a `notifications/tools/list_changed` notification.
    #[must_use]
    pub fn tools_list_changed() -> Self {
        Self::new(methods::NOTIFY_TOOLS_LIST_CHANGED, None)
    }

    /// Creates a `notifications/resources/list_changed` notification.
    #[must_use]
    pub fn resources_list_changed() -> Self {
        Self::new(methods::NOTIFY_RESOURCES_LIST_CHANGED, None)
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Creates an invalid params error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidParams, message)
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, message)
    }
}

/// The mutually exclusive payload of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    /// Successful result.
    Result(Value),
    /// Error object.
    Error(JsonRpcErrorData),
}

/// A JSON-RPC 2.0 response.
///
/// The outcome is a single enum, so a response can never carry both a
/// `result` and an `error`, nor neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// Either `result` or `error`.
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: ResponseOutcome::Result(result),
        }
    }

    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn failure(id: RequestId, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: ResponseOutcome::Error(error),
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::failure(RequestId::Null, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: RequestId) -> Self {
        Self::failure(id, JsonRpcErrorData::from_code(ErrorCode::InvalidRequest))
    }

    /// Returns the result, if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(value) => Some(value),
            ResponseOutcome::Error(_) => None,
        }
    }

    /// Returns the error object, if this is an error response.
    #[must_use]
    pub const fn error(&self) -> Option<&JsonRpcErrorData> {
        match &self.outcome {
            ResponseOutcome::Result(_) => None,
            ResponseOutcome::Error(error) => Some(error),
        }
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message, if present.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(req) => req.method.as_deref(),
            Self::Notification(notif) => Some(&notif.method),
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// Parses a JSON string into an incoming message.
///
/// # Errors
///
/// Returns a ready-to-send error response if the text is not JSON
/// (`-32700`) or not a request/notification object (`-32600`).
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcResponse> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcResponse::parse_error())?;

    let Some(obj) = value.as_object() else {
        return Err(JsonRpcResponse::invalid_request(RequestId::Null));
    };

    // Presence of "id" (even null) makes this a request
    if let Some(raw_id) = obj.get("id") {
        let recovered_id = RequestId::deserialize(raw_id).unwrap_or_default();
        let request: JsonRpcRequest = serde_json::from_value(value)
            .map_err(|_| JsonRpcResponse::invalid_request(recovered_id))?;
        Ok(IncomingMessage::Request(request))
    } else {
        let notification: JsonRpcNotification = serde_json::from_value(value)
            .map_err(|_| JsonRpcResponse::invalid_request(RequestId::Null))?;
        Ok(IncomingMessage::Notification(notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::from(1));
        assert_eq!(req.validate().unwrap(), "initialize");
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse_message(json).unwrap();
        assert_eq!(msg.id(), Some(&RequestId::from("abc-123")));
    }

    #[test]
    fn parse_null_id_is_a_request() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "ping"}"#;
        let msg = parse_message(json).unwrap();
        assert_eq!(msg.id(), Some(&RequestId::Null));
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_message("not valid json").unwrap_err();
        assert_eq!(err.error().unwrap().code, ErrorCode::ParseError.code());
        assert_eq!(err.id, RequestId::Null);
    }

    #[test]
    fn parse_non_object() {
        let err = parse_message("[1, 2, 3]").unwrap_err();
        assert_eq!(err.error().unwrap().code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn mistyped_method_keeps_id() {
        let json = r#"{"jsonrpc": "2.0", "id": 9, "method": 42}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error().unwrap().code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, RequestId::from(9));
    }

    #[test]
    fn validate_rejects_wrong_version() {
        let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#;
        let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
            panic!("Expected Request");
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn validate_rejects_missing_method() {
        let json = r#"{"jsonrpc": "2.0", "id": 1}"#;
        let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
            panic!("Expected Request");
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(RequestId::from(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#);
    }

    #[test]
    fn serialise_error_response() {
        let response = JsonRpcResponse::failure(
            RequestId::from(2),
            JsonRpcErrorData::with_message(ErrorCode::MethodNotFound, "Tool not found"),
        );
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"Tool not found"}}"#
        );
    }

    #[test]
    fn serialise_null_id() {
        let response = JsonRpcResponse::success(RequestId::Null, serde_json::json!({}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""id":null"#));
    }

    #[test]
    fn error_data_round_trips_optional_data() {
        let error = JsonRpcErrorData::invalid_params("bad").with_data(serde_json::json!("x"));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["data"], "x");
    }

    #[test]
    fn notification_omits_absent_params() {
        let json = serde_json::to_string(&OutgoingNotification::tools_list_changed()).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","method":"notifications/tools/list_changed"}"#
        );
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::from(42)), "42");
        assert_eq!(format!("{}", RequestId::from("abc")), "abc");
        assert_eq!(format!("{}", RequestId::Null), "");
    }
}
