//! JSON-RPC method dispatch.
//!
//! The [`Dispatcher`] owns the tool and resource registries and the
//! subscription manager. [`Dispatcher::handle`] turns one request into one
//! response and never fails: every problem becomes a JSON-RPC error object
//! carrying the request's `id`.

use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::mcp::context::{CallContext, ToolContext};
use crate::mcp::protocol::{
    methods, ErrorCode, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, OutgoingNotification,
    RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::registry::{ResourceDefinition, ResourceRegistry, ToolDefinition, ToolRegistry};
use crate::mcp::subscriptions::{
    spawn_watcher, NotificationOutlet, PublishReport, SubscriptionManager,
    DEFAULT_CHANNEL_CAPACITY,
};
use crate::mcp::types::{
    InitializeParams, InitializeResult, Resource, ServerCapabilities, ServerInfo, Tool,
    ToolCallParams, UriParams,
};

/// Client id used for subscriptions when the call context carries none.
pub const DEFAULT_CLIENT_ID: &str = "default-client";

/// Default watcher period.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(300);

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    /// Name reported in `serverInfo`.
    pub server_name: String,
    /// Instructions returned from `initialize`.
    pub instructions: String,
    /// Client id used when the call context has none.
    pub default_client_id: String,
    /// Period of subscription watchers.
    pub watch_interval: Duration,
    /// Per-subscriber buffer size.
    pub channel_capacity: usize,
    /// Upper bound on a single tool call.
    pub tool_timeout: Option<Duration>,
}

impl DispatcherOptions {
    /// Builds options from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            server_name: config.server.name.clone(),
            instructions: config.server.instructions.clone(),
            default_client_id: config.auth.default_client_id.clone(),
            watch_interval: config.subscriptions.watch_interval(),
            channel_capacity: config.subscriptions.channel_capacity,
            tool_timeout: config.tools.timeout(),
        }
    }
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            server_name: SERVER_NAME.to_string(),
            instructions: String::new(),
            default_client_id: DEFAULT_CLIENT_ID.to_string(),
            watch_interval: DEFAULT_WATCH_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            tool_timeout: None,
        }
    }
}

/// Routes JSON-RPC requests to registered tools and resources.
pub struct Dispatcher {
    options: DispatcherOptions,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    subscriptions: SubscriptionManager,
    outlet: RwLock<Option<NotificationOutlet>>,
}

impl Dispatcher {
    /// Creates a dispatcher with empty registries.
    #[must_use]
    pub fn new(options: DispatcherOptions) -> Self {
        let subscriptions = SubscriptionManager::new(options.channel_capacity);
        Self {
            options,
            tools: ToolRegistry::new(),
            resources: ResourceRegistry::new(),
            subscriptions,
            outlet: RwLock::new(None),
        }
    }

    /// Creates a dispatcher configured from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(DispatcherOptions::from_config(config))
    }

    /// Returns the dispatcher settings.
    #[must_use]
    pub const fn options(&self) -> &DispatcherOptions {
        &self.options
    }

    /// Returns the tool registry.
    #[must_use]
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Returns the resource registry.
    #[must_use]
    pub const fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Returns the subscription manager.
    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Attaches the channel that carries server-push notifications to the
    /// client. Watchers spawned afterwards forward into it.
    pub fn attach_outlet(&self, outlet: NotificationOutlet) {
        *self.outlet.write().unwrap_or_else(PoisonError::into_inner) = Some(outlet);
    }

    fn outlet(&self) -> Option<NotificationOutlet> {
        self.outlet
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(&self, notification: OutgoingNotification) {
        if let Some(outlet) = self.outlet() {
            if outlet.send(notification).is_err() {
                debug!("Notification outlet closed");
            }
        }
    }

    /// Registers a tool and announces the change.
    pub fn register_tool(&self, definition: ToolDefinition) {
        debug!(tool = %definition.name, "Registering tool");
        self.tools.register(definition);
        self.emit(OutgoingNotification::tools_list_changed());
    }

    /// Removes a tool, announcing the change if it existed.
    pub fn remove_tool(&self, name: &str) -> bool {
        let removed = self.tools.remove(name).is_some();
        if removed {
            self.emit(OutgoingNotification::tools_list_changed());
        }
        removed
    }

    /// Registers a resource and announces the change.
    pub fn register_resource(&self, definition: ResourceDefinition) {
        debug!(uri = %definition.uri, "Registering resource");
        self.resources.register(definition);
        self.emit(OutgoingNotification::resources_list_changed());
    }

    /// Removes a resource, announcing the change if it existed.
    pub fn remove_resource(&self, uri: &str) -> bool {
        let removed = self.resources.remove(uri).is_some();
        if removed {
            self.emit(OutgoingNotification::resources_list_changed());
        }
        removed
    }

    /// Tells every subscriber of `uri` that the resource changed.
    pub fn notify_resource_updated(&self, uri: &str) -> PublishReport {
        let report = self
            .subscriptions
            .publish(uri, &OutgoingNotification::resource_updated(uri));
        debug!(
            uri,
            delivered = report.delivered,
            dropped = report.dropped,
            "Published resource update"
        );
        report
    }

    /// Closes every subscription and stops every watcher.
    pub fn shutdown(&self) {
        self.subscriptions.shutdown();
    }

    /// Handles a single request.
    ///
    /// The response always echoes `request.id` and carries exactly one of
    /// `result` or `error`.
    pub async fn handle(&self, ctx: &CallContext, request: JsonRpcRequest) -> JsonRpcResponse {
        let started = Instant::now();
        let id = request.id.clone();

        let method = match request.validate() {
            Ok(method) => method.to_string(),
            Err(error) => {
                debug!(id = %id, "Rejected malformed request");
                return JsonRpcResponse::failure(id, error);
            }
        };

        let outcome = self.route(ctx, &method, &id, request.params).await;

        debug!(
            method = %method,
            id = %id,
            elapsed_ms = started.elapsed().as_millis(),
            ok = outcome.is_ok(),
            "Handled request"
        );

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    async fn route(
        &self,
        ctx: &CallContext,
        method: &str,
        id: &RequestId,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcErrorData> {
        match method {
            methods::INITIALIZE => self.handle_initialize(params),
            methods::TOOLS_LIST => Ok(self.handle_tools_list()),
            methods::TOOLS_CALL => self.handle_tools_call(ctx, id, params).await,
            methods::RESOURCES_LIST => Ok(self.handle_resources_list()),
            methods::RESOURCES_READ => self.handle_resources_read(params).await,
            methods::RESOURCES_SUBSCRIBE => self.handle_resources_subscribe(ctx, params),
            methods::RESOURCES_UNSUBSCRIBE => self.handle_resources_unsubscribe(ctx, params),
            methods::PING => Ok(json!({ "status": "pong" })),
            other => Err(JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                format!("Method not found: {other}"),
            )),
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcErrorData> {
        let params: InitializeParams = match params {
            None | Some(Value::Null) => InitializeParams::default(),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                JsonRpcErrorData::invalid_params(format!("Invalid initialize params: {e}"))
            })?,
        };

        if !params.protocol_version.is_empty() && params.protocol_version != MCP_PROTOCOL_VERSION {
            warn!(
                requested = %params.protocol_version,
                supported = MCP_PROTOCOL_VERSION,
                "Client requested a different protocol version"
            );
        }
        if let Some(client) = &params.client_info {
            info!(client = %client.name, version = ?client.version, "Client initialising");
        }

        to_result(&InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION,
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo::named(&self.options.server_name),
            instructions: self.options.instructions.clone(),
        })
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self) -> Value {
        let tools: Vec<Tool> = self.tools.list().iter().map(|t| t.to_wire()).collect();
        json!({ "tools": tools })
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &self,
        ctx: &CallContext,
        id: &RequestId,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcErrorData> {
        let params: ToolCallParams = decode_params(params, "tool call")?;

        let Some(tool) = self.tools.get(&params.name) else {
            debug!(tool = %params.name, "Unknown tool");
            return Err(JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                "Tool not found",
            ));
        };

        let tool_ctx = ToolContext::new(ctx, id.clone(), params.arguments.unwrap_or_default());
        let call = tool.handler.call(tool_ctx);

        let bounded = async {
            match self.options.tool_timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                    warn!(tool = %tool.name, timeout = ?limit, "Tool call timed out");
                    JsonRpcErrorData::internal("Tool execution timed out")
                }),
                None => Ok(call.await),
            }
        };

        let outcome = tokio::select! {
            biased;

            () = ctx.cancellation().cancelled() => {
                debug!(tool = %tool.name, "Tool call cancelled");
                return Err(JsonRpcErrorData::internal("Request cancelled"));
            }

            outcome = bounded => outcome?,
        };

        outcome.map_err(|e| {
            warn!(tool = %tool.name, error = %e, "Tool call failed");
            JsonRpcErrorData::internal(e.to_string())
        })
    }

    /// Handles the resources/list request.
    fn handle_resources_list(&self) -> Value {
        let resources: Vec<Resource> =
            self.resources.list().iter().map(|r| r.to_wire()).collect();
        json!({ "resources": resources })
    }

    /// Handles the resources/read request.
    async fn handle_resources_read(&self, params: Option<Value>) -> Result<Value, JsonRpcErrorData> {
        let params: UriParams = decode_params(params, "resource read")?;

        let resource = self
            .resources
            .get(&params.uri)
            .ok_or_else(|| JsonRpcErrorData::invalid_params("Resource not found"))?;

        resource.handler.read(&params.uri).await.map_err(|e| {
            warn!(uri = %params.uri, error = %e, "Resource read failed");
            JsonRpcErrorData::internal(e.to_string())
        })
    }

    /// Handles the resources/subscribe request.
    fn handle_resources_subscribe(
        &self,
        ctx: &CallContext,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcErrorData> {
        let params: UriParams = decode_params(params, "subscribe")?;

        if !self.resources.contains(&params.uri) {
            return Err(JsonRpcErrorData::invalid_params("Resource not found"));
        }

        let client_id = self.client_id(ctx);
        let stream = self.subscriptions.subscribe(&params.uri, client_id);
        spawn_watcher(stream, self.options.watch_interval, self.outlet());

        info!(uri = %params.uri, client_id, "Client subscribed to resource");
        Ok(json!({ "status": "subscribed" }))
    }

    /// Handles the resources/unsubscribe request.
    fn handle_resources_unsubscribe(
        &self,
        ctx: &CallContext,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcErrorData> {
        let params: UriParams = decode_params(params, "unsubscribe")?;

        let client_id = self.client_id(ctx);
        if self.subscriptions.unsubscribe(&params.uri, client_id) {
            info!(uri = %params.uri, client_id, "Client unsubscribed from resource");
        }
        Ok(json!({ "status": "unsubscribed" }))
    }

    fn client_id<'a>(&'a self, ctx: &'a CallContext) -> &'a str {
        ctx.client_id()
            .unwrap_or(self.options.default_client_id.as_str())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherOptions::default())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.tools)
            .field("resources", &self.resources)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

/// Decodes required method params.
fn decode_params<T: DeserializeOwned>(
    params: Option<Value>,
    what: &str,
) -> Result<T, JsonRpcErrorData> {
    let value = params
        .filter(|v| !v.is_null())
        .ok_or_else(|| JsonRpcErrorData::invalid_params(format!("Missing {what} params")))?;

    serde_json::from_value(value)
        .map_err(|e| JsonRpcErrorData::invalid_params(format!("Invalid {what} params: {e}")))
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcErrorData> {
    serde_json::to_value(value).map_err(|e| {
        error!(error = %e, "Failed to serialise result");
        JsonRpcErrorData::internal("Internal error: failed to serialise result")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::mcp::types::ToolCallResult;
    use tokio::sync::mpsc;

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest::new(id, method, params)
    }

    fn echo_tool() -> ToolDefinition {
        ToolDefinition::new(
            "echo",
            "Echoes its arguments",
            json!({ "type": "object" }),
            |ctx: ToolContext| async move {
                let text = Value::Object(ctx.parameters).to_string();
                serde_json::to_value(ToolCallResult::text(text))
                    .map_err(|e| ToolError::Failed(e.to_string()))
            },
        )
    }

    fn plain_resource(uri: &str) -> ResourceDefinition {
        ResourceDefinition::new(uri, "Plain", "", "text/plain", |uri: String| async move {
            Ok::<_, ToolError>(json!({ "contents": [{ "uri": uri, "text": "hello" }] }))
        })
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let dispatcher = Dispatcher::default();
        let response = dispatcher
            .handle(&CallContext::new(), request(1, "ping", None))
            .await;
        assert_eq!(response.result(), Some(&json!({ "status": "pong" })));
    }

    #[tokio::test]
    async fn initialize_reports_configured_name() {
        let dispatcher = Dispatcher::new(DispatcherOptions {
            server_name: "classroom".to_string(),
            instructions: "hi".to_string(),
            ..DispatcherOptions::default()
        });
        let response = dispatcher
            .handle(&CallContext::new(), request(1, "initialize", None))
            .await;

        let result = response.result().unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "classroom");
        assert_eq!(result["instructions"], "hi");
        assert_eq!(result["capabilities"]["resources"]["subscribe"], true);
    }

    #[tokio::test]
    async fn initialize_rejects_mistyped_params() {
        let dispatcher = Dispatcher::default();
        let response = dispatcher
            .handle(
                &CallContext::new(),
                request(1, "initialize", Some(json!({ "protocolVersion": 1 }))),
            )
            .await;
        assert_eq!(response.error().unwrap().code, ErrorCode::InvalidParams.code());
    }

    #[tokio::test]
    async fn tools_call_passes_arguments() {
        let dispatcher = Dispatcher::default();
        dispatcher.register_tool(echo_tool());

        let response = dispatcher
            .handle(
                &CallContext::new(),
                request(
                    1,
                    "tools/call",
                    Some(json!({ "name": "echo", "arguments": { "x": 1 } })),
                ),
            )
            .await;

        let result = response.result().unwrap();
        assert_eq!(result["content"][0]["text"], r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn tools_call_without_params_is_invalid() {
        let dispatcher = Dispatcher::default();
        let response = dispatcher
            .handle(&CallContext::new(), request(1, "tools/call", None))
            .await;
        assert_eq!(response.error().unwrap().code, ErrorCode::InvalidParams.code());
    }

    #[tokio::test(start_paused = true)]
    async fn tool_timeout_is_internal_error() {
        let dispatcher = Dispatcher::new(DispatcherOptions {
            tool_timeout: Some(Duration::from_secs(1)),
            ..DispatcherOptions::default()
        });
        dispatcher.register_tool(ToolDefinition::new(
            "slow",
            "",
            json!({}),
            |_ctx: ToolContext| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, ToolError>(json!({}))
            },
        ));

        let response = dispatcher
            .handle(
                &CallContext::new(),
                request(1, "tools/call", Some(json!({ "name": "slow" }))),
            )
            .await;

        let error = response.error().unwrap();
        assert_eq!(error.code, ErrorCode::InternalError.code());
        assert_eq!(error.message, "Tool execution timed out");
    }

    #[tokio::test]
    async fn cancelled_context_aborts_tool() {
        let dispatcher = Dispatcher::default();
        dispatcher.register_tool(ToolDefinition::new(
            "forever",
            "",
            json!({}),
            |_ctx: ToolContext| async {
                std::future::pending::<()>().await;
                Ok::<_, ToolError>(json!({}))
            },
        ));

        let ctx = CallContext::new();
        ctx.cancellation().cancel();
        let response = dispatcher
            .handle(&ctx, request(1, "tools/call", Some(json!({ "name": "forever" }))))
            .await;

        assert_eq!(response.error().unwrap().message, "Request cancelled");
    }

    #[tokio::test]
    async fn registration_emits_list_changed() {
        let dispatcher = Dispatcher::default();
        let (outlet, mut outbound) = mpsc::unbounded_channel();
        dispatcher.attach_outlet(outlet);

        dispatcher.register_tool(echo_tool());
        dispatcher.register_resource(plain_resource("a://b"));
        assert!(dispatcher.remove_tool("echo"));
        assert!(!dispatcher.remove_tool("echo"));

        let sent: Vec<String> = std::iter::from_fn(|| outbound.try_recv().ok())
            .map(|n| n.method)
            .collect();
        assert_eq!(
            sent,
            [
                methods::NOTIFY_TOOLS_LIST_CHANGED,
                methods::NOTIFY_RESOURCES_LIST_CHANGED,
                methods::NOTIFY_TOOLS_LIST_CHANGED,
            ]
        );
    }

    #[tokio::test]
    async fn subscribe_uses_default_client_id() {
        let dispatcher = Dispatcher::default();
        dispatcher.register_resource(plain_resource("a://b"));

        let response = dispatcher
            .handle(
                &CallContext::new(),
                request(1, "resources/subscribe", Some(json!({ "uri": "a://b" }))),
            )
            .await;

        assert_eq!(response.result(), Some(&json!({ "status": "subscribed" })));
        assert_eq!(
            dispatcher.subscriptions().list_subscribers("a://b"),
            [DEFAULT_CLIENT_ID]
        );
        dispatcher.shutdown();
        assert!(!dispatcher.subscriptions().has_subscribers("a://b"));
    }

    #[tokio::test]
    async fn published_updates_reach_the_outlet() {
        let dispatcher = Dispatcher::default();
        let (outlet, mut outbound) = mpsc::unbounded_channel();
        dispatcher.register_resource(plain_resource("a://b"));
        dispatcher.attach_outlet(outlet);

        let ctx = CallContext::new().with_client_id("desk");
        dispatcher
            .handle(&ctx, request(1, "resources/subscribe", Some(json!({ "uri": "a://b" }))))
            .await;

        let report = dispatcher.notify_resource_updated("a://b");
        assert_eq!(report.delivered, 1);

        let notification = outbound.recv().await.unwrap();
        assert_eq!(notification.method, methods::NOTIFY_RESOURCE_UPDATED);
        assert_eq!(notification.params, Some(json!({ "uri": "a://b" })));
    }
}
