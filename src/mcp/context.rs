//! Per-call context values.
//!
//! [`CallContext`] is supplied by the transport for every request and
//! carries caller identity, session and client identifiers and a
//! cancellation token. [`ToolContext`] is built fresh by the dispatcher for
//! every `tools/call` and handed to the tool handler.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ToolError;
use crate::mcp::protocol::RequestId;

/// Who is making a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    /// No credentials were presented or they did not resolve.
    #[default]
    Anonymous,
    /// An authenticated user.
    User(String),
}

impl Identity {
    /// Returns the user id, if authenticated.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    /// Returns `true` for anonymous callers.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::User(id) => f.write_str(id),
        }
    }
}

/// Request-scoped values supplied by the transport.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    identity: Identity,
    session_id: Option<String>,
    client_id: Option<String>,
    cancellation: CancellationToken,
}

impl CallContext {
    /// Creates an anonymous context with a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the caller identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the session id.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the client id used to key subscriptions.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the caller identity.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the session id, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the client id, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Context handed to a tool handler for one invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Caller identity.
    pub user: Identity,
    /// Session id, empty when the transport supplied none.
    pub session_id: String,
    /// ID of the `tools/call` request.
    pub request_id: RequestId,
    /// Wall-clock start of the invocation.
    pub start_time: DateTime<Utc>,
    /// Raw tool arguments.
    pub parameters: Map<String, Value>,
    started: Instant,
    cancellation: CancellationToken,
}

impl ToolContext {
    /// Creates a context for a call starting now.
    #[must_use]
    pub fn new(call: &CallContext, request_id: RequestId, parameters: Map<String, Value>) -> Self {
        Self {
            user: call.identity().clone(),
            session_id: call.session_id().unwrap_or_default().to_string(),
            request_id,
            start_time: Utc::now(),
            parameters,
            started: Instant::now(),
            cancellation: call.cancellation().clone(),
        }
    }

    /// Decodes the arguments into a typed parameter struct.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if the arguments do not match.
    pub fn arguments<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.parameters.clone()))
            .map_err(|e| ToolError::from_decode(&e))
    }

    /// Time elapsed since the call started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns the call's cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` once the caller has gone away.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Args {
        query: String,
        #[serde(default)]
        limit: Option<u32>,
    }

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn identity_accessors() {
        assert!(Identity::Anonymous.is_anonymous());
        assert_eq!(Identity::User("u1".into()).user_id(), Some("u1"));
        assert_eq!(Identity::Anonymous.to_string(), "anonymous");
    }

    #[test]
    fn call_context_builder() {
        let ctx = CallContext::new()
            .with_identity(Identity::User("teacher".into()))
            .with_session_id("s-1")
            .with_client_id("c-1");
        assert_eq!(ctx.identity().user_id(), Some("teacher"));
        assert_eq!(ctx.session_id(), Some("s-1"));
        assert_eq!(ctx.client_id(), Some("c-1"));
        assert!(!ctx.cancellation().is_cancelled());
    }

    #[test]
    fn tool_context_copies_call_values() {
        let call = CallContext::new()
            .with_identity(Identity::User("u".into()))
            .with_session_id("s");
        let ctx = ToolContext::new(&call, RequestId::from(3), Map::new());
        assert_eq!(ctx.user, Identity::User("u".into()));
        assert_eq!(ctx.session_id, "s");
        assert_eq!(ctx.request_id, RequestId::from(3));
    }

    #[test]
    fn tool_context_observes_cancellation() {
        let call = CallContext::new();
        let ctx = ToolContext::new(&call, RequestId::Null, Map::new());
        call.cancellation().cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn typed_arguments() {
        let call = CallContext::new();
        let ctx = ToolContext::new(&call, RequestId::Null, params(json!({"query": "fractions"})));
        let args: Args = ctx.arguments().unwrap();
        assert_eq!(args.query, "fractions");
        assert_eq!(args.limit, None);
    }

    #[test]
    fn typed_arguments_report_mismatch() {
        let call = CallContext::new();
        let ctx = ToolContext::new(&call, RequestId::Null, params(json!({"limit": 3})));
        let err = ctx.arguments::<Args>().err().unwrap();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
