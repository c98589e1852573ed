//! Tool and resource registries.
//!
//! Both registries are concurrent maps from a key (tool name or resource
//! URI) to an immutable, shared definition. Writes overwrite, removal is
//! idempotent and listing returns a snapshot in registration order. The lock
//! is only held while touching the map; handlers are always invoked on a
//! cloned `Arc` after the guard is dropped.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ToolError;
use crate::mcp::context::ToolContext;
use crate::mcp::types::{Resource, Tool};

/// An invocable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool. The returned value is embedded verbatim as the
    /// `result` of the `tools/call` response.
    async fn call(&self, ctx: ToolContext) -> Result<Value, ToolError>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(ToolContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn call(&self, ctx: ToolContext) -> Result<Value, ToolError> {
        (self)(ctx).await
    }
}

/// A readable resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Produces the resource content. The returned value is embedded
    /// verbatim as the `result` of the `resources/read` response.
    async fn read(&self, uri: &str) -> Result<Value, ToolError>;
}

#[async_trait]
impl<F, Fut> ResourceHandler for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn read(&self, uri: &str) -> Result<Value, ToolError> {
        (self)(uri.to_string()).await
    }
}

/// A registered tool.
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the arguments; opaque to the dispatcher.
    pub input_schema: Value,
    /// The handler.
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    /// Creates a tool definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(handler),
        }
    }

    /// Projects the definition onto its `tools/list` wire form.
    #[must_use]
    pub fn to_wire(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A registered resource.
pub struct ResourceDefinition {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// The handler.
    pub handler: Arc<dyn ResourceHandler>,
}

impl ResourceDefinition {
    /// Creates a resource definition.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
        handler: impl ResourceHandler + 'static,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: description.into(),
            mime_type: mime_type.into(),
            handler: Arc::new(handler),
        }
    }

    /// Projects the definition onto its `resources/list` wire form.
    #[must_use]
    pub fn to_wire(&self) -> Resource {
        Resource {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Something stored in a [`Registry`] under its own key.
pub trait Registered {
    /// The registry key.
    fn key(&self) -> &str;
}

impl Registered for ToolDefinition {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Registered for ResourceDefinition {
    fn key(&self) -> &str {
        &self.uri
    }
}

/// A concurrent, insertion-ordered registry of shared definitions.
pub struct Registry<T> {
    entries: RwLock<IndexMap<String, Arc<T>>>,
}

/// Registry of tools keyed by name.
pub type ToolRegistry = Registry<ToolDefinition>;

/// Registry of resources keyed by URI.
pub type ResourceRegistry = Registry<ResourceDefinition>;

impl<T: Registered> Registry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Registers a definition, replacing any existing one with the same key.
    ///
    /// Returns the replaced definition. A replaced entry keeps its original
    /// position in [`Registry::list`].
    pub fn register(&self, definition: T) -> Option<Arc<T>> {
        let key = definition.key().to_string();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(definition))
    }

    /// Looks up a definition by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns a snapshot of all definitions in registration order.
    ///
    /// Later registry changes do not affect the returned vector.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Removes a definition. Removing an absent key is a no-op.
    pub fn remove(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(key)
    }

    /// Returns `true` if a definition is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Registered> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_list().entries(entries.keys()).finish()
    }
}
