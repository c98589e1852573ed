//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP specification for exposing the teaching
//! material catalogue as tools and resources to AI assistants. The server
//! communicates over stdio transport using JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          McpServer                           │
//! │                                                              │
//! │   ┌─────────────┐    ┌──────────────┐    ┌──────────────┐    │
//! │   │  Transport  │───▶│  Dispatcher  │───▶│ ToolRegistry │    │
//! │   │   (lines)   │    │ (method map) │    │ ResourceReg. │    │
//! │   └─────────────┘    └──────────────┘    └──────────────┘    │
//! │          ▲                  │                                │
//! │          │                  ▼                                │
//! │          │          ┌──────────────────────┐                 │
//! │          └──────────│ SubscriptionManager  │                 │
//! │      notifications  │ (bounded, per client)│                 │
//! │                     └──────────────────────┘                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod context;
pub mod dispatcher;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod subscriptions;
pub mod transport;
pub mod types;

pub use context::{CallContext, Identity, ToolContext};
pub use dispatcher::{Dispatcher, DispatcherOptions};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use registry::{
    ResourceDefinition, ResourceHandler, ResourceRegistry, ToolDefinition, ToolHandler,
    ToolRegistry,
};
pub use server::McpServer;
pub use subscriptions::SubscriptionManager;
pub use transport::StdioTransport;
