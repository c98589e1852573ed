//! edu-catalog-mcp: MCP server for an educational-content catalogue
//!
//! This library exposes a catalogue of teaching materials to AI assistants
//! through the Model Context Protocol.
//!
//! # Architecture
//!
//! The core is a JSON-RPC dispatcher with dynamic registries:
//!
//! - **Dispatcher**: Validates envelopes and routes MCP methods to handlers
//! - **Registries**: Concurrent tool and resource maps, editable at runtime
//! - **Subscriptions**: Bounded per-client channels for resource updates
//!
//! Domain logic sits behind narrow collaborator traits so storage and
//! authentication can be swapped without touching the protocol layer.
//!
//! # Modules
//!
//! - [`catalog`] — Material model, lookup and identity collaborators
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation
//! - [`resources`] — Default curriculum resources
//! - [`tools`] — Default catalogue tools

pub mod catalog;
pub mod config;
pub mod error;
pub mod mcp;
pub mod resources;
pub mod tools;
