//! Error types for edu-catalog-mcp.
//!
//! Protocol-level failures are not Rust errors: the dispatcher turns them
//! into JSON-RPC error objects. The types here cover configuration loading,
//! catalogue lookups and tool handler failures.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by catalogue collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No material exists with the given identifier.
    #[error("material not found: {0}")]
    NotFound(String),

    /// The identifier is not a valid material id.
    #[error("invalid material_id format: {0}")]
    InvalidId(String),
}

/// Errors returned by tool and resource handlers.
///
/// The `Display` text becomes the message of the `-32603` error object sent
/// back to the client, so it must stay free of internal details.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The arguments did not match the tool's input schema.
    #[error("invalid parameters: {0}")]
    InvalidArguments(String),

    /// A catalogue lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Any other handler failure.
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// Creates an invalid-arguments error from a serde decoding failure.
    #[must_use]
    pub fn from_decode(err: &serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}
