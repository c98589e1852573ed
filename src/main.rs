//! edu-catalog-mcp: MCP server for an educational-content catalogue
//!
//! Exposes teaching material search, details, related materials, lesson
//! plans and curriculum resources to AI assistants over stdio.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use edu_catalog_mcp::catalog::{ApiKeyResolver, IdentityResolver, InMemoryCatalog, MaterialLookup};
use edu_catalog_mcp::config;
use edu_catalog_mcp::mcp::context::CallContext;
use edu_catalog_mcp::mcp::dispatcher::Dispatcher;
use edu_catalog_mcp::mcp::server::McpServer;
use edu_catalog_mcp::{resources, tools};

/// MCP server for an educational-content catalogue.
///
/// Provides search, detail and lesson plan tools plus curriculum resources
/// that AI assistants can read and subscribe to.
#[derive(Parser, Debug)]
#[command(name = "edu-catalog-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// API key identifying the caller (anonymous when absent)
    #[arg(long, env = "EDU_CATALOG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries protocol traffic.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the edu-catalog-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                    eprintln!("Create one based on config/example-config.json");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting edu-catalog-mcp server"
    );

    // Build the dispatcher with the default catalogue
    let dispatcher = Arc::new(Dispatcher::from_config(&cfg));
    let catalog: Arc<dyn MaterialLookup> = Arc::new(InMemoryCatalog::with_sample_data());
    tools::register_default_tools(&dispatcher, &catalog);
    resources::register_default_resources(&dispatcher);

    info!(
        tools = dispatcher.tools().len(),
        resources = dispatcher.resources().len(),
        "Catalogue registered"
    );

    // Resolve the caller once for the whole session
    let identity = ApiKeyResolver::from_config(&cfg.auth).resolve(args.api_key.as_deref());
    let session = CallContext::new()
        .with_identity(identity)
        .with_session_id(Uuid::new_v4().to_string())
        .with_client_id(cfg.auth.default_client_id.clone());

    info!(
        user = %session.identity(),
        session = session.session_id().unwrap_or_default(),
        "Session established"
    );

    let mut server = McpServer::new(dispatcher, session);

    info!("MCP server ready, waiting for client connection...");

    // Run the server
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(server.run());

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
