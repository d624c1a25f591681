//! tablegraph CLI: serve a SQLite schema as a property graph.
//!
//! Usage:
//!   tablegraph serve <config.json>
//!   tablegraph inspect <config.json>

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tablegraph::{AdapterRegistry, Config, OpenStore, SchemaIntrospector, SqliteStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "tablegraph",
    version,
    about = "Serve a SQLite schema as vertex and edge collections"
)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the collections over MCP on stdio
    Serve {
        /// Path to the JSON config file
        config: PathBuf,
    },
    /// Print the collections derived from the schema and exit
    Inspect {
        /// Path to the JSON config file
        config: PathBuf,
    },
}

/// Logs go to stderr; stdout carries the MCP protocol.
fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_registry(config_path: &Path) -> Result<AdapterRegistry, String> {
    let config = Config::load(config_path).map_err(|e| e.to_string())?;
    tracing::info!(path = %config.path.display(), "opening database");
    let store = SqliteStore::open(&config.path)
        .map_err(|e| format!("Failed to open database: {}", e))?;
    SchemaIntrospector::new(Arc::new(store))
        .build_adapters()
        .map_err(|e| format!("Failed to build adapters: {}", e))
}

fn cmd_inspect(registry: &AdapterRegistry) -> i32 {
    if registry.is_empty() {
        println!("No collections found.");
        return 0;
    }
    println!("{:<32}  {:<6}  FIELDS", "COLLECTION", "KIND");
    println!("{}", "-".repeat(72));
    for (name, adapter) in registry.iter() {
        println!(
            "{:<32}  {:<6}  {}",
            name,
            adapter.kind(),
            adapter.fields().join(", ")
        );
        for (field, target) in adapter.field_links() {
            println!("{:<32}  {:<6}    {} -> {}", "", "", field, target);
        }
    }
    0
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let (config, serve) = match &cli.command {
        Commands::Serve { config } => (config, true),
        Commands::Inspect { config } => (config, false),
    };

    let registry = match open_registry(config) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = if serve {
        tablegraph::mcp::run_mcp_server(registry)
    } else {
        cmd_inspect(&registry)
    };
    std::process::exit(code);
}
