//! Items REST API entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use items_api::api::{create_router, AppState};
use items_api::config::Config;
use items_api::db::{ensure_items_table, wait_ready, ItemStore, PgManager, Pool};
use items_api::metrics::init_metrics;
use items_api::utils::shutdown_signal;

/// Minimal items REST API over PostgreSQL.
#[derive(Parser, Debug)]
#[command(name = "items-api")]
#[command(about = "HTTP service exposing the items table with health and metrics endpoints")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP listener port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve {
        /// HTTP listener port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("items_api=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Serve { port }) => cmd_serve(port.or(args.port)).await,
        None => cmd_serve(args.port).await,
    }
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!(
        "  Database: {}@{}:{}/{}",
        config.db_user, config.db_host, config.db_port, config.db_name
    );
    println!(
        "  Pool: max {} connections, {} warm, acquire timeout {}ms",
        config.pool_max_size, config.pool_min_idle, config.acquire_timeout_ms
    );
    println!(
        "  Startup gate: {} attempts, base delay {}ms",
        config.startup_max_attempts, config.startup_base_delay_ms
    );
    println!("  Listener port: {}", config.port);
    println!("CONFIGURATION CHECK PASSED");

    Ok(())
}

/// Run the HTTP service.
async fn cmd_serve(port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(port) = port_override {
        config.port = port;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    let metrics_handle = init_metrics()?;

    // The listener must not bind until the schema is known good; a gate
    // failure is fatal and the process exits nonzero for the orchestrator.
    let manager = PgManager::new(config.pg_config());
    let policy = config.retry_policy();
    info!(
        max_attempts = policy.max_attempts,
        "Waiting for database readiness..."
    );
    wait_ready(&policy, || ensure_items_table(&manager)).await?;

    let pool = Pool::new(manager, config.pool_config());
    pool.warm().await?;

    let state = AppState::new(ItemStore::new(pool), metrics_handle);
    let router = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
