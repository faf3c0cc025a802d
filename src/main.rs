//! Diagnostic HTTP server entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use server_vitals::config::Config;
use server_vitals::metrics;
use server_vitals::server::{ProcessTerminator, ServerRuntime};
use server_vitals::system::HostProbe;

/// Diagnostic HTTP server.
#[derive(Parser, Debug)]
#[command(name = "server-vitals")]
#[command(about = "HTTP server reporting process health, uptime, memory and CPU usage")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP listening port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server (default).
    Serve {
        /// HTTP listening port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("server_vitals=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Serve { port }) => cmd_serve(port.or(args.port)).await,
        None => cmd_serve(args.port).await,
    }
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SERVER VITALS - CONFIGURATION CHECK");
    println!("======================================================================");

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
    println!("  Port: {}", config.port);
    println!(
        "  Allowed Origin: {}",
        config.allowed_origin().unwrap_or("* (any)")
    );
    println!("  Environment: {}", config.node_env.as_deref().unwrap_or("development"));
    println!("  Session Cookie: {}", config.session_name);
    println!("  Session Keys: {}", config.session_keys().len());
    println!("  Session Max Age: {}s", config.session_max_age_secs);
    println!("  Body Limit: {} bytes", config.body_limit_bytes);
    println!("  Trusted Proxy Hops: {}", config.trust_proxy_hops);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run the server until a fault or signal shuts it down.
async fn cmd_serve(port_override: Option<u16>) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Allowed origin: {}", config.allowed_origin().unwrap_or("*"));
    info!("Secure cookies: {}", config.is_production());

    let probe = HostProbe::new()?;
    let runtime = ServerRuntime::new(config, Arc::new(probe), Arc::new(ProcessTerminator));

    let trigger = runtime.start().await?;
    runtime.shutdown(trigger.exit_code());

    Ok(())
}
