//! Lookup RPC Server - demonstration lookup plugin.
//!
//! Serves the functions in [`lookup_rpc::demo`] over HTTP. The handshake line
//! is the only output on stdout; logs go to stderr.

use anyhow::Result;
use clap::Parser;
use lookup_plugin::registry;
use lookup_rpc::{demo, serve, ServeOptions};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "lookup-rpc")]
#[command(about = "Lookup plugin serving environment and JSON file data")]
struct Args {
    /// Host to bind to (overrides LOOKUP_PLUGIN_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Lowest port to try (overrides LOOKUP_PLUGIN_MIN_PORT)
    #[arg(long)]
    min_port: Option<u16>,

    /// Highest port to try (overrides LOOKUP_PLUGIN_MAX_PORT)
    #[arg(long)]
    max_port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn serve_options(&self) -> ServeOptions {
        let mut options = ServeOptions::from_env();
        if let Some(host) = &self.host {
            options.host = host.clone();
        }
        if let Some(port) = self.min_port {
            options.min_port = port;
        }
        if let Some(port) = self.max_port {
            options.max_port = port;
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting lookup plugin");

    let registry = registry::global();
    demo::register_demo_functions(&registry)?;

    serve(&registry, &args.serve_options()).await?;

    info!("Lookup plugin exited");
    Ok(())
}
