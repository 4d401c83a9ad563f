//! HTTP server implementation using Axum.

use crate::handler::{handle_lookup, handle_method_not_allowed, handle_route_not_found};
use axum::{routing::get, Router};
use lookup_plugin::config::{env_or, ServeConfig};
use lookup_plugin::{dispatch, Catalogue, FunctionRegistry, PluginError};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Where the plugin listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    pub host: String,
    pub min_port: u16,
    pub max_port: u16,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            host: ServeConfig::DEFAULT_HOST.to_string(),
            min_port: ServeConfig::DEFAULT_MIN_PORT,
            max_port: ServeConfig::DEFAULT_MAX_PORT,
        }
    }
}

impl ServeOptions {
    /// Read options from `LOOKUP_PLUGIN_*` environment variables. Unset or
    /// unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or(ServeConfig::HOST_ENV, defaults.host),
            min_port: env_or(ServeConfig::MIN_PORT_ENV, defaults.min_port),
            max_port: env_or(ServeConfig::MAX_PORT_ENV, defaults.max_port),
        }
    }

    pub fn validate(&self) -> lookup_plugin::Result<()> {
        if self.min_port > self.max_port {
            return Err(PluginError::Config {
                message: format!(
                    "min port {} is greater than max port {}",
                    self.min_port, self.max_port
                ),
            });
        }
        Ok(())
    }
}

/// First line a plugin writes to stdout, telling its peer where to connect
/// and what it can call.
#[derive(Debug, Clone, Serialize)]
pub struct Handshake {
    pub address: String,
    pub functions: Catalogue,
    pub network: &'static str,
    pub version: u32,
}

/// Build the router: one GET route per registered function.
///
/// Fails when the registry is empty.
pub fn build_router(registry: &FunctionRegistry) -> lookup_plugin::Result<(Router, Catalogue)> {
    let routes = dispatch::routes(registry)?;
    let catalogue = registry.catalogue();

    let mut router = Router::new();
    for route in routes {
        let path = route.path.clone();
        router = router.route(
            &path,
            get(handle_lookup)
                .fallback(handle_method_not_allowed)
                .with_state(Arc::new(route)),
        );
    }

    let router = router
        .fallback(handle_route_not_found)
        .layer(TraceLayer::new_for_http());
    Ok((router, catalogue))
}

/// Bind the first free port in `min_port..=max_port`.
pub async fn bind_in_range(options: &ServeOptions) -> anyhow::Result<TcpListener> {
    options.validate()?;
    for port in options.min_port..=options.max_port {
        match TcpListener::bind((options.host.as_str(), port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => tracing::trace!("Port {} unavailable: {}", port, e),
        }
    }
    anyhow::bail!(
        "no available port in the range {} to {}",
        options.min_port,
        options.max_port
    )
}

/// Handle to a running server. Dropping it stops the server.
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub handshake: Handshake,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for in-flight lookups, up to the
    /// configured grace period.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(ServeConfig::SHUTDOWN_GRACE_PERIOD, task)
                .await
                .is_err()
            {
                warn!("Server did not shut down within the grace period");
            }
        }
        info!("Server stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Start serving the functions of `registry` in the background.
pub async fn start_server(
    registry: &FunctionRegistry,
    options: &ServeOptions,
) -> anyhow::Result<ServerHandle> {
    let (app, catalogue) = build_router(registry)?;
    let listener = bind_in_range(options).await?;
    let addr = listener.local_addr()?;

    info!("Server listening on {}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr,
        handshake: Handshake {
            address: addr.to_string(),
            functions: catalogue,
            network: "tcp",
            version: ServeConfig::PROTOCOL_VERSION,
        },
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

/// Serve until Ctrl-C: print the handshake line, then shut down gracefully.
pub async fn serve(registry: &FunctionRegistry, options: &ServeOptions) -> anyhow::Result<()> {
    let handle = start_server(registry, options).await?;

    // The peer reads this line from stdout; logs go to stderr.
    println!("{}", serde_json::to_string(&handle.handshake)?);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    handle.shutdown().await;
    Ok(())
}
