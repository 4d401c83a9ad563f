//! Lookup RPC - HTTP binding and process bootstrap for lookup plugins.
//!
//! Every function in a [`lookup_plugin::FunctionRegistry`] is served at
//! `GET /<kind>/<name>`. [`server::serve`] binds a port, prints the handshake
//! line the peer reads from stdout and runs until interrupted.

pub mod demo;
pub mod handler;
pub mod server;

pub use server::{build_router, serve, start_server, Handshake, ServeOptions, ServerHandle};
