//! Lookup Plugin - value model, function registry and dispatch core.
//!
//! A lookup plugin is a process that exposes a handful of named functions to
//! a peer. Each function has one of three fixed shapes (see
//! [`FunctionKind`]) and answers with a self-describing [`Value`]. This crate
//! has no transport of its own; `lookup-rpc` binds it to HTTP.
//!
//! # Example
//!
//! ```
//! use lookup_plugin::dispatch::{invoke, LookupOutcome, LookupRequest};
//! use lookup_plugin::{FunctionKind, FunctionRegistry, Value};
//!
//! let registry = FunctionRegistry::new();
//! registry
//!     .register_lookup_key("hosts", |_ctx, key| {
//!         Ok(match key {
//!             "db" => Value::from("db.internal"),
//!             _ => Value::Null,
//!         })
//!     })
//!     .unwrap();
//!
//! let hosts = registry.get(FunctionKind::LookupKey, "hosts").unwrap();
//! let outcome = invoke(&hosts, &LookupRequest::new().with_key("db"));
//! assert_eq!(outcome, LookupOutcome::Found(Value::from("db.internal")));
//! ```

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod function;
pub mod registry;
pub mod value;

pub use context::ProviderContext;
pub use dispatch::{LookupOutcome, LookupRequest, Route, WireResponse};
pub use error::{PluginError, Result};
pub use function::{FunctionKind, LookupFunction, LookupResult};
pub use registry::{Catalogue, FunctionRegistry};
pub use value::{to_value, Timestamp, Value};
