//! Function registry for lookup plugins.
//!
//! A [`FunctionRegistry`] is an ordinary value that can be built and passed
//! to the dispatch layer. Plugins that prefer registering from anywhere in
//! the process use the global instance through the free functions below.
//!
//! # Lifecycle
//!
//! Register every function once at startup, then start serving. The table is
//! read-heavy afterwards; [`reset`] exists for test isolation only.

pub mod function_registry;

pub use function_registry::{Catalogue, FunctionRegistry};

use crate::context::ProviderContext;
use crate::function::LookupResult;
use crate::value::Value;
use crate::Result;
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<Arc<FunctionRegistry>> =
    LazyLock::new(|| Arc::new(FunctionRegistry::new()));

/// The process-wide registry.
pub fn global() -> Arc<FunctionRegistry> {
    Arc::clone(&GLOBAL)
}

/// Register a DataDig function with the global registry.
pub fn register_data_dig<F>(name: impl Into<String>, f: F) -> Result<()>
where
    F: Fn(&ProviderContext, &[Value]) -> LookupResult + Send + Sync + 'static,
{
    global().register_data_dig(name, f)
}

/// Register a DataHash function with the global registry.
pub fn register_data_hash<F>(name: impl Into<String>, f: F) -> Result<()>
where
    F: Fn(&ProviderContext) -> LookupResult + Send + Sync + 'static,
{
    global().register_data_hash(name, f)
}

/// Register a LookupKey function with the global registry.
pub fn register_lookup_key<F>(name: impl Into<String>, f: F) -> Result<()>
where
    F: Fn(&ProviderContext, &str) -> LookupResult + Send + Sync + 'static,
{
    global().register_lookup_key(name, f)
}

/// Clear the global registry. Only meant for tests.
pub fn reset() {
    global().reset();
}
