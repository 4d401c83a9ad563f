//! Functions served by the `lookup-rpc` binary.
//!
//! - `lookup_key/environment`: environment variables. The `prefix` option is
//!   prepended to the key, and `sensitive: true` marks the result Sensitive.
//! - `data_hash/json_file`: the JSON document at option `path`, which must
//!   decode to a Map.
//! - `data_dig/json_file`: one element of that document, addressed by string
//!   (map key) and integer (slice index) segments.

use anyhow::{bail, Context};
use lookup_plugin::{FunctionRegistry, LookupResult, ProviderContext, Value};
use std::env::{self, VarError};
use std::path::Path;
use tracing::debug;

const PATH_OPTION: &str = "path";
const PREFIX_OPTION: &str = "prefix";
const SENSITIVE_OPTION: &str = "sensitive";

/// Register the demonstration functions into `registry`.
pub fn register_demo_functions(registry: &FunctionRegistry) -> lookup_plugin::Result<()> {
    registry.register_lookup_key("environment", environment)?;
    registry.register_data_hash("json_file", json_file_hash)?;
    registry.register_data_dig("json_file", json_file_dig)?;
    Ok(())
}

fn environment(ctx: &ProviderContext, key: &str) -> LookupResult {
    let name = format!("{}{}", ctx.string_option(PREFIX_OPTION).unwrap_or_default(), key);
    let value = match env::var(&name) {
        Ok(value) => Value::from(value),
        Err(VarError::NotPresent) => return Ok(Value::Null),
        Err(e) => bail!("environment variable {}: {}", name, e),
    };
    if ctx.bool_option(SENSITIVE_OPTION).unwrap_or(false) {
        return Ok(Value::sensitive(value));
    }
    Ok(value)
}

fn json_file_hash(ctx: &ProviderContext) -> LookupResult {
    let document = load_document(ctx)?;
    if document.as_map().is_none() {
        bail!("expected a JSON object, got {}", document.kind_name());
    }
    Ok(document)
}

fn json_file_dig(ctx: &ProviderContext, key: &[Value]) -> LookupResult {
    let document = load_document(ctx)?;
    Ok(dig(&document, key).unwrap_or_default())
}

fn load_document(ctx: &ProviderContext) -> anyhow::Result<Value> {
    let path = ctx
        .string_option(PATH_OPTION)
        .with_context(|| format!("missing string option '{}'", PATH_OPTION))?;
    read_json_file(Path::new(path))
}

fn read_json_file(path: &Path) -> anyhow::Result<Value> {
    debug!("Reading {}", path.display());
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Value::from_json(&bytes).with_context(|| format!("failed to decode {}", path.display()))
}

/// Walk `segments` down from `root`. Passing through a Sensitive node makes
/// the result Sensitive.
fn dig(root: &Value, segments: &[Value]) -> Option<Value> {
    let mut current = root;
    let mut sensitive = false;
    for segment in segments {
        if let Some(inner) = current.unwrap_sensitive() {
            current = inner;
            sensitive = true;
        }
        current = match (current, segment) {
            (Value::Map(map), Value::String(name)) => map.get(name)?,
            (Value::Slice(items), Value::Int(index)) => {
                items.get(usize::try_from(*index).ok()?)?
            }
            _ => return None,
        };
    }
    let found = current.clone();
    if sensitive && found.unwrap_sensitive().is_none() {
        return Some(Value::sensitive(found));
    }
    Some(found)
}
