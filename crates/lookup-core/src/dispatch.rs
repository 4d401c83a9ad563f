//! Transport-independent request dispatch.
//!
//! Turns the raw `key`/`options` parameters of a request into a call of a
//! registered function and classifies what came back. This is the only place
//! where faults raised by a lookup function are recovered: an `Err` return
//! and a panic both end up as [`LookupOutcome::Failed`].

use crate::config::WireConfig;
use crate::context::ProviderContext;
use crate::function::{FunctionKind, LookupFunction};
use crate::registry::FunctionRegistry;
use crate::value::{codec, Value};
use crate::{PluginError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";
const UNKNOWN_FAULT: &str = "unexpected fault in lookup function";

/// Raw parameters of one lookup request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupRequest {
    /// JSON array text for `data_dig`, plain text for `lookup_key`.
    pub key: Option<String>,
    /// JSON object text.
    pub options: Option<String>,
}

impl LookupRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Pick the `key` and `options` parameters out of decoded query pairs.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        Self {
            key: params.get(WireConfig::KEY_PARAM).cloned(),
            options: params.get(WireConfig::OPTIONS_PARAM).cloned(),
        }
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}

/// What a lookup produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Value),
    NotFound,
    /// The function, or the decoding of its parameters, failed.
    Failed(String),
}

/// Logical wire response: status, content type and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl WireResponse {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: PLAIN_TEXT,
            body: body.into().into_bytes(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self::text(405, "")
    }

    pub fn route_not_found() -> Self {
        Self::text(404, WireConfig::ROUTE_NOT_FOUND)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl From<LookupOutcome> for WireResponse {
    fn from(outcome: LookupOutcome) -> Self {
        match outcome {
            LookupOutcome::Found(value) => match codec::encode(&value) {
                Ok(body) => WireResponse {
                    status: 200,
                    content_type: WireConfig::JSON_CONTENT_TYPE,
                    body,
                },
                Err(e) => WireResponse::text(500, e.to_string()),
            },
            LookupOutcome::NotFound => WireResponse::text(404, WireConfig::VALUE_NOT_FOUND),
            LookupOutcome::Failed(message) => WireResponse::text(500, message),
        }
    }
}

/// One addressable lookup function.
#[derive(Debug, Clone)]
pub struct Route {
    pub kind: FunctionKind,
    pub name: String,
    pub path: String,
    pub function: LookupFunction,
}

impl Route {
    pub fn invoke(&self, request: &LookupRequest) -> LookupOutcome {
        let outcome = invoke(&self.function, request);
        if let LookupOutcome::Failed(message) = &outcome {
            warn!("Lookup {} failed: {}", self.path, message);
        }
        outcome
    }
}

/// One route per registered function, ordered by kind and then name.
///
/// Refuses to build anything for an empty registry.
pub fn routes(registry: &FunctionRegistry) -> Result<Vec<Route>> {
    if registry.is_empty() {
        return Err(PluginError::NoFunctions);
    }
    let mut routes = Vec::with_capacity(registry.len());
    for kind in FunctionKind::ALL {
        registry.for_each(kind, |name, function| {
            routes.push(Route {
                kind,
                name: name.to_string(),
                path: kind.route(name),
                function: function.clone(),
            });
        });
    }
    Ok(routes)
}

/// Call `function` with the parameters of `request`.
pub fn invoke(function: &LookupFunction, request: &LookupRequest) -> LookupOutcome {
    match catch_faults(|| call(function, request)) {
        Ok(Value::Null) => LookupOutcome::NotFound,
        Ok(value) => LookupOutcome::Found(value),
        Err(message) => LookupOutcome::Failed(message),
    }
}

fn call(function: &LookupFunction, request: &LookupRequest) -> anyhow::Result<Value> {
    let ctx = ProviderContext::from_query(request.options.as_deref())?;
    match function {
        LookupFunction::DataDig(f) => match dig_key(request.key())? {
            Some(segments) => f(&ctx, &segments),
            None => Ok(Value::Null),
        },
        LookupFunction::DataHash(f) => f(&ctx),
        LookupFunction::LookupKey(f) => match request.key() {
            Some(key) => f(&ctx, key),
            None => Ok(Value::Null),
        },
    }
}

/// Decode the `data_dig` key. Anything that decodes but is not a `Slice`
/// means "no key"; text that does not decode is an error.
fn dig_key(raw: Option<&str>) -> Result<Option<Vec<Value>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match Value::from_json(raw)? {
        Value::Slice(segments) => Ok(Some(segments)),
        _ => Ok(None),
    }
}

/// Run `f`, turning both an `Err` return and a panic into a message.
pub fn catch_faults<F>(f: F) -> std::result::Result<Value, String>
where
    F: FnOnce() -> anyhow::Result<Value>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{:#}", err)),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<anyhow::Error>() {
        format!("{:#}", err)
    } else if let Some(err) = payload.downcast_ref::<PluginError>() {
        err.to_string()
    } else {
        UNKNOWN_FAULT.to_string()
    }
}
