//! Per-invocation context handed to every lookup function.

use crate::error::Result;
use crate::value::{to_value, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Options and conversion helpers available to a lookup function.
///
/// The typed accessors return `None` both when the option is missing and
/// when it holds a different variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderContext {
    options: BTreeMap<String, Value>,
}

impl ProviderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: BTreeMap<String, Value>) -> Self {
        Self { options }
    }

    /// Build a context from the raw `options` request parameter.
    ///
    /// Malformed JSON is an error. Well-formed JSON that is not a `Map`
    /// leaves the options empty.
    pub fn from_query(options: Option<&str>) -> Result<Self> {
        let Some(json) = options.filter(|s| !s.is_empty()) else {
            return Ok(Self::new());
        };
        match Value::from_json(json)? {
            Value::Map(options) => Ok(Self { options }),
            other => {
                tracing::debug!("Ignoring options of kind {}", other.kind_name());
                Ok(Self::new())
            }
        }
    }

    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// The option with the given name, if present.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    pub fn bool_option(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(Value::as_bool)
    }

    pub fn int_option(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(Value::as_i64)
    }

    pub fn float_option(&self, name: &str) -> Option<f64> {
        self.option(name).and_then(Value::as_f64)
    }

    /// Convert a native value into a [`Value`]. See [`to_value`].
    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value> {
        to_value(value)
    }
}
