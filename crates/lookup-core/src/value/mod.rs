//! The closed value model exchanged between a plugin and its peers.
//!
//! [`Value`] is a tagged union over a fixed set of variants. Values are
//! immutable once built: they come from a lookup function (directly, or via
//! [`to_value`]) or from decoding wire JSON with [`Value::from_json`].
//!
//! Three variants have no native JSON form and travel in a rich-type envelope
//! (see [`codec`]):
//!
//! ```text
//! {"__ptype":"Binary","__pvalue":"AQID"}
//! ```

pub mod codec;
mod convert;

pub use convert::{to_value, ValueSerializer};

use crate::config::WireConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp payload with nanosecond precision and the original offset.
pub type Timestamp = DateTime<FixedOffset>;

/// A self-describing, strongly typed value.
///
/// Equality is structural and variant-typed: `Int(3)` never equals
/// `Float(3.0)`, a `Slice` never equals a `Map`, and `Sensitive(v)` only
/// equals another `Sensitive` wrapping an equal value. Timestamps compare by
/// instant, not by their textual offset.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
    Timestamp(Timestamp),
    Sensitive(Box<Value>),
    Slice(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Wrap raw bytes.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary(bytes.into())
    }

    /// Mark a value as sensitive.
    pub fn sensitive(inner: impl Into<Value>) -> Self {
        Value::Sensitive(Box::new(inner.into()))
    }

    /// Build a timestamp value from any chrono timezone.
    pub fn timestamp<Tz: TimeZone>(ts: DateTime<Tz>) -> Self {
        Value::Timestamp(ts.fixed_offset())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Slice(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// The wrapped value of a `Sensitive`, or `None` for any other variant.
    pub fn unwrap_sensitive(&self) -> Option<&Value> {
        match self {
            Value::Sensitive(inner) => Some(inner),
            _ => None,
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Binary(_) => WireConfig::BINARY_TAG,
            Value::Timestamp(_) => WireConfig::TIMESTAMP_TAG,
            Value::Sensitive(_) => WireConfig::SENSITIVE_TAG,
            Value::Slice(_) => "Slice",
            Value::Map(_) => "Map",
        }
    }
}

/// Strict, padded base64 of the given bytes.
pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// RFC 3339 with trailing zeros of the fraction trimmed and `Z` for UTC.
pub(crate) fn format_timestamp(ts: &Timestamp) -> String {
    let full = ts.to_rfc3339_opts(SecondsFormat::Nanos, true);
    // The fraction always sits between the seconds and the offset.
    let Some(dot) = full.find('.') else {
        return full;
    };
    let offset_start = full[dot..]
        .find(|c: char| c == 'Z' || c == '+' || c == '-')
        .map(|i| dot + i)
        .unwrap_or(full.len());
    let fraction = full[dot + 1..offset_start].trim_end_matches('0');
    let mut out = String::with_capacity(full.len());
    out.push_str(&full[..dot]);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out.push_str(&full[offset_start..]);
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Binary(bytes) => write!(f, "Binary({:?})", encode_base64(bytes)),
            Value::Timestamp(ts) => write!(f, "Timestamp({:?})", format_timestamp(ts)),
            Value::Sensitive(_) => f.write_str(WireConfig::REDACTED),
            Value::Slice(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", key, item)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Int(i64::from(i))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(ts: DateTime<Tz>) -> Self {
        Value::timestamp(ts)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Slice(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Slice(iter.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
