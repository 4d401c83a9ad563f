//! Canonical JSON encoding of [`Value`].
//!
//! Null, Bool, Int, Float, String, Slice and Map map onto their native JSON
//! forms. Binary, Timestamp and Sensitive use a two-key envelope whose tag is
//! stored under `__ptype` and whose payload is stored under `__pvalue`:
//!
//! | Variant   | `__pvalue`                                   |
//! |-----------|----------------------------------------------|
//! | Binary    | strict, padded base64 text                   |
//! | Timestamp | RFC 3339 text with nanosecond precision      |
//! | Sensitive | the encoded inner value                      |
//!
//! Object keys are emitted in sorted order, so the envelope always reads
//! `{"__ptype":...,"__pvalue":...}`. Infinite and NaN floats have no JSON
//! form and fail to encode.

use super::{encode_base64, format_timestamp, Value};
use crate::config::WireConfig;
use crate::error::{PluginError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Encode a value as canonical JSON.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode wire JSON into a value.
///
/// Integers that fit an `i64` decode to `Int`; any other number decodes to
/// `Float`, so `3` and `3.0` keep their distinct meaning.
pub fn decode(json: &[u8]) -> Result<Value> {
    let raw: serde_json::Value = serde_json::from_slice(json)?;
    Value::try_from(raw)
}

impl Value {
    /// Decode wire JSON text into a value. See [`decode`].
    pub fn from_json(json: impl AsRef<[u8]>) -> Result<Value> {
        decode(json.as_ref())
    }

    /// Encode this value as canonical JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy)]
enum RichKind {
    Binary,
    Sensitive,
    Timestamp,
}

impl RichKind {
    fn from_tag(tag: &str) -> Option<Self> {
        if tag == WireConfig::BINARY_TAG {
            Some(RichKind::Binary)
        } else if tag == WireConfig::SENSITIVE_TAG {
            Some(RichKind::Sensitive)
        } else if tag == WireConfig::TIMESTAMP_TAG {
            Some(RichKind::Timestamp)
        } else {
            None
        }
    }
}

/// Build a value from decoded object members.
///
/// An object holding the type key is a rich-type envelope; anything else is a
/// plain `Map`.
pub(crate) fn from_entries(mut entries: BTreeMap<String, Value>) -> Result<Value> {
    let Some(tag) = entries.remove(WireConfig::TYPE_KEY) else {
        return Ok(Value::Map(entries));
    };
    let tag = match tag {
        Value::String(tag) => tag,
        other => {
            return Err(PluginError::UnknownRichType {
                field: WireConfig::TYPE_KEY,
                tag: other.to_string(),
            })
        }
    };
    let kind = RichKind::from_tag(&tag).ok_or_else(|| PluginError::UnknownRichType {
        field: WireConfig::TYPE_KEY,
        tag: tag.clone(),
    })?;
    let payload = entries
        .remove(WireConfig::VALUE_KEY)
        .ok_or_else(|| PluginError::MissingRichValue {
            field: WireConfig::VALUE_KEY,
            tag: tag.clone(),
        })?;

    match kind {
        RichKind::Sensitive => Ok(Value::sensitive(payload)),
        RichKind::Binary => {
            let text = payload_text(&tag, payload)?;
            STANDARD
                .decode(text.as_bytes())
                .map(Value::Binary)
                .map_err(|e| invalid_payload(&tag, e.to_string()))
        }
        RichKind::Timestamp => {
            let text = payload_text(&tag, payload)?;
            DateTime::parse_from_rfc3339(&text)
                .map(Value::Timestamp)
                .map_err(|e| invalid_payload(&tag, format!("'{}': {}", text, e)))
        }
    }
}

fn payload_text(tag: &str, payload: Value) -> Result<String> {
    match payload {
        Value::String(text) => Ok(text),
        other => Err(invalid_payload(
            tag,
            format!("expected a string, got {}", other.kind_name()),
        )),
    }
}

fn invalid_payload(tag: &str, message: String) -> PluginError {
    PluginError::InvalidRichPayload {
        field: WireConfig::VALUE_KEY,
        tag: tag.to_string(),
        message,
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = PluginError;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).ok_or_else(|| PluginError::Json {
                    message: format!("number {} is not representable", n),
                    source: None,
                })?,
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Slice(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(members) => from_entries(
                members
                    .into_iter()
                    .map(|(k, v)| Ok((k, Value::try_from(v)?)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            )?,
        })
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) if !x.is_finite() => Err(S::Error::custom(format!(
                "unsupported value: float {} has no JSON representation",
                x
            ))),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::Binary(bytes) => {
                envelope(serializer, WireConfig::BINARY_TAG, &encode_base64(bytes))
            }
            Value::Timestamp(ts) => {
                envelope(serializer, WireConfig::TIMESTAMP_TAG, &format_timestamp(ts))
            }
            Value::Sensitive(inner) => {
                envelope(serializer, WireConfig::SENSITIVE_TAG, inner.as_ref())
            }
            Value::Slice(items) => serializer.collect_seq(items),
            Value::Map(entries) => serializer.collect_map(entries),
        }
    }
}

fn envelope<S, T>(serializer: S, tag: &str, payload: &T) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry(WireConfig::TYPE_KEY, tag)?;
    map.serialize_entry(WireConfig::VALUE_KEY, payload)?;
    map.end()
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Value::try_from(raw).map_err(serde::de::Error::custom)
    }
}
