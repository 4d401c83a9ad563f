//! Conversion of native Rust data into [`Value`].
//!
//! [`to_value`] walks any `Serialize` type with [`ValueSerializer`]. Only
//! shapes that have a variant in the value model are accepted: booleans,
//! integers, floats, text, byte strings, options, sequences and string keyed
//! maps. Structs and enums are refused with
//! [`PluginError::UnsupportedType`].

use super::codec::from_entries;
use super::Value;
use crate::error::{PluginError, Result};
use serde::ser::{self, Impossible, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Convert a native value into a [`Value`].
///
/// ```
/// use lookup_plugin::{to_value, Value};
/// use std::collections::HashMap;
///
/// let hosts = HashMap::from([("host", "example.com")]);
/// let value = to_value(&hosts).unwrap();
/// assert_eq!(value.as_map().unwrap()["host"], Value::from("example.com"));
/// ```
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(ValueSerializer)
}

impl ser::Error for PluginError {
    fn custom<T: Display>(msg: T) -> Self {
        PluginError::Other(msg.to_string())
    }
}

/// Serializer producing a [`Value`] tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSerializer;

fn int_in_range<T>(v: T, type_name: &str) -> Result<Value>
where
    T: TryInto<i64> + Display + Copy,
{
    v.try_into().map(Value::Int).map_err(|_| {
        PluginError::unsupported(format!("{} {} outside the Int range", type_name, v))
    })
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = PluginError;

    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = Impossible<Value, PluginError>;
    type SerializeTupleVariant = Impossible<Value, PluginError>;
    type SerializeMap = MapBuilder;
    type SerializeStruct = Impossible<Value, PluginError>;
    type SerializeStructVariant = Impossible<Value, PluginError>;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        int_in_range(v, "i128")
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        int_in_range(v, "u64")
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        int_in_range(v, "u128")
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::binary(v))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value> {
        Err(PluginError::unsupported(format!("unit struct {}", name)))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Err(PluginError::unsupported(format!("enum variant {}::{}", name, variant)))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Value> {
        Err(PluginError::unsupported(format!("enum variant {}::{}", name, variant)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder> {
        Ok(SeqBuilder {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(PluginError::unsupported(format!("tuple struct {}", name)))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(PluginError::unsupported(format!("enum variant {}::{}", name, variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder> {
        Ok(MapBuilder {
            entries: BTreeMap::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(PluginError::unsupported(format!("struct {}", name)))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(PluginError::unsupported(format!("enum variant {}::{}", name, variant)))
    }
}

/// Collects sequence and tuple elements into a `Slice`.
pub struct SeqBuilder {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Value;
    type Error = PluginError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Slice(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Value;
    type Error = PluginError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

/// Collects string keyed entries into a `Map`, or into a rich value when the
/// entries form an envelope.
pub struct MapBuilder {
    entries: BTreeMap<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Value;
    type Error = PluginError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        match key.serialize(ValueSerializer)? {
            Value::String(key) => {
                self.next_key = Some(key);
                Ok(())
            }
            other => Err(PluginError::unsupported(format!(
                "map with {} keys",
                other.kind_name()
            ))),
        }
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| PluginError::Other("map value serialized before its key".into()))?;
        self.entries.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        from_entries(self.entries)
    }
}
