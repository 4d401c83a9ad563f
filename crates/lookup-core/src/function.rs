//! The three lookup function shapes a plugin can register.

use crate::context::ProviderContext;
use crate::value::Value;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Outcome of a lookup function body. `Ok(Value::Null)` means "no value".
pub type LookupResult = anyhow::Result<Value>;

/// Looks up a value by a key made of string or integer segments.
pub type DataDigFn = dyn Fn(&ProviderContext, &[Value]) -> LookupResult + Send + Sync;

/// Returns a whole lookup source, expected to be a `Map`.
pub type DataHashFn = dyn Fn(&ProviderContext) -> LookupResult + Send + Sync;

/// Looks up a value by a single flat key.
pub type LookupKeyFn = dyn Fn(&ProviderContext, &str) -> LookupResult + Send + Sync;

/// Kind of a registered function. Also the first segment of its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    DataDig,
    DataHash,
    LookupKey,
}

impl FunctionKind {
    pub const ALL: [FunctionKind; 3] = [
        FunctionKind::DataDig,
        FunctionKind::DataHash,
        FunctionKind::LookupKey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::DataDig => "data_dig",
            FunctionKind::DataHash => "data_hash",
            FunctionKind::LookupKey => "lookup_key",
        }
    }

    /// Route path of a function of this kind, e.g. `/lookup_key/env`.
    pub fn route(&self, name: &str) -> String {
        format!("/{}/{}", self.as_str(), name)
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A callable lookup function of one of the three fixed shapes.
#[derive(Clone)]
pub enum LookupFunction {
    DataDig(Arc<DataDigFn>),
    DataHash(Arc<DataHashFn>),
    LookupKey(Arc<LookupKeyFn>),
}

impl LookupFunction {
    pub fn data_dig<F>(f: F) -> Self
    where
        F: Fn(&ProviderContext, &[Value]) -> LookupResult + Send + Sync + 'static,
    {
        LookupFunction::DataDig(Arc::new(f))
    }

    pub fn data_hash<F>(f: F) -> Self
    where
        F: Fn(&ProviderContext) -> LookupResult + Send + Sync + 'static,
    {
        LookupFunction::DataHash(Arc::new(f))
    }

    pub fn lookup_key<F>(f: F) -> Self
    where
        F: Fn(&ProviderContext, &str) -> LookupResult + Send + Sync + 'static,
    {
        LookupFunction::LookupKey(Arc::new(f))
    }

    pub fn kind(&self) -> FunctionKind {
        match self {
            LookupFunction::DataDig(_) => FunctionKind::DataDig,
            LookupFunction::DataHash(_) => FunctionKind::DataHash,
            LookupFunction::LookupKey(_) => FunctionKind::LookupKey,
        }
    }
}

impl fmt::Debug for LookupFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LookupFunction::{:?}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(FunctionKind::DataDig.as_str(), "data_dig");
        assert_eq!(FunctionKind::DataHash.to_string(), "data_hash");
        assert_eq!(FunctionKind::LookupKey.route("env"), "/lookup_key/env");
        assert_eq!(
            serde_json::to_string(&FunctionKind::LookupKey).unwrap(),
            r#""lookup_key""#
        );
    }

    #[test]
    fn test_function_kind() {
        let f = LookupFunction::data_hash(|_ctx| Ok(Value::Null));
        assert_eq!(f.kind(), FunctionKind::DataHash);
        assert_eq!(format!("{:?}", f), "LookupFunction::DataHash");
    }
}
