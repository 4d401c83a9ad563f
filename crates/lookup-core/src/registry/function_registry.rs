//! Concurrency-safe table of registered lookup functions.

use crate::context::ProviderContext;
use crate::function::{FunctionKind, LookupFunction, LookupResult};
use crate::value::Value;
use crate::{PluginError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Default)]
struct Tables {
    data_digs: BTreeMap<String, LookupFunction>,
    data_hashes: BTreeMap<String, LookupFunction>,
    lookup_keys: BTreeMap<String, LookupFunction>,
}

impl Tables {
    fn table(&self, kind: FunctionKind) -> &BTreeMap<String, LookupFunction> {
        match kind {
            FunctionKind::DataDig => &self.data_digs,
            FunctionKind::DataHash => &self.data_hashes,
            FunctionKind::LookupKey => &self.lookup_keys,
        }
    }

    fn table_mut(&mut self, kind: FunctionKind) -> &mut BTreeMap<String, LookupFunction> {
        match kind {
            FunctionKind::DataDig => &mut self.data_digs,
            FunctionKind::DataHash => &mut self.data_hashes,
            FunctionKind::LookupKey => &mut self.lookup_keys,
        }
    }
}

/// Registered function names grouped by kind, in ascending name order.
///
/// Kinds without registrations are left out. Serializes as
/// `{"data_dig":[...],"lookup_key":[...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalogue(BTreeMap<FunctionKind, Vec<String>>);

impl Catalogue {
    pub fn names(&self, kind: FunctionKind) -> &[String] {
        self.0.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionKind, &[String])> {
        self.0.iter().map(|(kind, names)| (*kind, names.as_slice()))
    }
}

/// Process-scoped table mapping (kind, name) to a lookup function.
///
/// Registration takes the write lock for a single insert. Enumeration holds
/// the read lock for the whole traversal. Handles are cloned out of the table
/// before they are invoked, so a slow lookup never blocks registration.
#[derive(Default)]
pub struct FunctionRegistry {
    tables: RwLock<Tables>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        // A visitor panicking mid-enumeration poisons the lock; inserts are
        // single map operations, so the tables are never half-written.
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a function under `name`. Fails if the name is taken for the
    /// function's kind, or if it cannot be used as a route segment.
    pub fn register(&self, name: impl Into<String>, function: LookupFunction) -> Result<()> {
        let name = name.into();
        validate_name(&name)?;
        let kind = function.kind();
        let mut tables = self.write();
        let table = tables.table_mut(kind);
        if table.contains_key(&name) {
            return Err(PluginError::AlreadyRegistered { kind, name });
        }
        debug!("Registered {} function '{}'", kind, name);
        table.insert(name, function);
        Ok(())
    }

    pub fn register_data_dig<F>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(&ProviderContext, &[Value]) -> LookupResult + Send + Sync + 'static,
    {
        self.register(name, LookupFunction::data_dig(f))
    }

    pub fn register_data_hash<F>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(&ProviderContext) -> LookupResult + Send + Sync + 'static,
    {
        self.register(name, LookupFunction::data_hash(f))
    }

    pub fn register_lookup_key<F>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(&ProviderContext, &str) -> LookupResult + Send + Sync + 'static,
    {
        self.register(name, LookupFunction::lookup_key(f))
    }

    /// Look up a single function.
    pub fn get(&self, kind: FunctionKind, name: &str) -> Option<LookupFunction> {
        self.read().table(kind).get(name).cloned()
    }

    /// Visit every function of `kind` in ascending name order.
    pub fn for_each<F>(&self, kind: FunctionKind, mut visit: F)
    where
        F: FnMut(&str, &LookupFunction),
    {
        let tables = self.read();
        for (name, function) in tables.table(kind) {
            visit(name, function);
        }
    }

    /// Names registered for `kind`, sorted.
    pub fn names(&self, kind: FunctionKind) -> Vec<String> {
        self.read().table(kind).keys().cloned().collect()
    }

    /// True if no function of any kind is registered.
    pub fn is_empty(&self) -> bool {
        let tables = self.read();
        FunctionKind::ALL
            .iter()
            .all(|kind| tables.table(*kind).is_empty())
    }

    pub fn len(&self) -> usize {
        let tables = self.read();
        FunctionKind::ALL
            .iter()
            .map(|kind| tables.table(*kind).len())
            .sum()
    }

    pub fn catalogue(&self) -> Catalogue {
        let tables = self.read();
        Catalogue(
            FunctionKind::ALL
                .into_iter()
                .filter(|kind| !tables.table(*kind).is_empty())
                .map(|kind| (kind, tables.table(kind).keys().cloned().collect()))
                .collect(),
        )
    }

    /// Remove every registration. Intended for test isolation only.
    pub fn reset(&self) {
        *self.write() = Tables::default();
    }
}

/// Names become the last segment of a route, so they must be non-empty and
/// free of path and pattern syntax.
fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: String| PluginError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name is empty".to_string()));
    }
    let forbidden = |c: &char| {
        matches!(*c, '/' | ':' | '*' | '?' | '#' | '{' | '}') || c.is_whitespace() || c.is_control()
    };
    match name.chars().find(forbidden) {
        Some(c) => Err(invalid(format!("character {:?} is not allowed", c))),
        None => Ok(()),
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("catalogue", &self.catalogue())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn none_dig(_: &ProviderContext, _: &[Value]) -> LookupResult {
        Ok(Value::Null)
    }

    fn none_hash(_: &ProviderContext) -> LookupResult {
        Ok(Value::Null)
    }

    fn none_key(_: &ProviderContext, _: &str) -> LookupResult {
        Ok(Value::Null)
    }

    fn visited(registry: &FunctionRegistry, kind: FunctionKind) -> String {
        let mut names = String::new();
        registry.for_each(kind, |name, _| names.push_str(name));
        names
    }

    #[test]
    fn test_data_dig_duplicate_fails() {
        let registry = FunctionRegistry::new();
        registry.register_data_dig("l1", none_dig).unwrap();
        registry.register_data_dig("l2", none_dig).unwrap();
        assert_eq!(visited(&registry, FunctionKind::DataDig), "l1l2");

        let err = registry.register_data_dig("l2", none_dig).unwrap_err();
        assert!(matches!(
            err,
            PluginError::AlreadyRegistered { kind: FunctionKind::DataDig, ref name } if name == "l2"
        ));
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let registry = FunctionRegistry::new();
        for name in ["", "a/b", ":param", "*rest", "with space"] {
            let err = registry.register_lookup_key(name, none_key).unwrap_err();
            assert!(matches!(err, PluginError::InvalidName { .. }), "{:?}", name);
        }
        registry.register_lookup_key("ok-name_1.v2", none_key).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_for_each_is_sorted() {
        let registry = FunctionRegistry::new();
        for name in ["zeta", "alpha", "mu", "beta"] {
            registry.register_lookup_key(name, none_key).unwrap();
        }
        let mut names = Vec::new();
        registry.for_each(FunctionKind::LookupKey, |name, f| {
            assert_eq!(f.kind(), FunctionKind::LookupKey);
            names.push(name.to_string());
        });
        assert_eq!(names, ["alpha", "beta", "mu", "zeta"]);
        assert_eq!(registry.names(FunctionKind::LookupKey), names);
    }

    #[test]
    fn test_same_name_across_kinds() {
        let registry = FunctionRegistry::new();
        registry.register_data_dig("l1", none_dig).unwrap();
        registry.register_data_hash("l1", none_hash).unwrap();
        registry.register_lookup_key("l1", none_key).unwrap();
        let combined: String = FunctionKind::ALL
            .iter()
            .map(|kind| visited(&registry, *kind))
            .collect();
        assert_eq!(combined, "l1l1l1");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_is_empty_and_reset() {
        let registry = FunctionRegistry::new();
        assert!(registry.is_empty());
        registry.register_data_hash("h", none_hash).unwrap();
        assert!(!registry.is_empty());
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.get(FunctionKind::DataHash, "h").is_none());
    }

    #[test]
    fn test_catalogue_skips_empty_kinds() {
        let registry = FunctionRegistry::new();
        registry.register_lookup_key("b", none_key).unwrap();
        registry.register_lookup_key("a", none_key).unwrap();
        registry.register_data_dig("d", none_dig).unwrap();

        let catalogue = registry.catalogue();
        assert_eq!(catalogue.names(FunctionKind::LookupKey), ["a", "b"]);
        assert!(catalogue.names(FunctionKind::DataHash).is_empty());
        assert_eq!(
            serde_json::to_string(&catalogue).unwrap(),
            r#"{"data_dig":["d"],"lookup_key":["a","b"]}"#
        );
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(FunctionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        registry
                            .register_lookup_key(format!("f{:02}_{:02}", i, j), none_key)
                            .unwrap();
                        // Readers run alongside writers.
                        let _ = registry.names(FunctionKind::LookupKey);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let names = registry.names(FunctionKind::LookupKey);
        assert_eq!(names.len(), 200);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_concurrent_duplicates_register_once() {
        let registry = Arc::new(FunctionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.register_data_hash("shared", none_hash).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
    }
}
