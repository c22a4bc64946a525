//! Per-call context: a persistent, layered key-value view.
//!
//! A `Context` is never mutated in place. Extending it produces a new
//! value whose lookups consult the new layer first and then fall back to
//! the layers it was built on. Holders of the older value keep seeing
//! exactly what they saw before, which is what keeps keys added by a
//! middleware invisible to the middleware around it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::Value;

struct Layer {
    entries: BTreeMap<String, Value>,
    parent: Option<Arc<Layer>>,
}

/// The context a single call runs with.
///
/// Cloning is cheap: layers are shared through `Arc`.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Layer>>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context seeded with caller-supplied initial values.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Context::new().extend(ContextExtension::from_iter(entries))
    }

    /// Look up a key, innermost layer first.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            if let Some(value) = current.entries.get(key) {
                return Some(value);
            }
            layer = current.parent.as_deref();
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// A new context with `extension` layered on top.
    ///
    /// Extension keys override existing keys in the returned context only.
    #[must_use]
    pub fn extend(&self, extension: ContextExtension) -> Context {
        if extension.is_empty() {
            return self.clone();
        }
        Context {
            head: Some(Arc::new(Layer {
                entries: extension.entries,
                parent: self.head.clone(),
            })),
        }
    }

    /// All visible keys.
    pub fn keys(&self) -> BTreeSet<&str> {
        let mut keys = BTreeSet::new();
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            keys.extend(current.entries.keys().map(String::as_str));
            layer = current.parent.as_deref();
        }
        keys
    }

    /// The merged view as a single map.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut layers = Vec::new();
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            layers.push(current);
            layer = current.parent.as_deref();
        }

        let mut merged = BTreeMap::new();
        for current in layers.into_iter().rev() {
            for (key, value) in &current.entries {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.to_map()).finish()
    }
}

/// Keys a middleware adds for the steps nested inside it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextExtension {
    entries: BTreeMap<String, Value>,
}

impl ContextExtension {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ContextExtension {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_overrides_without_mutating_parent() {
        let base = Context::from_entries([("user", "anonymous"), ("region", "eu")]);
        let narrowed = base.extend(ContextExtension::new().with("user", "alice"));

        assert_eq!(narrowed.get("user"), Some(&Value::from("alice")));
        assert_eq!(narrowed.get("region"), Some(&Value::from("eu")));
        assert_eq!(base.get("user"), Some(&Value::from("anonymous")));
    }

    #[test]
    fn downstream_keys_stay_downstream() {
        let outer = Context::new();
        let inner = outer.extend(ContextExtension::new().with("db", "pool-1"));

        assert!(inner.contains_key("db"));
        assert!(!outer.contains_key("db"));
        assert!(outer.is_empty());
    }

    #[test]
    fn merged_view_prefers_inner_layers() {
        let ctx = Context::from_entries([("a", 1i64), ("b", 1i64)])
            .extend(ContextExtension::new().with("b", 2i64))
            .extend(ContextExtension::new().with("c", 3i64));

        let map = ctx.to_map();
        assert_eq!(map.get("a"), Some(&Value::Integer(1)));
        assert_eq!(map.get("b"), Some(&Value::Integer(2)));
        assert_eq!(map.get("c"), Some(&Value::Integer(3)));
        assert_eq!(ctx.keys().into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_extension_reuses_layers() {
        let ctx = Context::from_entries([("a", true)]);
        let same = ctx.extend(ContextExtension::new());
        assert_eq!(same.to_map(), ctx.to_map());
    }
}
