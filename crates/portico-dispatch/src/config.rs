//! Host configuration surface.
//!
//! The dispatcher reads a nested value tree via dotted-path lookup, e.g.
//! `routes.disable.feed`. The tree is opaque to the core beyond the keys it
//! consults; hosts load it from JSON or YAML, or build it in code.

use serde_json::Value;

/// A read-only nested configuration map with dotted-path lookup.
#[derive(Debug, Clone, Default)]
pub struct Config {
    root: Value,
}

impl Config {
    /// Wraps an already-built value tree.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// An empty configuration; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads configuration from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(s)?))
    }

    /// Loads configuration from a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        Ok(Self::new(serde_yaml::from_str(s)?))
    }

    /// Resolves a dotted path (`"routes.disable.feed"`) to a value.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Boolean lookup. `None` when the path is missing or not a boolean.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    /// Boolean lookup with a default for missing or non-boolean values.
    pub fn bool_or(&self, path: &str, default: bool) -> bool {
        self.get_bool(path).unwrap_or(default)
    }

    /// String lookup.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    /// Unsigned integer lookup.
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path)?.as_u64()
    }
}
