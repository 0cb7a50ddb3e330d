//! The process-wide table of command aliases.
//!
//! The store is a plain keyed mapping; only its `get`/`set` contract matters
//! to the parser and the `alias`/`unalias` builtins. A `BTreeMap` keeps the
//! listing order stable, which makes `alias` output (and tests) predictable.

use std::collections::BTreeMap;

/// Mapping from alias name to replacement text.
///
/// Aliases live only for the lifetime of the shell process.
#[derive(Debug, Default)]
pub struct AliasStore {
    bindings: BTreeMap<String, String>,
}

impl AliasStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replacement text bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    /// Binds `name` to `text`, replacing any prior value.
    pub fn set(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.bindings.insert(name.into(), text.into());
    }

    /// Removes the binding for `name`, returning the old replacement text.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.bindings.remove(name)
    }

    /// Yields `(name, text)` pairs in a stable (sorted) order.
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
