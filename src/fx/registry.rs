use std::collections::BTreeMap;
use std::sync::Arc;

use crate::fx::definition::FxDefinition;

/// Name → definition map consulted by every curve precalc.
///
/// Sections referencing a key that is not registered are skipped, so saved data can name fx the
/// host has not registered (yet).
#[derive(Clone, Debug, Default)]
pub struct FxRegistry {
    defs: BTreeMap<String, Arc<FxDefinition>>,
}

impl FxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in fx library.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::fx::builtin::register_builtins(&mut reg);
        reg
    }

    /// Insert or replace the definition stored under `key`, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        def: FxDefinition,
    ) -> Option<Arc<FxDefinition>> {
        self.defs.insert(key.into(), Arc::new(def))
    }

    pub fn get(&self, key: &str) -> Option<&Arc<FxDefinition>> {
        self.defs.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.defs.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
