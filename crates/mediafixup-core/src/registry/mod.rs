//! Registry of fixup implementations.
//!
//! Maps fixup names to factories. The first [`FixupRegistry::resolve`] of a
//! name creates the instance; later resolves return the same instance for
//! the lifetime of the registry.

use crate::error::{FixupError, Result};
use crate::fixup::Fixup;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Creates a fixup instance.
pub type FixupFactory = Box<dyn Fn() -> Arc<dyn Fixup> + Send + Sync>;

/// Name -> factory table with memoized instances.
pub struct FixupRegistry {
    factories: HashMap<String, FixupFactory>,
    /// Instances created so far, by fixup name.
    instances: RwLock<HashMap<String, Arc<dyn Fixup>>>,
}

impl Default for FixupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FixupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry holding all fixups shipped with this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::fixups::register_builtin(&mut registry);
        registry
    }

    /// Register a factory under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Fixup> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Registered fixup names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of instances created so far.
    pub fn instance_count(&self) -> usize {
        self.instances.read().map(|i| i.len()).unwrap_or(0)
    }

    /// Get the fixup instance for `name`, creating it on first use.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Fixup>> {
        {
            let instances = self
                .instances
                .read()
                .map_err(|e| FixupError::Other(format!("Failed to acquire registry lock: {}", e)))?;
            if let Some(fixup) = instances.get(name) {
                return Ok(fixup.clone());
            }
        }

        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| FixupError::UnknownFixup {
                name: name.to_string(),
            })?;

        let mut instances = self
            .instances
            .write()
            .map_err(|e| FixupError::Other(format!("Failed to acquire registry lock: {}", e)))?;
        let fixup = instances
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating fixup instance {}", name);
                factory()
            })
            .clone();
        Ok(fixup)
    }
}
