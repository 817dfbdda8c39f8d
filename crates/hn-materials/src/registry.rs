//! Explicit material registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog;
use crate::error::{MaterialError, MaterialResult};
use crate::material::Material;

/// Registry of named materials.
///
/// Blocks and fluxes resolve their materials from a registry at construction
/// and keep an `Arc<Material>`; independent problems can use independent
/// registries in the same process.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: HashMap<String, Arc<Material>>,
}

impl MaterialRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for material in catalog::all() {
            registry.insert(material);
        }
        registry
    }

    /// Insert or replace a material, returning the shared handle.
    pub fn insert(&mut self, material: Material) -> Arc<Material> {
        let handle = Arc::new(material);
        self.materials
            .insert(handle.name.clone(), Arc::clone(&handle));
        handle
    }

    /// Look up a material by name.
    pub fn get(&self, name: &str) -> MaterialResult<Arc<Material>> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| MaterialError::UnknownMaterial {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    /// Registered names, sorted for stable output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.materials.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
