//! Materials and the shared material registry.

use hashbrown::HashMap;
use std::sync::Arc;

use crate::error::{EntityError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bulk material of a body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Registry key.
    pub name: String,
    /// Density (kg/m³).
    pub density: f64,
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Coefficient of restitution in `[0, 1]`.
    pub restitution: f64,
}

impl Material {
    /// Create a material with default contact properties.
    pub fn new(name: impl Into<String>, density: f64) -> Result<Self> {
        let material = Self {
            name: name.into(),
            density,
            friction: 0.5,
            restitution: 0.0,
        };
        material.validate()?;
        Ok(material)
    }

    /// Set contact properties.
    #[must_use]
    pub fn with_contact(mut self, friction: f64, restitution: f64) -> Self {
        self.friction = friction;
        self.restitution = restitution;
        self
    }

    /// Structural steel.
    #[must_use]
    pub fn steel() -> Self {
        Self::preset("steel", 7850.0, 0.6, 0.1)
    }

    /// Aluminium alloy.
    #[must_use]
    pub fn aluminium() -> Self {
        Self::preset("aluminium", 2700.0, 0.6, 0.1)
    }

    /// High-density polyethylene; floats in water.
    #[must_use]
    pub fn polyethylene() -> Self {
        Self::preset("polyethylene", 950.0, 0.3, 0.2)
    }

    /// Neutrally buoyant in fresh water.
    #[must_use]
    pub fn neutral() -> Self {
        Self::preset("neutral", 1000.0, 0.5, 0.0)
    }

    /// Synthetic tether rope, slightly negative in water.
    #[must_use]
    pub fn rope() -> Self {
        Self::preset("rope", 1140.0, 0.8, 0.0)
    }

    fn preset(name: &str, density: f64, friction: f64, restitution: f64) -> Self {
        Self {
            name: name.to_string(),
            density,
            friction,
            restitution,
        }
    }

    /// Validate the properties.
    pub fn validate(&self) -> Result<()> {
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(EntityError::invalid_material(format!(
                "{}: density must be positive, got {}",
                self.name, self.density
            )));
        }
        if !(self.friction.is_finite() && self.friction >= 0.0) {
            return Err(EntityError::invalid_material(format!(
                "{}: friction must be non-negative, got {}",
                self.name, self.friction
            )));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(EntityError::invalid_material(format!(
                "{}: restitution must be in [0, 1], got {}",
                self.name, self.restitution
            )));
        }
        Ok(())
    }
}

/// Named, shared materials.
///
/// Entities hold `Arc<Material>` so a material outlives the registry that
/// handed it out.
#[derive(Debug, Clone)]
pub struct MaterialRegistry {
    materials: HashMap<String, Arc<Material>>,
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::with_presets()
    }
}

impl MaterialRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
        }
    }

    /// Registry holding every preset material.
    #[must_use]
    pub fn with_presets() -> Self {
        let mut registry = Self::new();
        for material in [
            Material::steel(),
            Material::aluminium(),
            Material::polyethylene(),
            Material::neutral(),
            Material::rope(),
        ] {
            registry
                .materials
                .insert(material.name.clone(), Arc::new(material));
        }
        registry
    }

    /// Add or replace a material, returning the shared handle.
    pub fn insert(&mut self, material: Material) -> Result<Arc<Material>> {
        material.validate()?;
        let shared = Arc::new(material);
        self.materials
            .insert(shared.name.clone(), Arc::clone(&shared));
        Ok(shared)
    }

    /// Look up a material by name.
    pub fn get(&self, name: &str) -> Result<Arc<Material>> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| EntityError::UnknownMaterial(name.to_string()))
    }

    /// Check if a material is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    /// Number of materials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.materials.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_valid() {
        let registry = MaterialRegistry::with_presets();
        assert_eq!(
            registry.names(),
            vec!["aluminium", "neutral", "polyethylene", "rope", "steel"]
        );
        for name in registry.names() {
            assert!(registry.get(name).unwrap().validate().is_ok());
        }
    }

    #[test]
    fn test_unknown_material() {
        let registry = MaterialRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get("unobtainium"),
            Err(EntityError::UnknownMaterial(name)) if name == "unobtainium"
        ));
    }

    #[test]
    fn test_insert_and_share() {
        let mut registry = MaterialRegistry::new();
        let foam = registry
            .insert(Material::new("foam", 200.0).unwrap().with_contact(0.9, 0.3))
            .unwrap();
        let again = registry.get("foam").unwrap();
        assert!(Arc::ptr_eq(&foam, &again));

        drop(registry);
        assert_eq!(foam.density, 200.0);
    }

    #[test]
    fn test_invalid_material() {
        assert!(Material::new("void", 0.0).is_err());
        let mut registry = MaterialRegistry::new();
        let bouncy = Material::neutral().with_contact(0.5, 1.5);
        assert!(registry.insert(bouncy).is_err());
        assert!(!registry.contains("neutral"));
    }
}
