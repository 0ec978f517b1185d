use crate::id::{FluidTypeId, ItemTypeId};
use crate::resource::{Fluid, Item, Resource, ResourceResolver};
use std::collections::HashMap;

/// Builder for constructing an immutable [`Registry`].
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug)]
pub struct RegistryBuilder<R> {
    names: Vec<String>,
    resources: Vec<R>,
    name_to_index: HashMap<String, usize>,
}

impl<R: Resource> Default for RegistryBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> RegistryBuilder<R> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            resources: Vec::new(),
            name_to_index: HashMap::new(),
        }
    }

    /// Register `resource` under `name`. Names and resources must both be unique.
    pub fn register(&mut self, name: &str, resource: R) -> Result<(), RegistryError> {
        if self.name_to_index.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        if self.resources.contains(&resource) {
            return Err(RegistryError::DuplicateResource(format!("{resource:?}")));
        }
        self.name_to_index.insert(name.to_string(), self.resources.len());
        self.names.push(name.to_string());
        self.resources.push(resource);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Finalize and build the immutable registry.
    pub fn build(self) -> Registry<R> {
        Registry {
            names: self.names,
            resources: self.resources,
            name_to_index: self.name_to_index,
        }
    }
}

impl RegistryBuilder<Item> {
    /// Register a new item type with the next free ID. Returns the item.
    pub fn register_item(&mut self, name: &str, max_stack_size: u32) -> Result<Item, RegistryError> {
        let item = Item::new(ItemTypeId(self.len() as u32), max_stack_size);
        self.register(name, item)?;
        Ok(item)
    }
}

impl RegistryBuilder<Fluid> {
    /// Register a new fluid type with the next free ID. Returns the fluid.
    pub fn register_fluid(&mut self, name: &str) -> Result<Fluid, RegistryError> {
        let fluid = Fluid(FluidTypeId(self.len() as u32));
        self.register(name, fluid)?;
        Ok(fluid)
    }
}

/// Immutable name <-> resource table. Frozen after build().
#[derive(Debug, Clone)]
pub struct Registry<R> {
    names: Vec<String>,
    resources: Vec<R>,
    name_to_index: HashMap<String, usize>,
}

impl<R: Resource> Registry<R> {
    pub fn get(&self, name: &str) -> Option<&R> {
        self.name_to_index.get(name).map(|&i| &self.resources[i])
    }

    pub fn name_of(&self, resource: &R) -> Option<&str> {
        self.resources
            .iter()
            .position(|r| r == resource)
            .map(|i| self.names[i].as_str())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.names.iter().map(String::as_str).zip(&self.resources)
    }
}

impl<R: Resource> ResourceResolver<R> for Registry<R> {
    fn resource_key(&self, resource: &R) -> Option<String> {
        self.name_of(resource).map(str::to_string)
    }

    fn resolve(&self, key: &str) -> Option<R> {
        self.get(key).cloned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate resource name: {0}")]
    DuplicateName(String),
    #[error("resource registered twice: {0}")]
    DuplicateResource(String),
}
