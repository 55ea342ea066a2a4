// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Registry
//!
//! Holds typed resource declarations in declaration order. Declaration
//! order is the tie-break for topological sorting, so the registry never
//! reorders entries. No network calls happen here.

use indexmap::IndexMap;
use tracing::debug;

use crate::domain::{
    LogicalId, Properties, PropertyValue, Reference, Resource, ResourceHandle, ResourceKind,
};
use crate::errors::{StackError, StackResult};

/// Insertion-ordered registry of resource declarations
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: IndexMap<LogicalId, Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource
    ///
    /// # Errors
    /// - `InvalidLogicalId` if `id` is not a valid logical id
    /// - `DuplicateId` if `id` is already declared
    pub fn declare(
        &mut self,
        kind: ResourceKind,
        id: &str,
        properties: Properties,
    ) -> StackResult<ResourceHandle> {
        let id = LogicalId::new(id)?;

        if self.resources.contains_key(&id) {
            return Err(StackError::DuplicateId(id));
        }

        debug!(resource = %id, kind = %kind, "Declared resource");
        self.resources
            .insert(id.clone(), Resource::new(id.clone(), kind, properties));

        Ok(ResourceHandle::new(id, kind))
    }

    /// Reference to an output attribute of a declared resource
    pub fn get_output(&self, id: &str, attribute: &str) -> StackResult<PropertyValue> {
        let resource = self.lookup(id)?;
        Ok(PropertyValue::Ref(Reference::new(
            resource.id.clone(),
            attribute,
        )))
    }

    /// Handle for a declared resource
    pub fn handle(&self, id: &str) -> StackResult<ResourceHandle> {
        let resource = self.lookup(id)?;
        Ok(ResourceHandle::new(resource.id.clone(), resource.kind))
    }

    /// Record an explicit ordering dependency `resource` → after `dependency`
    pub fn depends_on(&mut self, resource: &str, dependency: &str) -> StackResult<()> {
        let dependency = self.lookup(dependency)?.id.clone();
        let entry = self.lookup_mut(resource)?;

        if !entry.depends_on.contains(&dependency) {
            entry.depends_on.push(dependency);
        }
        Ok(())
    }

    /// Set (or replace) a single property on a declared resource
    pub fn set_property(
        &mut self,
        resource: &str,
        name: impl Into<String>,
        value: PropertyValue,
    ) -> StackResult<()> {
        self.lookup_mut(resource)?
            .properties
            .insert(name.into(), value);
        Ok(())
    }

    pub fn get(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &LogicalId) -> bool {
        self.resources.contains_key(id)
    }

    /// Declaration index of a resource
    pub fn index_of(&self, id: &LogicalId) -> Option<usize> {
        self.resources.get_index_of(id)
    }

    /// Resources in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn lookup(&self, id: &str) -> StackResult<&Resource> {
        self.resources
            .get(id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }

    fn lookup_mut(&mut self, id: &str) -> StackResult<&mut Resource> {
        self.resources
            .get_mut(id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }
}
