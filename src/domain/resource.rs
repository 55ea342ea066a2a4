// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Declaration Entity

use serde::{Deserialize, Serialize};

use super::property::{attr, Properties, PropertyValue, Reference};
use super::{LogicalId, ResourceKind};

/// Declared unit of infrastructure
///
/// Mutable only while its stack is open. Once synthesis starts the
/// declaration is frozen; the materialized result lives in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Stack-unique logical id
    pub id: LogicalId,
    /// Resource kind used for provider dispatch
    pub kind: ResourceKind,
    /// Declared properties, possibly holding references
    pub properties: Properties,
    /// Explicit ordering dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
}

impl Resource {
    /// Create a new resource declaration
    pub fn new(id: LogicalId, kind: ResourceKind, properties: Properties) -> Self {
        Self {
            id,
            kind,
            properties,
            depends_on: Vec::new(),
        }
    }

    /// Ids of every resource this one needs, explicit first, without duplicates
    pub fn dependency_ids(&self) -> Vec<LogicalId> {
        let mut ids: Vec<LogicalId> = Vec::new();
        let implied = self
            .properties
            .values()
            .flat_map(|v| v.references())
            .map(|r| &r.resource);

        for dep in self.depends_on.iter().chain(implied) {
            if !ids.contains(dep) {
                ids.push(dep.clone());
            }
        }
        ids
    }

    /// Every reference held in the property set
    pub fn references(&self) -> Vec<&Reference> {
        self.properties
            .values()
            .flat_map(PropertyValue::references)
            .collect()
    }
}

/// Lightweight handle returned by `declare`
///
/// Used to build references to the declared resource's outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: LogicalId,
    kind: ResourceKind,
}

impl ResourceHandle {
    pub(crate) fn new(id: LogicalId, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Reference to an output attribute of this resource
    pub fn output(&self, attribute: impl Into<String>) -> PropertyValue {
        PropertyValue::Ref(Reference::new(self.id.clone(), attribute))
    }

    /// Reference to this resource's ARN
    pub fn arn(&self) -> PropertyValue {
        self.output(attr::ARN)
    }

    /// Reference to this resource's physical id
    pub fn physical_id(&self) -> PropertyValue {
        self.output(attr::ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    #[test]
    fn test_dependency_ids_merge_explicit_and_implied() {
        let mut props = IndexMap::new();
        props.insert(
            "Role".to_string(),
            PropertyValue::Ref(Reference::new(id("Role"), attr::ARN)),
        );
        props.insert(
            "DeadLetterTarget".to_string(),
            PropertyValue::Ref(Reference::new(id("Topic"), attr::ARN)),
        );

        let mut function = Resource::new(id("Function"), ResourceKind::Function, props);
        function.depends_on.push(id("Role"));

        assert_eq!(function.dependency_ids(), vec![id("Role"), id("Topic")]);
        assert_eq!(function.references().len(), 2);
    }

    #[test]
    fn test_handle_builds_references() {
        let handle = ResourceHandle::new(id("Api"), ResourceKind::RestApi);
        assert_eq!(
            handle.arn(),
            PropertyValue::Ref(Reference::new(id("Api"), "Arn"))
        );
    }
}
