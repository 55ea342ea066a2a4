// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Declaration Surface
//!
//! A [`Stack`] is the ordered set of resource declarations plus the side
//! resources that travel with them: tags, named outputs and grants.
//!
//! # Lifecycle
//!
//! ```text
//! Open ──synthesize──> Sealed ──synthesize──> Sealed
//! ```
//!
//! An open stack accepts declarations. Synthesis seals it once the graph and
//! providers check out, so a stack rejected for a cycle stays open. A sealed
//! stack refuses further declarations but may be synthesized again.

use indexmap::IndexMap;
use serde_json::json;
use std::collections::BTreeMap;

use crate::config::Tags;
use crate::domain::{
    attr, Access, Capability, Grant, GrantScope, LogicalId, Properties, PropertyValue, Reference,
    Resource, ResourceHandle, ResourceKind,
};
use crate::errors::{StackError, StackResult};
use crate::registry::ResourceRegistry;

/// Stack lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Open,
    Sealed,
}

/// Declarative collection of resources
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    registry: ResourceRegistry,
    state: StackState,
    tags: Tags,
    resource_tags: BTreeMap<LogicalId, Tags>,
    outputs: IndexMap<String, Reference>,
    grants: Vec<Grant>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: ResourceRegistry::new(),
            state: StackState::Open,
            tags: Tags::new(),
            resource_tags: BTreeMap::new(),
            outputs: IndexMap::new(),
            grants: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StackState {
        self.state
    }

    pub fn is_sealed(&self) -> bool {
        self.state == StackState::Sealed
    }

    pub(crate) fn seal(&mut self) {
        self.state = StackState::Sealed;
    }

    fn ensure_open(&self) -> StackResult<()> {
        match self.state {
            StackState::Open => Ok(()),
            StackState::Sealed => Err(StackError::StackSealed(self.name.clone())),
        }
    }

    fn require(&self, id: &str, capability: Capability) -> StackResult<ResourceHandle> {
        let handle = self.registry.handle(id)?;
        if !handle.kind().supports(capability) {
            return Err(StackError::MissingCapability {
                resource: handle.id().clone(),
                kind: handle.kind(),
                capability: capability.as_str(),
            });
        }
        Ok(handle)
    }

    /// Declare a resource
    pub fn declare(
        &mut self,
        kind: ResourceKind,
        id: &str,
        properties: Properties,
    ) -> StackResult<ResourceHandle> {
        self.ensure_open()?;
        self.registry.declare(kind, id, properties)
    }

    /// Reference to an output attribute of a declared resource
    pub fn get_output(&self, id: &str, attribute: &str) -> StackResult<PropertyValue> {
        self.registry.get_output(id, attribute)
    }

    pub fn handle(&self, id: &str) -> StackResult<ResourceHandle> {
        self.registry.handle(id)
    }

    /// Order `resource` after `dependency`
    pub fn depends_on(&mut self, resource: &str, dependency: &str) -> StackResult<()> {
        self.ensure_open()?;
        self.registry.depends_on(resource, dependency)
    }

    pub fn set_property(
        &mut self,
        resource: &str,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> StackResult<()> {
        self.ensure_open()?;
        self.registry.set_property(resource, name, value.into())
    }

    /// Tag every taggable resource in the stack
    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> StackResult<()> {
        self.ensure_open()?;
        self.tags.insert(key.into(), value.into());
        Ok(())
    }

    /// Tag a single resource
    pub fn tag_resource(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> StackResult<()> {
        self.ensure_open()?;
        let handle = self.require(id, Capability::Taggable)?;
        self.resource_tags
            .entry(handle.id().clone())
            .or_default()
            .insert(key.into(), value.into());
        Ok(())
    }

    /// Expose an output attribute under a stack-level name
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        id: &str,
        attribute: &str,
    ) -> StackResult<()> {
        self.ensure_open()?;
        let handle = self.registry.handle(id)?;
        self.outputs
            .insert(name.into(), Reference::new(handle.id().clone(), attribute));
        Ok(())
    }

    /// Grant `principal` the least-privilege actions for `access` on `target`
    pub fn grant(&mut self, principal: &str, target: &str, access: Access) -> StackResult<()> {
        let target_kind = self.require(target, Capability::Grantable)?.kind();
        let actions = target_kind.grant_actions(access).ok_or_else(|| {
            StackError::Configuration(format!(
                "{:?} access is not defined for {}",
                access, target_kind
            ))
        })?;
        self.grant_with(principal, target, actions.iter().copied(), GrantScope::Arn)
    }

    /// Grant explicit actions with an explicit resource scope
    pub fn grant_with<A>(
        &mut self,
        principal: &str,
        target: &str,
        actions: A,
        scope: GrantScope,
    ) -> StackResult<()>
    where
        A: IntoIterator,
        A::Item: Into<String>,
    {
        self.ensure_open()?;
        let principal = self.registry.handle(principal)?;
        let target = self.registry.handle(target)?;

        let grant = Grant {
            principal: principal.id().clone(),
            target: target.id().clone(),
            actions: actions.into_iter().map(Into::into).collect(),
            scope,
        };
        if !self.grants.contains(&grant) {
            self.grants.push(grant);
        }
        Ok(())
    }

    /// Allow `peer` to reach `target` on a TCP port
    ///
    /// Declares a security-group ingress rule referencing both resources'
    /// security groups; the rule therefore orders after both.
    pub fn connect(&mut self, peer: &str, target: &str, port: u16) -> StackResult<ResourceHandle> {
        let peer = self.require(peer, Capability::Connectable)?;
        let target = self.require(target, Capability::Connectable)?;

        let mut properties = Properties::new();
        properties.insert("GroupId".into(), target.output(attr::SECURITY_GROUP_ID));
        properties.insert(
            "SourceSecurityGroupId".into(),
            peer.output(attr::SECURITY_GROUP_ID),
        );
        properties.insert("IpProtocol".into(), "tcp".into());
        properties.insert("FromPort".into(), json!(port).into());
        properties.insert("ToPort".into(), json!(port).into());

        let id = format!("{}From{}Ingress", target.id(), peer.id());
        self.declare(ResourceKind::SecurityGroupIngress, &id, properties)
    }

    /// Declarations in order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.registry.iter()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    pub fn outputs(&self) -> &IndexMap<String, Reference> {
        &self.outputs
    }

    /// Stack-level tags
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Tags for a resource: `base` overlaid with stack tags and its own tags
    ///
    /// Returns an empty set for kinds that are not taggable.
    pub fn tags_for(&self, resource: &Resource, base: &Tags) -> Tags {
        if !resource.kind.supports(Capability::Taggable) {
            return Tags::new();
        }
        let mut tags = base.clone();
        tags.extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(own) = self.resource_tags.get(&resource.id) {
            tags.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        tags
    }
}
