// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Domain Models
//!
//! Value objects and entities shared by every layer of the engine.
//!
//! # Value Objects with Invariants
//!
//! - [`LogicalId`] - Stack-unique resource id (CloudFormation logical-id rules)
//! - [`Reference`] - Weak pointer to another resource's output attribute
//! - [`PropertyValue`] - Literal, reference, list, map or join
//! - [`ResourceKind`] - Resource taxonomy with capabilities
//!
//! # Entities
//!
//! - [`Resource`] - Declared resource with properties and dependencies
//! - [`Policy`] - Named policy per principal holding merged statements

pub mod logical_id;
pub mod policy;
pub mod property;
pub mod resource;
pub mod resource_kind;

pub use logical_id::{LogicalId, LogicalIdError};
pub use policy::{Effect, Grant, GrantScope, Policy, PolicyStatement};
pub use property::{attr, Properties, PropertyValue, Reference};
pub use resource::{Resource, ResourceHandle};
pub use resource_kind::{Access, Capability, ResourceKind};
