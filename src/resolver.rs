// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reference Resolver
//!
//! Pure substitution of [`Reference`]s with the concrete output values
//! captured when the referenced resource materialized.
//!
//! # Design Principles
//!
//! - **Pure Functions**: the same outputs table always yields the same value
//! - **Fail Loudly**: resolving before the target materialized is an ordering
//!   bug, reported as `UnresolvedDependency`

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::{LogicalId, Properties, PropertyValue, Reference};
use crate::errors::{StackError, StackResult};
use crate::provider::Outputs;

/// Outputs of every materialized resource, keyed by logical id
pub type MaterializedOutputs = HashMap<LogicalId, Outputs>;

/// Fully resolved property map, in declaration order
pub type ResolvedProperties = IndexMap<String, Value>;

/// Resolve a single reference held by `owner`
pub fn resolve(
    owner: &LogicalId,
    reference: &Reference,
    outputs: &MaterializedOutputs,
) -> StackResult<Value> {
    outputs
        .get(&reference.resource)
        .and_then(|o| o.get(&reference.attribute))
        .map(|v| Value::String(v.clone()))
        .ok_or_else(|| StackError::UnresolvedDependency {
            resource: owner.clone(),
            target: reference.resource.clone(),
            attribute: reference.attribute.clone(),
        })
}

/// Resolve a property value, recursing into lists, maps and joins
pub fn resolve_value(
    owner: &LogicalId,
    value: &PropertyValue,
    outputs: &MaterializedOutputs,
) -> StackResult<Value> {
    match value {
        PropertyValue::Literal(v) => Ok(v.clone()),
        PropertyValue::Ref(reference) => resolve(owner, reference, outputs),
        PropertyValue::List(items) => items
            .iter()
            .map(|item| resolve_value(owner, item, outputs))
            .collect::<StackResult<Vec<_>>>()
            .map(Value::Array),
        PropertyValue::Map(entries) => {
            let mut map = serde_json::Map::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key.clone(), resolve_value(owner, item, outputs)?);
            }
            Ok(Value::Object(map))
        }
        PropertyValue::Join { separator, parts } => {
            let parts = parts
                .iter()
                .map(|part| resolve_value(owner, part, outputs).map(|v| join_fragment(&v)))
                .collect::<StackResult<Vec<_>>>()?;
            Ok(Value::String(parts.join(separator)))
        }
    }
}

/// Resolve every property of a resource
pub fn resolve_properties(
    owner: &LogicalId,
    properties: &Properties,
    outputs: &MaterializedOutputs,
) -> StackResult<ResolvedProperties> {
    properties
        .iter()
        .map(|(name, value)| Ok((name.clone(), resolve_value(owner, value, outputs)?)))
        .collect()
}

fn join_fragment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
