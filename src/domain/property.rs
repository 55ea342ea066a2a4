// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property Values and References
//!
//! A resource's properties may hold literal values or [`Reference`]s to
//! another resource's output attribute. References are weak links (id plus
//! attribute name), never owning pointers, so a declaration can be
//! serialized and inspected without live resource handles.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::LogicalId;

/// Well-known output attribute names
pub mod attr {
    /// Amazon Resource Name
    pub const ARN: &str = "Arn";
    /// Provider-assigned physical id
    pub const ID: &str = "Id";
    /// Human-readable resource name
    pub const NAME: &str = "Name";
    /// ARN usable as `SourceArn` for execute-api permissions
    pub const EXECUTE_API_ARN: &str = "ExecuteApiArn";
    /// Root resource of a REST API
    pub const ROOT_RESOURCE_ID: &str = "RootResourceId";
    /// Generated alias target of a custom domain name
    pub const DISTRIBUTION_DOMAIN_NAME: &str = "DistributionDomainName";
    /// Hosted zone of the alias target
    pub const DISTRIBUTION_HOSTED_ZONE_ID: &str = "DistributionHostedZoneId";
    /// Network endpoint of a cache or database
    pub const ENDPOINT: &str = "Endpoint";
    /// Security group attached to a connectable resource
    pub const SECURITY_GROUP_ID: &str = "SecurityGroupId";
    /// Generated API key value
    pub const VALUE: &str = "Value";
}

/// Pointer to another resource's output attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    /// Referenced resource
    pub resource: LogicalId,
    /// Output attribute of the referenced resource
    pub attribute: String,
}

impl Reference {
    /// Create a reference
    pub fn new(resource: LogicalId, attribute: impl Into<String>) -> Self {
        Self {
            resource,
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// Ordered property map
pub type Properties = IndexMap<String, PropertyValue>;

/// Declared property value, possibly unresolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// Concrete JSON value
    Literal(serde_json::Value),
    /// Output attribute of another resource
    Ref(Reference),
    /// List of values
    List(Vec<PropertyValue>),
    /// Nested map of values
    Map(IndexMap<String, PropertyValue>),
    /// String concatenation of parts
    Join {
        separator: String,
        parts: Vec<PropertyValue>,
    },
}

impl PropertyValue {
    /// Literal string value
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(serde_json::Value::String(value.into()))
    }

    /// Join parts without separator
    pub fn concat(parts: Vec<PropertyValue>) -> Self {
        Self::Join {
            separator: String::new(),
            parts,
        }
    }

    /// Collect every reference contained in this value, depth first
    pub fn references(&self) -> Vec<&Reference> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Literal(_) => {}
            Self::Ref(reference) => out.push(reference),
            Self::List(items) | Self::Join { parts: items, .. } => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.collect_references(out);
                }
            }
        }
    }

    /// Whether this value contains no references
    pub fn is_resolved(&self) -> bool {
        self.references().is_empty()
    }
}

impl From<Reference> for PropertyValue {
    fn from(reference: Reference) -> Self {
        Self::Ref(reference)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Literal(serde_json::Value::Bool(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Literal(serde_json::Value::from(value))
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Literal(value)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}
