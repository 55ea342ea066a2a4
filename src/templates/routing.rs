// Copyright (c) 2025 - Cowboy AI, Inc.
//! DNS Routing Template
//!
//! A hosted zone with routing-policy record sets for one record name:
//! weighted CNAMEs for A/B splits and geolocation A records with an optional
//! default. Every routed record carries a set identifier, which must be
//! unique within the zone.
//!
//! ```text
//! Zone ──┬── WeightedRecord0..n   (CNAME, Weight)
//!        ├── GeoRecord0..n        (A, GeoLocation)
//!        └── RecordCertificate    (DNS validated, optional)
//! ```

use serde_json::{json, Value};
use std::collections::HashSet;

use super::{map, props};
use crate::config::SynthesizerConfig;
use crate::domain::{attr, PropertyValue, ResourceKind};
use crate::errors::{StackError, StackResult};
use crate::stack::Stack;

/// Where a geolocation record applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoLocation {
    /// Two-letter continent code, e.g. `EU`
    Continent(String),
    /// ISO country code, e.g. `DE`
    Country(String),
    Subdivision { country: String, subdivision: String },
    /// Matches queries no other location covers
    Default,
}

impl GeoLocation {
    fn to_value(&self) -> Value {
        match self {
            Self::Continent(code) => json!({ "ContinentCode": code }),
            Self::Country(code) => json!({ "CountryCode": code }),
            Self::Subdivision {
                country,
                subdivision,
            } => json!({ "CountryCode": country, "SubdivisionCode": subdivision }),
            Self::Default => json!({ "CountryCode": "*" }),
        }
    }
}

/// CNAME answered for a share of queries
#[derive(Debug, Clone)]
pub struct WeightedRecord {
    pub set_identifier: String,
    /// 0 to 255; a zero weight receives no traffic
    pub weight: u8,
    pub target: String,
}

/// A record answered for queries from a location
#[derive(Debug, Clone)]
pub struct GeoRecord {
    pub set_identifier: String,
    pub location: GeoLocation,
    pub addresses: Vec<String>,
}

/// Inputs for [`routing_stack`]
#[derive(Debug, Clone)]
pub struct RoutingProps {
    pub zone_name: String,
    /// Fully qualified name shared by every routed record
    pub record_name: String,
    pub ttl: u32,
    pub weighted: Vec<WeightedRecord>,
    pub geolocation: Vec<GeoRecord>,
    /// Issue a certificate for `record_name`, validated through the zone
    pub issue_certificate: bool,
}

impl RoutingProps {
    fn validate(&self) -> StackResult<()> {
        let mut seen = HashSet::new();
        let identifiers = self
            .weighted
            .iter()
            .map(|r| &r.set_identifier)
            .chain(self.geolocation.iter().map(|r| &r.set_identifier));
        for id in identifiers {
            if !seen.insert(id) {
                return Err(StackError::Configuration(format!(
                    "set identifier '{}' is used twice for {}",
                    id, self.record_name
                )));
            }
        }

        if !self.weighted.is_empty() && self.weighted.iter().all(|r| r.weight == 0) {
            return Err(StackError::Configuration(format!(
                "weighted records for {} all have weight 0",
                self.record_name
            )));
        }

        if let Some(empty) = self.geolocation.iter().find(|r| r.addresses.is_empty()) {
            return Err(StackError::Configuration(format!(
                "geolocation record '{}' has no addresses",
                empty.set_identifier
            )));
        }
        Ok(())
    }
}

/// Declare the routing stack
pub fn routing_stack(p: &RoutingProps, config: &SynthesizerConfig) -> StackResult<Stack> {
    p.validate()?;

    let env = config.environment.as_str();
    let project = config.project.as_str();
    let mut stack = Stack::new(format!("{}-{}-routing", env, project));

    let zone = stack.declare(
        ResourceKind::HostedZone,
        "Zone",
        props([
            ("Name", p.zone_name.clone().into()),
            (
                "HostedZoneConfig",
                json!({ "Comment": format!("{env} {project} routing") }).into(),
            ),
        ]),
    )?;

    for (i, record) in p.weighted.iter().enumerate() {
        stack.declare(
            ResourceKind::RecordSet,
            &format!("WeightedRecord{i}"),
            props([
                ("HostedZoneId", zone.physical_id()),
                ("Name", p.record_name.clone().into()),
                ("Type", "CNAME".into()),
                ("TTL", json!(p.ttl).into()),
                ("SetIdentifier", record.set_identifier.clone().into()),
                ("Weight", json!(record.weight).into()),
                (
                    "ResourceRecords",
                    PropertyValue::List(vec![record.target.clone().into()]),
                ),
            ]),
        )?;
    }

    for (i, record) in p.geolocation.iter().enumerate() {
        stack.declare(
            ResourceKind::RecordSet,
            &format!("GeoRecord{i}"),
            props([
                ("HostedZoneId", zone.physical_id()),
                ("Name", p.record_name.clone().into()),
                ("Type", "A".into()),
                ("TTL", json!(p.ttl).into()),
                ("SetIdentifier", record.set_identifier.clone().into()),
                ("GeoLocation", record.location.to_value().into()),
                ("ResourceRecords", json!(record.addresses).into()),
            ]),
        )?;
    }

    if p.issue_certificate {
        stack.declare(
            ResourceKind::Certificate,
            "RecordCertificate",
            props([
                ("DomainName", p.record_name.clone().into()),
                ("ValidationMethod", "DNS".into()),
                (
                    "DomainValidationOptions",
                    PropertyValue::List(vec![map([
                        ("DomainName", p.record_name.clone().into()),
                        ("HostedZoneId", zone.physical_id()),
                    ])]),
                ),
            ]),
        )?;
        stack.add_output("CertificateArn", "RecordCertificate", attr::ARN)?;
    }

    stack.add_output("HostedZoneId", "Zone", attr::ID)?;
    stack.add_output("NameServers", "Zone", "NameServers")?;

    Ok(stack)
}
