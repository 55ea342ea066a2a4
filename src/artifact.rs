// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesized Stack Artifact
//!
//! The result of a synthesis run: one record per declared resource in
//! topological order, the resolved stack outputs, the attached policies and
//! the grants that could not be attached.
//! Artifacts serialize to JSON and can be compared with [`SynthesizedStack::diff`]
//! to detect drift between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::config::Tags;
use crate::domain::{LogicalId, Policy, ResourceKind};
use crate::errors::StackResult;
use crate::provider::Outputs;
use crate::resolver::ResolvedProperties;
use crate::state_machine::ResourceStatus;

/// Synthesis result for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub resource_id: LogicalId,
    pub kind: ResourceKind,
    /// Properties as handed to the provider; absent if never resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_properties: Option<ResolvedProperties>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Outputs::is_empty")]
    pub outputs: Outputs,
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Difference between two artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Drift {
    /// Present now, absent before
    Added { resource: LogicalId },
    /// Present before, absent now
    Removed { resource: LogicalId },
    /// Present in both with differing fields
    Changed {
        resource: LogicalId,
        fields: Vec<String>,
    },
}

/// Grant that was declared but never attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedGrant {
    pub principal: LogicalId,
    pub target: LogicalId,
    pub actions: BTreeSet<String>,
    pub error: String,
}

/// Serializable result of a synthesis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedStack {
    pub stack: String,
    pub run_id: Uuid,
    pub synthesized_at: DateTime<Utc>,
    /// Records in topological order
    pub records: Vec<ResourceRecord>,
    /// Resolved stack outputs
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    /// Grants left unattached, ordered by principal then target
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_grants: Vec<FailedGrant>,
}

impl SynthesizedStack {
    pub fn record(&self, id: &str) -> Option<&ResourceRecord> {
        self.records.iter().find(|r| r.resource_id.as_str() == id)
    }

    pub fn status(&self, id: &str) -> Option<ResourceStatus> {
        self.record(id).map(|r| r.status)
    }

    /// Resource ids in materialization order
    pub fn order(&self) -> Vec<&LogicalId> {
        self.records.iter().map(|r| &r.resource_id).collect()
    }

    pub fn statuses(&self) -> BTreeMap<&LogicalId, ResourceStatus> {
        self.records
            .iter()
            .map(|r| (&r.resource_id, r.status))
            .collect()
    }

    /// Whether every resource materialized
    pub fn is_complete(&self) -> bool {
        self.records.iter().all(|r| r.status.is_materialized())
    }

    pub fn to_json(&self) -> StackResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> StackResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compare against a previous artifact
    ///
    /// Run id and timestamp are ignored. Changed records list the differing
    /// field names.
    pub fn diff(&self, previous: &SynthesizedStack) -> Vec<Drift> {
        let before: BTreeMap<&LogicalId, &ResourceRecord> = previous
            .records
            .iter()
            .map(|r| (&r.resource_id, r))
            .collect();
        let current: BTreeSet<&LogicalId> = self.records.iter().map(|r| &r.resource_id).collect();

        let mut drift = Vec::new();
        for record in &self.records {
            match before.get(&record.resource_id) {
                None => drift.push(Drift::Added {
                    resource: record.resource_id.clone(),
                }),
                Some(old) => {
                    let fields = changed_fields(old, record);
                    if !fields.is_empty() {
                        drift.push(Drift::Changed {
                            resource: record.resource_id.clone(),
                            fields,
                        });
                    }
                }
            }
        }

        for old in &previous.records {
            if !current.contains(&old.resource_id) {
                drift.push(Drift::Removed {
                    resource: old.resource_id.clone(),
                });
            }
        }
        drift
    }
}

fn changed_fields(old: &ResourceRecord, new: &ResourceRecord) -> Vec<String> {
    let mut fields = Vec::new();
    if old.kind != new.kind {
        fields.push("kind".to_string());
    }
    if old.resolved_properties != new.resolved_properties {
        fields.push("resolvedProperties".to_string());
    }
    if old.tags != new.tags {
        fields.push("tags".to_string());
    }
    if old.outputs != new.outputs {
        fields.push("outputs".to_string());
    }
    if old.status != new.status {
        fields.push("status".to_string());
    }
    if old.error != new.error {
        fields.push("error".to_string());
    }
    fields
}
