// Copyright (c) 2025 - Cowboy AI, Inc.
//! Explicit Teardown
//!
//! Synthesis never rolls back. Teardown is a separate, explicit operation
//! that deletes what an artifact recorded as created, in reverse creation
//! order. A resource the provider reports as missing counts as deleted, and
//! one failed delete does not stop the others.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::artifact::SynthesizedStack;
use crate::domain::{attr, LogicalId};
use crate::errors::StackResult;
use crate::provider::ProviderError;
use crate::synthesizer::Synthesizer;

/// Outcome of a teardown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    /// Deleted resources, in deletion order
    pub deleted: Vec<LogicalId>,
    /// Resources whose deletion failed, with the provider's message
    pub failed: Vec<(LogicalId, String)>,
    /// Resources with no physical id recorded, so nothing to delete
    pub not_created: Vec<LogicalId>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Synthesizer {
    /// Delete every created resource recorded in `artifact`
    ///
    /// Records are visited in reverse order. Only provider lookup can fail the
    /// whole operation; individual delete failures land in the report.
    pub async fn teardown(&self, artifact: &SynthesizedStack) -> StackResult<TeardownReport> {
        let mut report = TeardownReport::default();
        info!(
            stack = %artifact.stack,
            run_id = %artifact.run_id,
            resources = artifact.records.len(),
            "Starting teardown"
        );

        for record in artifact.records.iter().rev() {
            let Some(physical_id) = record.outputs.get(attr::ID) else {
                debug!(resource = %record.resource_id, status = %record.status, "Nothing to delete");
                report.not_created.push(record.resource_id.clone());
                continue;
            };

            let provider = self.providers().get(record.kind)?;
            match provider.delete(record.kind, physical_id).await {
                Ok(()) => {
                    debug!(resource = %record.resource_id, physical_id = %physical_id, "Deleted");
                    report.deleted.push(record.resource_id.clone());
                }
                Err(ProviderError::NotFound(_)) => {
                    debug!(resource = %record.resource_id, "Already deleted");
                    report.deleted.push(record.resource_id.clone());
                }
                Err(err) => {
                    warn!(resource = %record.resource_id, error = %err, "Delete failed, continuing");
                    report
                        .failed
                        .push((record.resource_id.clone(), err.to_string()));
                }
            }
        }

        info!(
            stack = %artifact.stack,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Teardown finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesizerConfig;
    use crate::domain::{Properties, ResourceKind};
    use crate::provider::{InMemoryProvider, ProviderRegistry};
    use crate::stack::Stack;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_teardown_twice_is_clean() {
        let provider = Arc::new(InMemoryProvider::default());
        let synth = Synthesizer::new(
            SynthesizerConfig::default(),
            ProviderRegistry::single(provider.clone()),
        )
        .unwrap();

        let mut stack = Stack::new("s");
        stack.declare(ResourceKind::Topic, "Topic", Properties::new()).unwrap();
        let artifact = synth.synthesize(&mut stack).await.unwrap();

        let first = synth.teardown(&artifact).await.unwrap();
        let second = synth.teardown(&artifact).await.unwrap();

        assert!(first.is_clean());
        assert!(second.is_clean());
        assert_eq!(second.deleted.len(), 1);
        assert_eq!(provider.live_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_failure_does_not_stop_teardown() {
        let provider = Arc::new(
            InMemoryProvider::default().failing_delete("arn:aws:sns:us-east-1:123456789012:b"),
        );
        let synth = Synthesizer::new(
            SynthesizerConfig::default(),
            ProviderRegistry::single(provider.clone()),
        )
        .unwrap();

        let mut stack = Stack::new("s");
        stack.declare(ResourceKind::Topic, "A", Properties::new()).unwrap();
        stack.declare(ResourceKind::Topic, "B", Properties::new()).unwrap();
        stack.declare(ResourceKind::Topic, "C", Properties::new()).unwrap();
        let artifact = synth.synthesize(&mut stack).await.unwrap();

        let report = synth.teardown(&artifact).await.unwrap();
        let deleted: Vec<_> = report.deleted.iter().map(|id| id.as_str()).collect();
        assert_eq!(deleted, vec!["C", "A"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.as_str(), "B");
    }
}
