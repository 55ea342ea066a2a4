// Copyright (c) 2025 - Cowboy AI, Inc.
//! Shared Output Table
//!
//! Holds every resource's lifecycle status and, once materialized, its output
//! attributes. Each resource has exactly one writer (its synthesis task);
//! readers wait on a watch channel until the status becomes terminal.
//!
//! Outputs are written before the status flips to `Materialized`, so a reader
//! that observes `Materialized` always finds the outputs present.

use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::watch;
use tracing::warn;

use crate::domain::LogicalId;
use crate::errors::{StackError, StackResult};
use crate::provider::Outputs;
use crate::resolver::MaterializedOutputs;
use crate::state_machine::{LifecycleEvent, ResourceStatus, StateMachine};

#[derive(Debug)]
struct Slot {
    status: watch::Sender<ResourceStatus>,
    outputs: OnceLock<Outputs>,
}

/// Status and outputs for every resource in a synthesis run
#[derive(Debug)]
pub struct OutputTable {
    slots: HashMap<LogicalId, Slot>,
}

impl OutputTable {
    /// Table with every id in `Pending`
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a LogicalId>) -> Self {
        let slots = ids
            .into_iter()
            .map(|id| {
                let (status, _) = watch::channel(ResourceStatus::Pending);
                (
                    id.clone(),
                    Slot {
                        status,
                        outputs: OnceLock::new(),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    fn slot(&self, id: &LogicalId) -> StackResult<&Slot> {
        self.slots
            .get(id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }

    /// Current status
    pub fn status(&self, id: &LogicalId) -> StackResult<ResourceStatus> {
        Ok(*self.slot(id)?.status.borrow())
    }

    /// Apply a lifecycle event through the state machine
    pub fn transition(&self, id: &LogicalId, event: LifecycleEvent) -> StackResult<ResourceStatus> {
        let slot = self.slot(id)?;
        let current = *slot.status.borrow();
        let (next, output) = current.transition(&event)?;
        for warning in &output.warnings {
            warn!(resource = %id, from = %current, to = %next, "{}", warning);
        }
        slot.status.send_replace(next);
        Ok(next)
    }

    /// Record outputs and mark the resource materialized
    pub fn materialize(&self, id: &LogicalId, outputs: Outputs) -> StackResult<()> {
        let slot = self.slot(id)?;
        if slot.outputs.set(outputs).is_err() {
            return Err(StackError::Internal(format!(
                "outputs for {} written twice",
                id
            )));
        }
        self.transition(id, LifecycleEvent::Succeed)?;
        Ok(())
    }

    /// Record outputs of a creation that returned after cancellation
    pub fn skip_with_outputs(&self, id: &LogicalId, outputs: Outputs) -> StackResult<()> {
        let slot = self.slot(id)?;
        let _ = slot.outputs.set(outputs);
        self.transition(id, LifecycleEvent::Skip)?;
        Ok(())
    }

    /// Wait until the resource reaches a terminal status
    pub async fn wait_terminal(&self, id: &LogicalId) -> StackResult<ResourceStatus> {
        let mut rx = self.slot(id)?.status.subscribe();
        let status = rx
            .wait_for(ResourceStatus::is_terminal)
            .await
            .map_err(|_| StackError::Internal(format!("status channel for {} closed", id)))?;
        Ok(*status)
    }

    /// Outputs, if recorded
    pub fn outputs(&self, id: &LogicalId) -> Option<&Outputs> {
        self.slots.get(id).and_then(|slot| slot.outputs.get())
    }

    /// Outputs of the given ids that materialized
    pub fn snapshot_of<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a LogicalId>,
    ) -> MaterializedOutputs {
        ids.into_iter()
            .filter(|id| matches!(self.status(id), Ok(ResourceStatus::Materialized)))
            .filter_map(|id| self.outputs(id).map(|o| (id.clone(), o.clone())))
            .collect()
    }
}
