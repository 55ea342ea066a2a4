// Copyright (c) 2025 - Cowboy AI, Inc.
//! Materialization Lifecycle State Machine
//!
//! # States
//!
//! - Pending: declared, waiting for dependencies
//! - Materializing: provider creation call in flight
//! - Materialized: created, outputs recorded (terminal)
//! - Failed: provider creation failed after retries (terminal)
//! - Skipped: a dependency did not materialize, or synthesis was cancelled (terminal)
//!
//! # Inputs
//!
//! - Begin: Pending → Materializing
//! - Succeed: Materializing → Materialized
//! - Fail: Materializing → Failed
//! - Skip: Pending → Skipped, Materializing → Skipped (cancelled in flight)

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Per-resource synthesis status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Materializing,
    Materialized,
    Failed,
    Skipped,
}

impl ResourceStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Materialized | Self::Failed | Self::Skipped)
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self, Self::Materialized)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Materializing => "Materializing",
            Self::Materialized => "Materialized",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
        };
        f.write_str(s)
    }
}

/// Lifecycle input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Begin,
    Succeed,
    Fail,
    Skip,
}

/// Transition output
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionOutput {
    /// Warnings generated during transition
    pub warnings: Vec<String>,
}

impl TransitionOutput {
    fn ok() -> Self {
        Self::default()
    }

    fn warn(message: &str) -> Self {
        Self {
            warnings: vec![message.to_string()],
        }
    }
}

impl StateMachine for ResourceStatus {
    type Input = LifecycleEvent;
    type Output = TransitionOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use LifecycleEvent::*;
        use ResourceStatus::*;

        match (self, input) {
            (Pending, Begin) => Ok((Materializing, TransitionOutput::ok())),
            (Pending, Skip) => Ok((Skipped, TransitionOutput::ok())),
            (Materializing, Succeed) => Ok((Materialized, TransitionOutput::ok())),
            (Materializing, Fail) => Ok((Failed, TransitionOutput::ok())),
            (Materializing, Skip) => Ok((
                Skipped,
                TransitionOutput::warn("Creation call returned after cancellation"),
            )),

            (Materialized | Failed | Skipped, _) => Err(TransitionError::Terminal(self.to_string())),

            (Pending, Succeed | Fail) | (Materializing, Begin) => {
                Err(TransitionError::InvalidTransition {
                    from: self.to_string(),
                    input: format!("{:?}", input),
                })
            }
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use LifecycleEvent::*;
        use ResourceStatus::*;

        match self {
            Pending => vec![Begin, Skip],
            Materializing => vec![Succeed, Fail, Skip],
            Materialized | Failed | Skipped => Vec::new(),
        }
    }
}
