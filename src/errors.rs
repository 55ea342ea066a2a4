// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for stack declaration, graph construction and synthesis
//!
//! Errors fall into two groups:
//!
//! - **Construction-time** (`DuplicateId`, `UnknownResource`, `InvalidLogicalId`,
//!   `StackSealed`, `CyclicDependency`, `MissingCapability`): raised before any
//!   provider call is made, so no partial side effects are possible.
//! - **Runtime** (`ProviderCreation`, `PolicyTargetUnavailable`, `Synthesis`):
//!   contained to the failing subgraph and reported in the aggregate result.
//!
//! `UnresolvedDependency` is an internal invariant violation: it means the
//! synthesizer tried to resolve a reference before its target materialized.

use thiserror::Error;

use crate::artifact::SynthesizedStack;
use crate::domain::{LogicalId, LogicalIdError, ResourceKind};
use crate::provider::ProviderError;
use crate::state_machine::TransitionError;

/// Errors that can occur while declaring or synthesizing a stack
#[derive(Debug, Error)]
pub enum StackError {
    /// A resource with this logical id is already declared
    #[error("Duplicate resource id: {0}")]
    DuplicateId(LogicalId),

    /// The referenced logical id was never declared
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Logical id failed validation
    #[error("Invalid logical id: {0}")]
    InvalidLogicalId(#[from] LogicalIdError),

    /// The stack is sealed and no longer accepts declarations
    #[error("Stack '{0}' is sealed; declarations are closed")]
    StackSealed(String),

    /// The dependency graph contains a cycle
    #[error("Cyclic dependency: {}", format_cycle(.path))]
    CyclicDependency { path: Vec<LogicalId> },

    /// A reference was resolved before its target materialized
    #[error("Unresolved dependency: {resource} needs {attribute} of {target}, which is not materialized")]
    UnresolvedDependency {
        resource: LogicalId,
        target: LogicalId,
        attribute: String,
    },

    /// Provider creation failed after retries
    #[error("Provider failed to create {resource}: {source}")]
    ProviderCreation {
        resource: LogicalId,
        #[source]
        source: ProviderError,
    },

    /// No provider registered for a resource kind
    #[error("No provider registered for kind {0}")]
    NoProvider(ResourceKind),

    /// Policy principal or target did not materialize
    #[error("Cannot attach policy: {0} did not materialize")]
    PolicyTargetUnavailable(LogicalId),

    /// Resource kind lacks a capability required by the operation
    #[error("Resource {resource} ({kind}) is not {capability}")]
    MissingCapability {
        resource: LogicalId,
        kind: ResourceKind,
        capability: &'static str,
    },

    /// Aggregate report of failed and skipped resources
    #[error("{0}")]
    Synthesis(Box<SynthesisError>),

    /// Lifecycle transition rejected by the state machine
    #[error("Lifecycle error: {0}")]
    InvalidTransition(#[from] TransitionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A synthesis task ended without reporting
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for stack operations
pub type StackResult<T> = Result<T, StackError>;

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Serialization(err.to_string())
    }
}

impl From<SynthesisError> for StackError {
    fn from(err: SynthesisError) -> Self {
        StackError::Synthesis(Box::new(err))
    }
}

/// Aggregate synthesis failure
///
/// Independent subgraphs still complete; `report` holds the status of every
/// resource so operators can retry only the failed portion.
#[derive(Debug, Error)]
#[error("Synthesis incomplete: {} failed, {} skipped", .failed.len(), .skipped.len())]
pub struct SynthesisError {
    /// Full artifact including materialized resources
    pub report: SynthesizedStack,
    /// Failed resources with their error message
    pub failed: Vec<(LogicalId, String)>,
    /// Resources skipped because a dependency failed or synthesis was cancelled
    pub skipped: Vec<LogicalId>,
}

fn format_cycle(path: &[LogicalId]) -> String {
    path.iter()
        .map(LogicalId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
