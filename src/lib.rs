//! Declarative stack composition and dependency resolution
//!
//! Resources are declared on a [`Stack`], wired together through references
//! to each other's outputs, and synthesized in dependency order against
//! pluggable [`provider::Provider`]s. Policies are attached once the
//! resources they name exist.

pub mod artifact;
pub mod config;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod outputs;
pub mod policy;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod stack;
pub mod state_machine;
pub mod synthesizer;
pub mod teardown;
pub mod templates;

// Re-export commonly used types
pub use artifact::{Drift, FailedGrant, ResourceRecord, SynthesizedStack};
pub use config::{DeadLetterScope, RetryConfig, SynthesizerConfig};
pub use domain::{LogicalId, PropertyValue, Reference, ResourceHandle, ResourceKind};
pub use errors::{StackError, StackResult, SynthesisError};
pub use graph::DependencyGraph;
pub use stack::Stack;
pub use state_machine::ResourceStatus;
pub use synthesizer::Synthesizer;
pub use teardown::TeardownReport;
