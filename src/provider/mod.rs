// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Provider Interface
//!
//! The engine never talks to a cloud API directly. Each resource kind is
//! dispatched to a [`Provider`] registered for it in a [`ProviderRegistry`].
//!
//! ```text
//! Synthesizer ──(kind)──> ProviderRegistry ──> Provider::create / delete
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Tags;
use crate::domain::{LogicalId, ResourceKind};
use crate::errors::{StackError, StackResult};
use crate::resolver::ResolvedProperties;

pub mod memory;

pub use memory::InMemoryProvider;

/// Output attributes captured at materialization
pub type Outputs = BTreeMap<String, String>;

/// Errors reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Rate limited by the provider API
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Transient failure worth retrying
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Request rejected (invalid properties, quota exceeded, ...)
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Single attempt exceeded the configured timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Synthesis was cancelled before the attempt started
    #[error("Cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether the call may succeed if retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Transient(_))
    }
}

/// Creation request handed to a provider
#[derive(Debug)]
pub struct CreateRequest<'a> {
    pub id: &'a LogicalId,
    pub kind: ResourceKind,
    pub properties: &'a ResolvedProperties,
    pub tags: &'a Tags,
}

/// Provider for one or more resource kinds
#[async_trait]
pub trait Provider: Send + Sync {
    /// Create the resource and return its output attributes
    ///
    /// Implementations should treat creating an already existing resource
    /// as a no-op returning the existing outputs.
    async fn create(&self, request: &CreateRequest<'_>) -> Result<Outputs, ProviderError>;

    /// Delete a resource by physical id
    async fn delete(&self, kind: ResourceKind, physical_id: &str) -> Result<(), ProviderError>;
}

/// Provider lookup by resource kind
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ResourceKind, Arc<dyn Provider>>,
    fallback: Option<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that sends every kind to one provider
    pub fn single(provider: Arc<dyn Provider>) -> Self {
        Self {
            providers: HashMap::new(),
            fallback: Some(provider),
        }
    }

    /// Register a provider for a set of kinds
    pub fn register(
        mut self,
        kinds: impl IntoIterator<Item = ResourceKind>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        for kind in kinds {
            self.providers.insert(kind, Arc::clone(&provider));
        }
        self
    }

    /// Provider used for kinds without a dedicated registration
    pub fn with_fallback(mut self, provider: Arc<dyn Provider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    /// Look up the provider for a kind
    pub fn get(&self, kind: ResourceKind) -> StackResult<Arc<dyn Provider>> {
        self.providers
            .get(&kind)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or(StackError::NoProvider(kind))
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.providers.keys().map(ResourceKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("kinds", &kinds)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::Throttled("rate".into()).is_retryable());
        assert!(ProviderError::Transient("503".into()).is_retryable());
        assert!(!ProviderError::Rejected("bad".into()).is_retryable());
        assert!(!ProviderError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ProviderError::Cancelled.is_retryable());
    }

    #[test]
    fn test_registry_dispatch_and_fallback() {
        let dedicated: Arc<dyn Provider> = Arc::new(InMemoryProvider::default());
        let registry = ProviderRegistry::new().register([ResourceKind::Topic], dedicated);

        assert!(registry.get(ResourceKind::Topic).is_ok());
        assert!(matches!(
            registry.get(ResourceKind::Role),
            Err(StackError::NoProvider(ResourceKind::Role))
        ));

        let registry = registry.with_fallback(Arc::new(InMemoryProvider::default()));
        assert!(registry.get(ResourceKind::Role).is_ok());
    }
}
