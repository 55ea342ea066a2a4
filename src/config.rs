// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesizer Configuration
//!
//! Explicit configuration passed into the synthesizer. There is no
//! process-wide default: project and author naming, tagging, parallelism and
//! retry policy all travel with the [`SynthesizerConfig`] value.
//!
//! # File Format
//!
//! ```json
//! {
//!   "project": "resources",
//!   "author": "platform-team",
//!   "environment": "dev",
//!   "region": "eu-west-1",
//!   "account_id": "123456789012",
//!   "max_parallelism": 8,
//!   "create_timeout_ms": 300000,
//!   "retry": { "max_attempts": 5, "initial_delay_ms": 200, "max_delay_ms": 10000 },
//!   "dead_letter_scope": "per_topic",
//!   "tags": { "cost-center": "web" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::{StackError, StackResult};

/// Tag set applied to taggable resources
pub type Tags = BTreeMap<String, String>;

/// Retry policy for provider calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for exponential growth
    pub max_delay: Duration,
    /// Randomize delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

/// How dead-letter publish grants are scoped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterScope {
    /// Statement resource is the dead-letter topic's own ARN
    #[default]
    PerTopic,
    /// Statement resource is every topic in the account and region
    AccountTopics,
}

/// Configuration for stack synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizerConfig {
    /// Project name used in resource names and tags
    pub project: String,
    /// Author tag
    pub author: String,
    /// Deployment environment (dev, staging, prod)
    pub environment: String,
    /// Target region
    pub region: String,
    /// Target account id
    pub account_id: String,
    /// Maximum concurrent provider creation calls
    pub max_parallelism: usize,
    /// Timeout for a single creation attempt
    pub create_timeout: Duration,
    /// Retry policy for transient provider errors
    pub retry: RetryConfig,
    /// Scope of dead-letter publish grants
    pub dead_letter_scope: DeadLetterScope,
    /// Additional tags applied to every taggable resource
    pub tags: Tags,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            project: "cim-stack".to_string(),
            author: "cim".to_string(),
            environment: "dev".to_string(),
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
            max_parallelism: 4,
            create_timeout: Duration::from_secs(300),
            retry: RetryConfig::default(),
            dead_letter_scope: DeadLetterScope::default(),
            tags: Tags::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RetryFile {
    max_attempts: Option<u32>,
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    jitter: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    project: Option<String>,
    author: Option<String>,
    environment: Option<String>,
    region: Option<String>,
    account_id: Option<String>,
    max_parallelism: Option<usize>,
    create_timeout_ms: Option<u64>,
    retry: Option<RetryFile>,
    dead_letter_scope: Option<DeadLetterScope>,
    #[serde(default)]
    tags: Tags,
}

impl SynthesizerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> StackResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StackError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Parse configuration from JSON; `project` and `author` are required
    pub fn from_json(json: &str) -> StackResult<Self> {
        let file: ConfigFile = serde_json::from_str(json)
            .map_err(|e| StackError::Configuration(format!("invalid config: {}", e)))?;

        let defaults = Self::default();
        let retry_defaults = defaults.retry.clone();
        let retry = match file.retry {
            Some(r) => RetryConfig {
                max_attempts: r.max_attempts.unwrap_or(retry_defaults.max_attempts),
                initial_delay: r
                    .initial_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(retry_defaults.initial_delay),
                max_delay: r
                    .max_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(retry_defaults.max_delay),
                jitter: r.jitter.unwrap_or(retry_defaults.jitter),
            },
            None => retry_defaults,
        };

        let config = Self {
            project: file
                .project
                .ok_or_else(|| StackError::Configuration("project must be specified".into()))?,
            author: file
                .author
                .ok_or_else(|| StackError::Configuration("author must be specified".into()))?,
            environment: file.environment.unwrap_or(defaults.environment),
            region: file.region.unwrap_or(defaults.region),
            account_id: file.account_id.unwrap_or(defaults.account_id),
            max_parallelism: file.max_parallelism.unwrap_or(defaults.max_parallelism),
            create_timeout: file
                .create_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.create_timeout),
            retry,
            dead_letter_scope: file.dead_letter_scope.unwrap_or_default(),
            tags: file.tags,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants
    pub fn validate(&self) -> StackResult<()> {
        if self.project.trim().is_empty() {
            return Err(StackError::Configuration("project must be specified".into()));
        }
        if self.author.trim().is_empty() {
            return Err(StackError::Configuration("author must be specified".into()));
        }
        if self.max_parallelism == 0 {
            return Err(StackError::Configuration(
                "max_parallelism must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(StackError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.account_id.len() != 12 || !self.account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(StackError::Configuration(format!(
                "account_id must be 12 digits, got {:?}",
                self.account_id
            )));
        }
        Ok(())
    }

    /// Tags applied to every taggable resource
    pub fn default_tags(&self) -> Tags {
        let mut tags = self.tags.clone();
        tags.insert("environment".to_string(), self.environment.clone());
        tags.insert("project".to_string(), self.project.clone());
        tags.insert("author".to_string(), self.author.clone());
        tags
    }
}
