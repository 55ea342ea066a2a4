// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-stack
//!
//! Deterministic configuration, providers and stack shapes shared by the
//! integration tests.
//!
//! # Design Principles
//! - Retry delays are milliseconds so retry tests stay fast
//! - Fixtures declare; tests synthesize and assert
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cim_stack::domain::{Properties, ResourceKind};
use cim_stack::provider::{InMemoryProvider, ProviderRegistry};
use cim_stack::templates::RestApiProps;
use cim_stack::{LogicalId, Stack, Synthesizer, SynthesizerConfig};

pub const ACCOUNT_ID: &str = "123456789012";
pub const REGION: &str = "us-east-1";

/// Configuration with fast retries
pub fn fast_config() -> SynthesizerConfig {
    let mut config = SynthesizerConfig::default();
    config.retry.initial_delay = Duration::from_millis(1);
    config.retry.max_delay = Duration::from_millis(5);
    config.retry.jitter = false;
    config
}

/// Synthesizer backed by a single shared provider
pub fn synthesizer(provider: &Arc<InMemoryProvider>) -> Synthesizer {
    synthesizer_with(fast_config(), provider)
}

pub fn synthesizer_with(config: SynthesizerConfig, provider: &Arc<InMemoryProvider>) -> Synthesizer {
    let provider: Arc<dyn cim_stack::provider::Provider> = provider.clone();
    Synthesizer::new(config, ProviderRegistry::single(provider))
        .expect("fixture configuration is valid")
}

pub fn id(s: &str) -> LogicalId {
    LogicalId::new(s).expect("Invalid logical id in test fixture")
}

/// `A -> B` chain plus an independent `C`, all topics
pub fn chain_with_independent() -> Stack {
    let mut stack = Stack::new("partial");
    let a = stack
        .declare(ResourceKind::Topic, "A", Properties::new())
        .unwrap();
    let mut props = Properties::new();
    props.insert("Upstream".into(), a.arn());
    stack.declare(ResourceKind::Topic, "B", props).unwrap();
    stack
        .declare(ResourceKind::Topic, "C", Properties::new())
        .unwrap();
    stack
}

/// Linear chain `N0 -> N1 -> ... -> N(len-1)`
pub fn linear_chain(len: usize) -> Stack {
    let mut stack = Stack::new("chain");
    let mut previous = None;
    for i in 0..len {
        let mut props = Properties::new();
        if let Some(prev) = &previous {
            props.insert("After".into(), cim_stack::ResourceHandle::arn(prev));
        }
        let handle = stack
            .declare(ResourceKind::Topic, &format!("N{}", i), props)
            .unwrap();
        previous = Some(handle);
    }
    stack
}

pub fn api_props(is_production: bool) -> RestApiProps {
    RestApiProps {
        domain_name: "example.com".into(),
        code_bucket: "example-code".into(),
        certificate_arn: format!("arn:aws:acm:{REGION}:{ACCOUNT_ID}:certificate/abc"),
        hosted_zone_id: "Z123EXAMPLE".into(),
        api_domain_name: "api.example.com".into(),
        is_production,
        allowed_ip_ranges: vec!["192.0.2.0/24".into()],
    }
}
