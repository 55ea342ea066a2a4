// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests for stack synthesis
//!
//! These tests drive the synthesizer end to end against the in-memory
//! provider:
//! 1. Declare a stack
//! 2. Synthesize it
//! 3. Inspect statuses, outputs and provider calls

mod fixtures;

use std::sync::Arc;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use cim_stack::domain::{Properties, ResourceKind};
use cim_stack::provider::{InMemoryProvider, ProviderError};
use cim_stack::{ResourceStatus, Stack, StackError, SynthesizerConfig};

use fixtures::*;

fn unwrap_incomplete(err: StackError) -> Box<cim_stack::SynthesisError> {
    match err {
        StackError::Synthesis(incomplete) => incomplete,
        other => panic!("expected incomplete synthesis, got {other}"),
    }
}

/// Test: a failed resource skips its dependents but not independent branches
#[tokio::test]
async fn test_partial_failure_isolated_to_subgraph() {
    let provider = Arc::new(
        InMemoryProvider::default().failing("A", ProviderError::Rejected("quota".into())),
    );
    let synth = synthesizer(&provider);
    let mut stack = chain_with_independent();

    let incomplete = unwrap_incomplete(synth.synthesize(&mut stack).await.unwrap_err());
    let report = &incomplete.report;

    assert_eq!(report.status("A"), Some(ResourceStatus::Failed));
    assert_eq!(report.status("B"), Some(ResourceStatus::Skipped));
    assert_eq!(report.status("C"), Some(ResourceStatus::Materialized));

    assert_eq!(incomplete.failed.len(), 1);
    assert_eq!(incomplete.failed[0].0, id("A"));
    assert!(incomplete.failed[0].1.contains("quota"));
    assert_eq!(incomplete.skipped, vec![id("B")]);

    let calls = provider.create_calls().await;
    assert!(!calls.contains(&id("B")));
    assert!(calls.contains(&id("C")));
}

/// Test: every declared resource appears in the result exactly once
#[tokio::test]
async fn test_every_resource_reported() {
    let provider = Arc::new(
        InMemoryProvider::default().failing("N2", ProviderError::Rejected("bad".into())),
    );
    let synth = synthesizer(&provider);
    let mut stack = linear_chain(5);

    let incomplete = unwrap_incomplete(synth.synthesize(&mut stack).await.unwrap_err());
    let order: Vec<_> = incomplete
        .report
        .order()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(order, vec!["N0", "N1", "N2", "N3", "N4"]);

    let statuses: Vec<_> = incomplete.report.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ResourceStatus::Materialized,
            ResourceStatus::Materialized,
            ResourceStatus::Failed,
            ResourceStatus::Skipped,
            ResourceStatus::Skipped,
        ]
    );
}

/// Test: re-synthesis against a create-if-absent provider changes nothing
#[tokio::test]
async fn test_resynthesis_is_idempotent() {
    let provider = Arc::new(InMemoryProvider::default());
    let synth = synthesizer(&provider);
    let mut stack = linear_chain(4);

    let first = synth.synthesize(&mut stack).await.unwrap();
    assert!(stack.is_sealed());
    let live = provider.live_count().await;

    let second = synth.synthesize(&mut stack).await.unwrap();

    assert!(second.diff(&first).is_empty());
    assert_eq!(first.statuses(), second.statuses());
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(provider.live_count().await, live);
}

/// Test: identical declarations give identical orders and resolved snapshots
#[tokio::test]
async fn test_synthesis_is_deterministic() {
    let a = Arc::new(InMemoryProvider::default());
    let b = Arc::new(InMemoryProvider::default());

    let first = synthesizer(&a)
        .synthesize(&mut chain_with_independent())
        .await
        .unwrap();
    let second = synthesizer(&b)
        .synthesize(&mut chain_with_independent())
        .await
        .unwrap();

    assert_eq!(first.order(), second.order());
    assert_eq!(first.records, second.records);
}

/// Test: a sealed stack refuses new declarations but re-synthesizes
#[tokio::test]
async fn test_sealed_stack_refuses_declarations() {
    let provider = Arc::new(InMemoryProvider::default());
    let synth = synthesizer(&provider);
    let mut stack = chain_with_independent();
    synth.synthesize(&mut stack).await.unwrap();

    let err = stack
        .declare(ResourceKind::Topic, "D", Properties::new())
        .unwrap_err();
    assert!(matches!(err, StackError::StackSealed(_)));
    assert!(synth.synthesize(&mut stack).await.is_ok());
}

/// Test: a construction error leaves the stack open for correction
#[tokio::test]
async fn test_cycle_error_leaves_stack_open() {
    let provider = Arc::new(InMemoryProvider::default());
    let synth = synthesizer(&provider);
    let mut stack = chain_with_independent();
    let b_arn = stack.get_output("B", "Arn").unwrap();
    stack.set_property("A", "Downstream", b_arn).unwrap();

    let err = synth.synthesize(&mut stack).await.unwrap_err();
    assert!(matches!(err, StackError::CyclicDependency { .. }));
    assert!(!stack.is_sealed());

    let c_arn = stack.get_output("C", "Arn").unwrap();
    stack.set_property("A", "Downstream", c_arn).unwrap();
    stack
        .declare(ResourceKind::Topic, "D", Properties::new())
        .unwrap();

    let artifact = synth.synthesize(&mut stack).await.unwrap();
    assert!(stack.is_sealed());
    let order: Vec<&str> = artifact.order().iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["C", "A", "B", "D"]);
}

/// Test: throttling is retried until the provider accepts the call
#[tokio::test]
async fn test_throttled_provider_succeeds_within_attempts() {
    let provider = Arc::new(InMemoryProvider::default().throttled("A", 2));
    let synth = synthesizer(&provider);

    let artifact = synth
        .synthesize(&mut chain_with_independent())
        .await
        .unwrap();

    assert!(artifact.is_complete());
    let attempts = provider
        .create_calls()
        .await
        .into_iter()
        .filter(|c| *c == id("A"))
        .count();
    assert_eq!(attempts, 3);
}

/// Test: permanent rejections are not retried
#[tokio::test]
async fn test_rejected_is_not_retried() {
    let provider = Arc::new(
        InMemoryProvider::default().failing("C", ProviderError::Rejected("invalid".into())),
    );
    let synth = synthesizer(&provider);

    let _ = synth.synthesize(&mut chain_with_independent()).await;

    let attempts = provider
        .create_calls()
        .await
        .into_iter()
        .filter(|c| *c == id("C"))
        .count();
    assert_eq!(attempts, 1);
}

/// Test: transient errors give up after the configured attempts
#[tokio::test]
async fn test_transient_errors_bounded_by_max_attempts() {
    let provider = Arc::new(
        InMemoryProvider::default().failing("C", ProviderError::Transient("503".into())),
    );
    let mut config = fast_config();
    config.retry.max_attempts = 3;
    let synth = synthesizer_with(config, &provider);

    let incomplete = unwrap_incomplete(
        synth
            .synthesize(&mut chain_with_independent())
            .await
            .unwrap_err(),
    );

    assert_eq!(incomplete.report.status("C"), Some(ResourceStatus::Failed));
    let attempts = provider
        .create_calls()
        .await
        .into_iter()
        .filter(|c| *c == id("C"))
        .count();
    assert_eq!(attempts, 3);
}

/// Test: a slow creation call fails with a timeout
#[tokio::test]
async fn test_create_timeout_marks_failed() {
    let provider = Arc::new(InMemoryProvider::default().delayed("C", Duration::from_millis(500)));
    let config = SynthesizerConfig {
        create_timeout: Duration::from_millis(20),
        ..fast_config()
    };
    let synth = synthesizer_with(config, &provider);

    let incomplete = unwrap_incomplete(
        synth
            .synthesize(&mut chain_with_independent())
            .await
            .unwrap_err(),
    );

    let record = incomplete.report.record("C").unwrap();
    assert_eq!(record.status, ResourceStatus::Failed);
    assert!(record.error.as_deref().unwrap_or_default().contains("Timed out"));
}

/// Test: cancellation before synthesis starts no resource
#[tokio::test]
async fn test_cancelled_synthesis_starts_nothing() {
    let provider = Arc::new(InMemoryProvider::default());
    let synth = synthesizer(&provider);
    synth.cancellation_token().cancel();

    let incomplete = unwrap_incomplete(
        synth
            .synthesize(&mut chain_with_independent())
            .await
            .unwrap_err(),
    );

    assert!(provider.create_calls().await.is_empty());
    assert_eq!(incomplete.skipped.len(), 3);
    assert!(incomplete.failed.is_empty());
}

/// Test: an in-flight creation completes, is marked skipped and keeps its outputs
#[tokio::test]
async fn test_cancellation_during_creation() {
    let provider = Arc::new(InMemoryProvider::default().delayed("N0", Duration::from_millis(100)));
    let synth = synthesizer(&provider);
    let cancel = synth.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let incomplete = unwrap_incomplete(synth.synthesize(&mut linear_chain(3)).await.unwrap_err());
    let report = &incomplete.report;

    let n0 = report.record("N0").unwrap();
    assert_eq!(n0.status, ResourceStatus::Skipped);
    assert!(n0.outputs.contains_key("Id"));
    assert_eq!(report.status("N1"), Some(ResourceStatus::Skipped));
    assert_eq!(report.status("N2"), Some(ResourceStatus::Skipped));
    assert_eq!(provider.create_calls().await, vec![id("N0")]);

    // the orphan can still be cleaned up
    let teardown = synth.teardown(report).await.unwrap();
    assert_eq!(teardown.deleted, vec![id("N0")]);
    assert_eq!(provider.live_count().await, 0);
}

/// Test: an attempt that errors after cancellation is skipped, not failed
#[tokio::test]
async fn test_cancellation_during_retried_creation() {
    let provider = Arc::new(
        InMemoryProvider::default()
            .throttled("A", 100)
            .delayed("A", Duration::from_millis(60)),
    );
    let mut config = fast_config();
    config.retry.initial_delay = Duration::from_millis(200);
    config.retry.max_delay = Duration::from_millis(200);
    config.retry.max_attempts = 5;
    let synth = synthesizer_with(config, &provider);
    let cancel = synth.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let incomplete = unwrap_incomplete(
        synth
            .synthesize(&mut chain_with_independent())
            .await
            .unwrap_err(),
    );
    let report = &incomplete.report;

    assert!(incomplete.failed.is_empty());
    assert_eq!(report.status("A"), Some(ResourceStatus::Skipped));
    assert_eq!(report.status("B"), Some(ResourceStatus::Skipped));
    assert_eq!(report.status("C"), Some(ResourceStatus::Materialized));
    assert_eq!(
        report.record("A").unwrap().error.as_deref(),
        Some("synthesis cancelled")
    );
    let attempts = provider
        .create_calls()
        .await
        .into_iter()
        .filter(|c| *c == id("A"))
        .count();
    assert_eq!(attempts, 1);
}

/// Test: creation calls never exceed the parallelism bound
#[tokio::test]
async fn test_parallelism_is_bounded() {
    let delay = Duration::from_millis(30);
    let provider = Arc::new(
        InMemoryProvider::default()
            .delayed("A", delay)
            .delayed("B", delay)
            .delayed("C", delay),
    );
    let config = SynthesizerConfig {
        max_parallelism: 1,
        ..fast_config()
    };
    let synth = synthesizer_with(config, &provider);

    let mut stack = Stack::new("parallel");
    for name in ["A", "B", "C"] {
        stack
            .declare(ResourceKind::Topic, name, Properties::new())
            .unwrap();
    }

    let started = Instant::now();
    synth.synthesize(&mut stack).await.unwrap();
    assert!(started.elapsed() >= delay * 3);
}

/// Test: teardown deletes in reverse topological order
#[tokio::test]
async fn test_teardown_reverse_order() {
    let provider = Arc::new(InMemoryProvider::default());
    let synth = synthesizer(&provider);

    let artifact = synth.synthesize(&mut linear_chain(3)).await.unwrap();
    let report = synth.teardown(&artifact).await.unwrap();

    assert_eq!(report.deleted, vec![id("N2"), id("N1"), id("N0")]);
    let topic = |name: &str| format!("arn:aws:sns:{REGION}:{ACCOUNT_ID}:{name}");
    assert_eq!(
        provider.delete_calls().await,
        vec![topic("n2"), topic("n1"), topic("n0")]
    );
}

/// Test: failed resources have nothing to tear down
#[tokio::test]
async fn test_teardown_skips_uncreated() {
    let provider = Arc::new(
        InMemoryProvider::default().failing("A", ProviderError::Rejected("quota".into())),
    );
    let synth = synthesizer(&provider);

    let incomplete = unwrap_incomplete(
        synth
            .synthesize(&mut chain_with_independent())
            .await
            .unwrap_err(),
    );
    let report = synth.teardown(&incomplete.report).await.unwrap();

    assert_eq!(report.deleted, vec![id("C")]);
    assert_eq!(report.not_created, vec![id("B"), id("A")]);
}
