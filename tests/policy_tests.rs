// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy attachment tests
//!
//! Statements are rendered only once both principal and target exist, and
//! attaching a grant is idempotent.

mod fixtures;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use cim_stack::domain::{Access, Properties, ResourceKind};
use cim_stack::outputs::OutputTable;
use cim_stack::policy::PolicyAttacher;
use cim_stack::provider::{InMemoryProvider, ProviderError};
use cim_stack::state_machine::LifecycleEvent;
use cim_stack::{ResourceStatus, Stack, StackError};

use fixtures::*;

fn outputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/app";
const TOPIC_ARN: &str = "arn:aws:sns:us-east-1:123456789012:dlq";

#[tokio::test]
async fn test_attach_waits_for_both_resources() {
    let role = id("Role");
    let topic = id("Topic");
    let table = Arc::new(OutputTable::new([&role, &topic]));
    let attacher = Arc::new(PolicyAttacher::new(Arc::clone(&table), REGION, ACCOUNT_ID));

    let pending = {
        let attacher = Arc::clone(&attacher);
        let (role, topic) = (role.clone(), topic.clone());
        tokio::spawn(async move {
            attacher
                .attach_least_privilege(&role, &topic, ["sns:Publish"])
                .await
        })
    };

    table.transition(&role, LifecycleEvent::Begin).unwrap();
    table.materialize(&role, outputs(&[("Arn", ROLE_ARN)])).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());
    assert!(attacher.policies().await.is_empty());

    table.transition(&topic, LifecycleEvent::Begin).unwrap();
    table.materialize(&topic, outputs(&[("Arn", TOPIC_ARN)])).unwrap();

    assert!(pending.await.unwrap().unwrap());
    let policies = attacher.policies().await;
    assert_eq!(policies.len(), 1);
    let statement = &policies[0].statements[0];
    assert_eq!(statement.principal, ROLE_ARN);
    assert!(statement.resources.contains(TOPIC_ARN));
    assert!(statement.actions.contains("sns:Publish"));
}

#[tokio::test]
async fn test_attach_twice_is_a_noop() {
    let role = id("Role");
    let topic = id("Topic");
    let table = Arc::new(OutputTable::new([&role, &topic]));
    for (res, arn) in [(&role, ROLE_ARN), (&topic, TOPIC_ARN)] {
        table.transition(res, LifecycleEvent::Begin).unwrap();
        table.materialize(res, outputs(&[("Arn", arn)])).unwrap();
    }
    let attacher = PolicyAttacher::new(table, REGION, ACCOUNT_ID);

    assert!(attacher
        .attach_least_privilege(&role, &topic, ["sns:Publish"])
        .await
        .unwrap());
    assert!(!attacher
        .attach_least_privilege(&role, &topic, ["sns:Publish"])
        .await
        .unwrap());
    assert_eq!(attacher.policies().await[0].statements.len(), 1);
}

#[tokio::test]
async fn test_attach_to_failed_target_is_refused() {
    let role = id("Role");
    let topic = id("Topic");
    let table = Arc::new(OutputTable::new([&role, &topic]));
    table.transition(&role, LifecycleEvent::Begin).unwrap();
    table.materialize(&role, outputs(&[("Arn", ROLE_ARN)])).unwrap();
    table.transition(&topic, LifecycleEvent::Skip).unwrap();
    let attacher = PolicyAttacher::new(table, REGION, ACCOUNT_ID);

    let err = attacher
        .attach_least_privilege(&role, &topic, ["sns:Publish"])
        .await
        .unwrap_err();
    assert!(matches!(err, StackError::PolicyTargetUnavailable(ref t) if *t == topic));
    assert!(attacher.policies().await.is_empty());
}

#[tokio::test]
async fn test_synthesis_attaches_grants_with_concrete_arns() {
    let provider = Arc::new(InMemoryProvider::default());
    let synth = synthesizer(&provider);

    let mut stack = Stack::new("grants");
    let mut role = Properties::new();
    role.insert("RoleName".into(), "app".into());
    stack.declare(ResourceKind::Role, "AppRole", role).unwrap();
    let mut topic = Properties::new();
    topic.insert("TopicName".into(), "events".into());
    stack.declare(ResourceKind::Topic, "Events", topic).unwrap();
    stack.grant("AppRole", "Events", Access::Publish).unwrap();
    stack.grant("AppRole", "Events", Access::Publish).unwrap();

    let artifact = synth.synthesize(&mut stack).await.unwrap();

    assert_eq!(artifact.policies.len(), 1);
    let policy = &artifact.policies[0];
    assert_eq!(policy.name, "AppRole-policy");
    assert_eq!(policy.statements.len(), 1);
    let statement = &policy.statements[0];
    assert_eq!(
        statement.principal,
        format!("arn:aws:iam::{ACCOUNT_ID}:role/app")
    );
    assert_eq!(
        statement.resources.iter().collect::<Vec<_>>(),
        vec![&format!("arn:aws:sns:{REGION}:{ACCOUNT_ID}:events")]
    );
    assert!(artifact.failed_grants.is_empty());
}

#[tokio::test]
async fn test_grant_on_failed_target_is_reported_unattached() {
    let provider = Arc::new(
        InMemoryProvider::default().failing("Events", ProviderError::Rejected("denied".into())),
    );
    let synth = synthesizer(&provider);

    let mut stack = Stack::new("grants");
    stack
        .declare(ResourceKind::Role, "AppRole", Properties::new())
        .unwrap();
    stack
        .declare(ResourceKind::Topic, "Events", Properties::new())
        .unwrap();
    stack.grant("AppRole", "Events", Access::Subscribe).unwrap();

    let err = synth.synthesize(&mut stack).await.unwrap_err();
    let StackError::Synthesis(incomplete) = err else {
        panic!("expected incomplete synthesis");
    };
    assert_eq!(
        incomplete.report.status("AppRole"),
        Some(ResourceStatus::Materialized)
    );
    assert!(incomplete.report.policies.is_empty());

    let failed = &incomplete.report.failed_grants;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].principal, id("AppRole"));
    assert_eq!(failed[0].target, id("Events"));
    assert!(failed[0].actions.contains("sns:Subscribe"));
    assert!(failed[0].error.contains("Events"));
}

#[test]
fn test_grant_requires_grantable_target() {
    let mut stack = Stack::new("grants");
    stack
        .declare(ResourceKind::Role, "AppRole", Properties::new())
        .unwrap();
    stack
        .declare(ResourceKind::RecordSet, "Record", Properties::new())
        .unwrap();

    let err = stack
        .grant("AppRole", "Record", Access::Publish)
        .unwrap_err();
    assert!(matches!(err, StackError::MissingCapability { .. }));
    assert!(stack.grants().is_empty());
}
