// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Materialization Lifecycle
//!
//! Arbitrary event sequences are fed to the lifecycle state machine. Terminal
//! statuses absorb nothing and a resource is only ever materialized through
//! a successful creation.

use cim_stack::state_machine::{LifecycleEvent, StateMachine};
use cim_stack::ResourceStatus;
use proptest::prelude::*;

fn lifecycle_event() -> impl Strategy<Value = LifecycleEvent> {
    prop_oneof![
        Just(LifecycleEvent::Begin),
        Just(LifecycleEvent::Succeed),
        Just(LifecycleEvent::Fail),
        Just(LifecycleEvent::Skip),
    ]
}

proptest! {
    /// Property: once terminal, every further event is rejected
    #[test]
    fn prop_terminal_status_is_final(events in prop::collection::vec(lifecycle_event(), 0..20)) {
        let mut status = ResourceStatus::Pending;
        for event in events {
            let was_terminal = status.is_terminal();
            if let Ok((next, _)) = status.transition(&event) {
                prop_assert!(!was_terminal, "{} accepted {:?}", status, event);
                status = next;
            }
        }
    }

    /// Property: Materialized is reached only by Begin then Succeed
    #[test]
    fn prop_materialized_requires_successful_creation(
        events in prop::collection::vec(lifecycle_event(), 0..20)
    ) {
        let mut status = ResourceStatus::Pending;
        let mut accepted = Vec::new();
        for event in events {
            if let Ok((next, _)) = status.transition(&event) {
                accepted.push(event);
                status = next;
            }
        }

        if status.is_materialized() {
            prop_assert_eq!(accepted.clone(), vec![LifecycleEvent::Begin, LifecycleEvent::Succeed]);
        }
        if !accepted.is_empty() {
            prop_assert_ne!(status, ResourceStatus::Pending);
        }
    }
}
