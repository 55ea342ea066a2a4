// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Dependency Ordering
//!
//! Random DAGs are declared in a shuffled order; the computed order must
//! respect every edge, whether declared explicitly or implied by a property
//! reference, and must not depend on anything but the declarations.
//! Rings of dependencies must be reported with exactly the ring's ids.

use cim_stack::domain::{Properties, ResourceKind};
use cim_stack::{DependencyGraph, LogicalId, Stack, StackError};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// A DAG over `n` nodes as (declaration order, edges)
///
/// Edges `(d, r)` always have `d < r` in node numbering, so the graph is
/// acyclic no matter how the declarations are shuffled.
fn random_dag() -> impl Strategy<Value = (Vec<usize>, Vec<(usize, usize)>)> {
    (1usize..16).prop_flat_map(|n| {
        let order = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        let edges = prop::collection::vec(any::<bool>(), n * n).prop_map(move |bits| {
            let mut edges = Vec::new();
            for r in 0..n {
                for d in 0..r {
                    if bits[r * n + d] {
                        edges.push((d, r));
                    }
                }
            }
            edges
        });
        (order, edges)
    })
}

/// Like [`random_dag`], each edge flagged `true` when it is wired as a
/// property reference instead of an explicit dependency
fn random_wired_dag() -> impl Strategy<Value = (Vec<usize>, Vec<(usize, usize, bool)>)> {
    random_dag().prop_flat_map(|(order, edges)| {
        let wiring = prop::collection::vec(any::<bool>(), edges.len());
        (Just(order), Just(edges), wiring).prop_map(|(order, edges, wiring)| {
            let wired: Vec<(usize, usize, bool)> = edges
                .into_iter()
                .zip(wiring)
                .map(|((d, r), by_ref)| (d, r, by_ref))
                .collect();
            (order, wired)
        })
    })
}

fn name(i: usize) -> String {
    format!("R{}", i)
}

fn declare(order: &[usize], edges: &[(usize, usize)]) -> Stack {
    let mut stack = Stack::new("property");
    for &i in order {
        stack
            .declare(ResourceKind::Topic, &name(i), Properties::new())
            .unwrap();
    }
    for &(d, r) in edges {
        stack.depends_on(&name(r), &name(d)).unwrap();
    }
    stack
}

fn declare_wired(order: &[usize], edges: &[(usize, usize, bool)]) -> Stack {
    let mut stack = declare(order, &[]);
    for &(d, r, by_ref) in edges {
        if by_ref {
            let reference = stack.get_output(&name(d), "Arn").unwrap();
            stack
                .set_property(&name(r), format!("Dep{}", d), reference)
                .unwrap();
        } else {
            stack.depends_on(&name(r), &name(d)).unwrap();
        }
    }
    stack
}

fn position(graph: &DependencyGraph, i: usize) -> usize {
    let id = LogicalId::new(name(i)).unwrap();
    graph.position(&id).unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: every dependency is ordered before its dependent
    #[test]
    fn prop_order_respects_every_edge((order, edges) in random_dag()) {
        let stack = declare(&order, &edges);
        let graph = DependencyGraph::build(stack.resources()).unwrap();

        prop_assert_eq!(graph.len(), order.len());
        for &(d, r) in &edges {
            prop_assert!(
                position(&graph, d) < position(&graph, r),
                "R{} must precede R{}", d, r
            );
        }
    }

    /// Property: reference-implied edges order exactly like explicit ones
    #[test]
    fn prop_reference_edges_are_dependencies((order, edges) in random_wired_dag()) {
        let wired = declare_wired(&order, &edges);
        let explicit_edges: Vec<(usize, usize)> = edges.iter().map(|&(d, r, _)| (d, r)).collect();
        let explicit = declare(&order, &explicit_edges);

        let graph = DependencyGraph::build(wired.resources()).unwrap();
        for &(d, r, _) in &edges {
            prop_assert!(
                position(&graph, d) < position(&graph, r),
                "R{} must precede R{}", d, r
            );
            let dependent = LogicalId::new(name(r)).unwrap();
            let dependency = LogicalId::new(name(d)).unwrap();
            prop_assert!(graph.dependencies(&dependent).contains(&&dependency));
        }

        let baseline = DependencyGraph::build(explicit.resources()).unwrap();
        prop_assert_eq!(graph.topological_order(), baseline.topological_order());
    }

    /// Property: identical declarations produce identical orders
    #[test]
    fn prop_order_is_deterministic((order, edges) in random_dag()) {
        let first = declare(&order, &edges);
        let second = declare(&order, &edges);

        let a = DependencyGraph::build(first.resources()).unwrap();
        let b = DependencyGraph::build(second.resources()).unwrap();

        prop_assert_eq!(a.topological_order(), b.topological_order());
    }

    /// Property: without edges the order is the declaration order
    #[test]
    fn prop_independent_resources_keep_declaration_order(
        order in (1usize..16).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
    ) {
        let stack = declare(&order, &[]);
        let graph = DependencyGraph::build(stack.resources()).unwrap();

        let names: Vec<String> = graph.topological_order().iter().map(|id| id.to_string()).collect();
        let expected: Vec<String> = order.iter().map(|&i| name(i)).collect();
        prop_assert_eq!(names, expected);
    }

    /// Property: a ring is reported as a closed path over exactly its ids
    #[test]
    fn prop_ring_cycle_path_is_the_ring(ring in 2usize..8, extra in 0usize..5) {
        let mut stack = Stack::new("ring");
        for i in 0..ring + extra {
            stack
                .declare(ResourceKind::Topic, &name(i), Properties::new())
                .unwrap();
        }
        for i in 0..ring {
            stack.depends_on(&name(i), &name((i + 1) % ring)).unwrap();
        }
        for j in ring..ring + extra {
            stack.depends_on(&name(j), &name(j % ring)).unwrap();
        }

        let path = match DependencyGraph::build(stack.resources()) {
            Err(StackError::CyclicDependency { path }) => path,
            other => return Err(TestCaseError::fail(format!("expected a cycle, got {:?}", other.err()))),
        };

        prop_assert_eq!(path.len(), ring + 1);
        prop_assert_eq!(path.first(), path.last());
        let ring_ids: Vec<LogicalId> = (0..ring).map(|i| LogicalId::new(name(i)).unwrap()).collect();
        for id in &path {
            prop_assert!(ring_ids.contains(id), "{} is not part of the ring", id);
        }
    }
}
