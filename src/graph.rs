// Copyright (c) 2025 - Cowboy AI, Inc.
//! Dependency Graph Builder
//!
//! Turns a set of resource declarations into a DAG whose edges are the union
//! of explicit `depends_on` entries and the edges implied by references.
//!
//! # Graph Construction Rules
//!
//! 1. **Edges** - `D → R` when R lists D in `depends_on` or holds a reference to D.
//! 2. **Unknown Targets** - a reference to an undeclared id fails the build.
//! 3. **Cycle Detection** - three-color DFS; the reported path holds only cycle ids.
//! 4. **Topological Order** - Kahn's algorithm, lowest declaration index first,
//!    so identical declarations always produce identical orders.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use crate::domain::{LogicalId, Resource};
use crate::errors::{StackError, StackResult};

/// DFS marking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    InProgress,
    Done,
}

/// Directed acyclic graph over resource ids
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Node ids in declaration order
    nodes: Vec<LogicalId>,
    index: HashMap<LogicalId, usize>,
    /// Direct dependencies per node (incoming edges)
    dependencies: Vec<Vec<usize>>,
    /// Direct dependents per node (outgoing edges)
    dependents: Vec<Vec<usize>>,
    /// Topological order as node indices
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Build the graph from declarations in declaration order
    ///
    /// # Errors
    /// - `UnknownResource` if a dependency or reference names an undeclared id
    /// - `CyclicDependency` with the cycle path if the graph is not acyclic
    pub fn build<'a, I>(resources: I) -> StackResult<Self>
    where
        I: IntoIterator<Item = &'a Resource>,
    {
        let resources: Vec<&Resource> = resources.into_iter().collect();

        let nodes: Vec<LogicalId> = resources.iter().map(|r| r.id.clone()).collect();
        let index: HashMap<LogicalId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut dependencies = vec![Vec::new(); nodes.len()];
        let mut dependents = vec![Vec::new(); nodes.len()];

        for (r, resource) in resources.iter().enumerate() {
            for dep in resource.dependency_ids() {
                let d = *index
                    .get(&dep)
                    .ok_or_else(|| StackError::UnknownResource(dep.to_string()))?;
                dependencies[r].push(d);
                dependents[d].push(r);
            }
        }

        let mut graph = Self {
            nodes,
            index,
            dependencies,
            dependents,
            order: Vec::new(),
        };

        if let Some(path) = graph.find_cycle() {
            return Err(StackError::CyclicDependency { path });
        }

        graph.order = graph.kahn_order();
        Ok(graph)
    }

    /// Three-color iterative DFS along dependent edges
    fn find_cycle(&self) -> Option<Vec<LogicalId>> {
        let mut color = vec![Color::Unvisited; self.nodes.len()];

        for root in 0..self.nodes.len() {
            if color[root] != Color::Unvisited {
                continue;
            }

            // (node, next child position)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            color[root] = Color::InProgress;

            while let Some(top) = stack.last_mut() {
                let (node, next) = *top;
                if let Some(&child) = self.dependents[node].get(next) {
                    top.1 += 1;
                    match color[child] {
                        Color::Unvisited => {
                            color[child] = Color::InProgress;
                            stack.push((child, 0));
                        }
                        Color::InProgress => {
                            let start = stack
                                .iter()
                                .position(|&(n, _)| n == child)
                                .unwrap_or(0);
                            let mut path: Vec<LogicalId> = stack[start..]
                                .iter()
                                .map(|&(n, _)| self.nodes[n].clone())
                                .collect();
                            path.push(self.nodes[child].clone());
                            return Some(path);
                        }
                        Color::Done => {}
                    }
                } else {
                    color[node] = Color::Done;
                    stack.pop();
                }
            }
        }

        None
    }

    fn kahn_order(&self) -> Vec<usize> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for &child in &self.dependents[node] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.push(Reverse(child));
                }
            }
        }
        order
    }

    /// Resource ids in creation order
    pub fn topological_order(&self) -> Vec<&LogicalId> {
        self.order.iter().map(|&i| &self.nodes[i]).collect()
    }

    /// Resource ids in teardown order
    pub fn reverse_order(&self) -> Vec<&LogicalId> {
        self.order.iter().rev().map(|&i| &self.nodes[i]).collect()
    }

    /// Direct dependencies of a resource
    pub fn dependencies(&self, id: &LogicalId) -> Vec<&LogicalId> {
        self.neighbours(id, &self.dependencies)
    }

    /// Direct dependents of a resource
    pub fn dependents(&self, id: &LogicalId) -> Vec<&LogicalId> {
        self.neighbours(id, &self.dependents)
    }

    /// Every resource transitively depending on `id`, in topological order
    pub fn descendants(&self, id: &LogicalId) -> Vec<&LogicalId> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };

        let mut seen = vec![false; self.nodes.len()];
        let mut queue: VecDeque<usize> = self.dependents[start].iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if !seen[node] {
                seen[node] = true;
                queue.extend(self.dependents[node].iter().copied());
            }
        }

        self.order
            .iter()
            .filter(|&&i| seen[i])
            .map(|&i| &self.nodes[i])
            .collect()
    }

    /// All edges `(dependency, dependent)` in declaration order of the dependent
    pub fn edges(&self) -> Vec<(&LogicalId, &LogicalId)> {
        self.dependencies
            .iter()
            .enumerate()
            .flat_map(|(r, deps)| deps.iter().map(move |&d| (&self.nodes[d], &self.nodes[r])))
            .collect()
    }

    /// Position of a resource in the topological order
    pub fn position(&self, id: &LogicalId) -> Option<usize> {
        let node = *self.index.get(id)?;
        self.order.iter().position(|&i| i == node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn neighbours<'a>(&'a self, id: &LogicalId, adj: &'a [Vec<usize>]) -> Vec<&'a LogicalId> {
        self.index
            .get(id)
            .map(|&i| adj[i].iter().map(|&n| &self.nodes[n]).collect())
            .unwrap_or_default()
    }
}
