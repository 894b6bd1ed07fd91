// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Explicit dependency edges between provisioning steps.
//!
//! Ordering is resolved once at deployment time from these edges; nothing
//! polls at runtime.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::error::{Result, StackError};
use crate::resources::ResourceId;

/// Directed graph where an edge `a -> b` means "a waits for b".
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node. Declaring the same id twice is an error.
    pub fn add_node(&mut self, id: &ResourceId) -> Result<()> {
        if self.edges.contains_key(id) {
            return Err(StackError::DuplicateResource(id.to_string()));
        }
        self.edges.insert(id.clone(), BTreeSet::new());
        Ok(())
    }

    /// Whether a node exists.
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.edges.contains_key(id)
    }

    /// Make `dependent` wait for `dependency`.
    pub fn add_dependency(
        &mut self,
        dependent: &ResourceId,
        dependency: &ResourceId,
    ) -> Result<()> {
        if dependent == dependency {
            return Err(StackError::SelfDependency(dependent.to_string()));
        }
        if !self.contains(dependency) {
            return Err(StackError::UnknownResource(dependency.to_string()));
        }
        self.edges
            .get_mut(dependent)
            .ok_or_else(|| StackError::UnknownResource(dependent.to_string()))?
            .insert(dependency.clone());
        Ok(())
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, id: &ResourceId) -> impl Iterator<Item = &ResourceId> {
        self.edges.get(id).into_iter().flatten()
    }

    /// Whether `dependent` waits, directly or transitively, for `dependency`.
    pub fn depends_on(&self, dependent: &ResourceId, dependency: &ResourceId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&ResourceId> = self.dependencies_of(dependent).collect();

        while let Some(next) = stack.pop() {
            if next == dependency {
                return true;
            }
            if seen.insert(next) {
                stack.extend(self.dependencies_of(next));
            }
        }
        false
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Order in which resources can be provisioned.
    ///
    /// Kahn's algorithm with ties broken by identifier, so the order is
    /// deterministic for a given graph.
    pub fn topological_order(&self) -> Result<Vec<ResourceId>> {
        let mut remaining: BTreeMap<&ResourceId, usize> = self
            .edges
            .iter()
            .map(|(id, deps)| (id, deps.len()))
            .collect();

        let mut dependents: BTreeMap<&ResourceId, Vec<&ResourceId>> = BTreeMap::new();
        for (id, deps) in &self.edges {
            for dep in deps {
                dependents.entry(dep).or_default().push(id);
            }
        }

        let mut ready: BTreeSet<&ResourceId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.edges.len());

        while let Some(next) = ready.pop_first() {
            remaining.remove(next);
            order.push(next.clone());

            for dependent in dependents.get(next).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if !remaining.is_empty() {
            return Err(StackError::Cycle(
                remaining.keys().map(|id| id.to_string()).collect(),
            ));
        }

        Ok(order)
    }
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(&self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s)
    }

    fn graph(nodes: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for node in nodes {
            graph.add_node(&id(node)).unwrap();
        }
        graph
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let mut g = graph(&["service", "url", "extension", "database"]);
        g.add_dependency(&id("service"), &id("url")).unwrap();
        g.add_dependency(&id("url"), &id("extension")).unwrap();
        g.add_dependency(&id("extension"), &id("database")).unwrap();

        let order = g.topological_order().unwrap();
        let names: Vec<&str> = order.iter().map(ResourceId::as_str).collect();
        assert_eq!(names, vec!["database", "extension", "url", "service"]);
    }

    #[test]
    fn test_topological_order_is_deterministic() {
        let g = graph(&["c", "a", "b"]);
        let names: Vec<String> = g
            .topological_order()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut g = graph(&["a", "b", "c"]);
        g.add_dependency(&id("a"), &id("b")).unwrap();
        g.add_dependency(&id("b"), &id("a")).unwrap();

        match g.topological_order() {
            Err(StackError::Cycle(nodes)) => assert_eq!(nodes, vec!["a", "b"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_transitive_dependency() {
        let mut g = graph(&["a", "b", "c"]);
        g.add_dependency(&id("a"), &id("b")).unwrap();
        g.add_dependency(&id("b"), &id("c")).unwrap();

        assert!(g.depends_on(&id("a"), &id("c")));
        assert!(!g.depends_on(&id("c"), &id("a")));
    }

    #[test]
    fn test_invalid_edges_rejected() {
        let mut g = graph(&["a"]);
        assert!(matches!(
            g.add_dependency(&id("a"), &id("missing")),
            Err(StackError::UnknownResource(_))
        ));
        assert!(matches!(
            g.add_dependency(&id("a"), &id("a")),
            Err(StackError::SelfDependency(_))
        ));
        assert!(matches!(
            g.add_node(&id("a")),
            Err(StackError::DuplicateResource(_))
        ));
    }
}
