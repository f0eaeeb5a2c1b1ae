// ABOUTME: Dependency bookkeeping for submitted tasks
// ABOUTME: Mirrors prerequisite edges into a graph for cycle warnings and queries

use petgraph::algo::is_cyclic_directed;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::HashMap;

use super::task::TaskId;

/// Prerequisite edges between submitted tasks. Gating itself happens
/// inside each task's `execute`; the tracker exists so the runner can warn
/// about cycles at submission time and answer introspection queries.
#[derive(Default)]
pub struct DependencyTracker {
    graph: StableDiGraph<TaskId, ()>,
    nodes: HashMap<TaskId, NodeIndex>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, id: TaskId) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&id) {
            return index;
        }
        let index = self.graph.add_node(id);
        self.nodes.insert(id, index);
        index
    }

    /// Record that `dependent` waits on `prerequisite`.
    pub fn record(&mut self, prerequisite: TaskId, dependent: TaskId) {
        let from = self.ensure_node(prerequisite);
        let to = self.ensure_node(dependent);
        self.graph.add_edge(from, to, ());
    }

    /// True when the recorded edges contain a cycle. Cyclic tasks gate
    /// each other forever; the runner warns but accepts them.
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Tasks that list `id` as a prerequisite.
    pub fn dependents(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Tasks `id` waits on.
    pub fn prerequisites(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: TaskId, direction: Direction) -> Vec<TaskId> {
        let Some(&index) = self.nodes.get(&id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(index, direction)
            .map(|neighbor| self.graph[neighbor])
            .collect()
    }

    /// Drop a finished task. Its edges go with it; dependents keep their
    /// own handle-level gating.
    pub fn prune(&mut self, id: TaskId) {
        if let Some(index) = self.nodes.remove(&id) {
            self.graph.remove_node(index);
        }
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_edges_both_directions() {
        let mut tracker = DependencyTracker::new();
        tracker.record(1, 3);
        tracker.record(2, 3);

        assert_eq!(tracker.dependents(1), vec![3]);
        let mut prerequisites = tracker.prerequisites(3);
        prerequisites.sort_unstable();
        assert_eq!(prerequisites, vec![1, 2]);
        assert!(tracker.prerequisites(1).is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        let mut tracker = DependencyTracker::new();
        tracker.record(1, 2);
        assert!(!tracker.has_cycle());
        tracker.record(2, 1);
        assert!(tracker.has_cycle());
    }

    #[test]
    fn test_prune_removes_node_and_edges() {
        let mut tracker = DependencyTracker::new();
        tracker.record(1, 2);
        tracker.prune(1);

        assert!(tracker.prerequisites(2).is_empty());
        assert_eq!(tracker.len(), 1);
    }
}
