//! Scheduling algorithms over a [`DependencyGraph`]
//!
//! - [`DependencyGraph::topological_sort`]: Kahn's algorithm, highest priority
//!   first among ready packages, stable on ties
//! - [`DependencyGraph::find_parallel_groups`]: greedy partition into
//!   packages that may run together
//! - [`DependencyGraph::critical_path`]: longest chain by cumulative duration

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::graph::{DependencyGraph, GraphError};

/// The dependency chain with the greatest cumulative duration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Ids from the first package to run to the last
    pub ids: Vec<String>,

    /// Cumulative estimate of the chain, in hours
    pub hours: f64,
}

impl CriticalPath {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|p| p == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl DependencyGraph {
    /// Returns all ids ordered so that every dependency precedes its dependents
    ///
    /// Among packages that are ready at the same time the one with the highest
    /// priority goes first; equal priorities keep their queue order.
    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        Ok(self
            .topological_indices()?
            .into_iter()
            .map(|idx| self.id_of(idx).to_string())
            .collect())
    }

    fn topological_indices(&self) -> Result<Vec<NodeIndex>, GraphError> {
        let node_count = self.graph.node_count();
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.dependency_indices(idx).len())
            .collect();

        // Max-heap on priority; the push sequence keeps equal priorities FIFO
        let mut ready = BinaryHeap::new();
        let mut pushed = 0usize;
        for idx in self.graph.node_indices() {
            if in_degree[idx.index()] == 0 {
                ready.push((self.graph[idx].priority, Reverse(pushed), idx));
                pushed += 1;
            }
        }

        let mut order = Vec::with_capacity(node_count);
        while let Some((_, _, idx)) = ready.pop() {
            order.push(idx);

            for dependent in self.dependent_indices(idx) {
                let degree = &mut in_degree[dependent.index()];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.push((self.graph[dependent].priority, Reverse(pushed), dependent));
                    pushed += 1;
                }
            }
        }

        if order.len() < node_count {
            let mut emitted = vec![false; node_count];
            for idx in &order {
                emitted[idx.index()] = true;
            }
            let unprocessed = self
                .graph
                .node_indices()
                .filter(|idx| !emitted[idx.index()])
                .map(|idx| self.id_of(idx).to_string())
                .collect();
            return Err(GraphError::CircularDependency(unprocessed));
        }

        Ok(order)
    }

    /// Partitions the packages into groups that can execute concurrently
    ///
    /// Groups run in list order. Group `n` is what a greedy scan of the
    /// topological order collects once groups `0..n` are done: every package
    /// whose dependencies all sit in earlier groups. That is one more than the
    /// highest group among its dependencies, so a single pass over the order
    /// places everything. Members keep their topological order. This is not a
    /// minimum partition.
    pub fn find_parallel_groups(&self) -> Result<Vec<Vec<String>>, GraphError> {
        let order = self.topological_indices()?;
        let mut level = vec![0usize; self.graph.node_count()];
        let mut groups: Vec<Vec<String>> = Vec::new();

        for idx in order {
            let group = self
                .dependency_indices(idx)
                .iter()
                .map(|dep| level[dep.index()] + 1)
                .max()
                .unwrap_or(0);
            level[idx.index()] = group;

            if groups.len() <= group {
                groups.resize_with(group + 1, Vec::new);
            }
            groups[group].push(self.id_of(idx).to_string());
        }

        Ok(groups)
    }

    /// Finds the chain with the greatest cumulative estimated duration
    ///
    /// `longest(p) = hours(p) + max(longest(d))` over the dependents `d` of `p`,
    /// filled in reverse topological order so every dependent is known before
    /// the package itself. Every package is considered as a start; the first
    /// one in insertion order wins ties, as does the first dependent.
    pub fn critical_path(&self) -> Result<CriticalPath, GraphError> {
        let order = self.topological_indices()?;
        let mut longest: Vec<(f64, Option<NodeIndex>)> =
            vec![(0.0, None); self.graph.node_count()];

        for &idx in order.iter().rev() {
            let mut best: Option<(f64, NodeIndex)> = None;
            for dependent in self.dependent_indices(idx) {
                let length = longest[dependent.index()].0;
                if best.map_or(true, |(best_len, _)| length > best_len) {
                    best = Some((length, dependent));
                }
            }
            longest[idx.index()] = (
                self.graph[idx].estimated_hours + best.map_or(0.0, |(len, _)| len),
                best.map(|(_, next)| next),
            );
        }

        let mut start: Option<(f64, NodeIndex)> = None;
        for idx in self.graph.node_indices() {
            let length = longest[idx.index()].0;
            if start.map_or(true, |(best_len, _)| length > best_len) {
                start = Some((length, idx));
            }
        }

        let Some((hours, start)) = start else {
            return Ok(CriticalPath::default());
        };

        let mut ids = Vec::new();
        let mut cursor = Some(start);
        while let Some(idx) = cursor {
            ids.push(self.id_of(idx).to_string());
            cursor = longest[idx.index()].1;
        }

        Ok(CriticalPath { ids, hours })
    }
}
