//! Dependency graph for work packages
//!
//! Owns the work packages and the edges between them. Uses petgraph for the
//! edge store, so the "requires" and "required by" views of a package are
//! two directions of the same edge and cannot drift apart.
//!
//! Edges may name ids that are not registered yet. Those are kept as pending
//! raw edges, promoted once both endpoints exist, and otherwise reported by
//! [`DependencyGraph::validate_dependencies`].

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;

use super::work_package::WorkPackage;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("Circular dependency detected involving: {}", .0.join(", "))]
    CircularDependency(Vec<String>),

    #[error("Work package not found: {0}")]
    WorkPackageNotFound(String),
}

/// A dependency graph for work packages
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph. Edge direction is
    /// `dependency -> dependent`, i.e. "must finish before".
    pub(super) graph: DiGraph<WorkPackage, ()>,

    /// Map from work package id to node index
    node_map: HashMap<String, NodeIndex>,

    /// Raw edges (`from` requires `to`) with at least one unregistered endpoint
    pending: BTreeMap<String, BTreeSet<String>>,
}

/// Levels a [`DependencyTree`] expands before it stops listing children
pub const MAX_TREE_DEPTH: usize = 64;

/// Recursive view of a work package and everything it requires
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyTree {
    pub id: String,
    pub title: String,
    pub dependencies: Vec<DependencyTree>,

    /// Children were left out at [`MAX_TREE_DEPTH`]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl DependencyTree {
    fn fmt_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        let more = if self.truncated { " ..." } else { "" };
        writeln!(f, "{}{} - {}{}", "  ".repeat(depth), self.id, self.title, more)?;
        for child in &self.dependencies {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for DependencyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a work package, replacing any package with the same id
    ///
    /// Replacing keeps existing edges. Pending edges that touch this id are
    /// promoted if their other endpoint is registered.
    pub fn add_work_package(&mut self, wp: WorkPackage) {
        let id = wp.id.clone();
        match self.node_map.get(&id) {
            Some(&idx) => self.graph[idx] = wp,
            None => {
                let idx = self.graph.add_node(wp);
                self.node_map.insert(id.clone(), idx);
            }
        }
        self.promote_pending(&id);
    }

    /// Records that `from` requires `to`
    ///
    /// Returns true if the dependency was not already recorded. Unregistered
    /// endpoints are not an error; the edge is kept as pending.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> bool {
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&from_idx), Some(&to_idx)) => {
                if self.graph.find_edge(to_idx, from_idx).is_some() {
                    return false;
                }
                self.graph.add_edge(to_idx, from_idx, ());
                true
            }
            _ => self
                .pending
                .entry(from.to_string())
                .or_default()
                .insert(to.to_string()),
        }
    }

    fn promote_pending(&mut self, id: &str) {
        let ready: Vec<(String, String)> = self
            .pending
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.clone(), to.clone())))
            .filter(|(from, to)| {
                (from == id || to == id)
                    && self.node_map.contains_key(from)
                    && self.node_map.contains_key(to)
            })
            .collect();

        for (from, to) in ready {
            if let Some(tos) = self.pending.get_mut(&from) {
                tos.remove(&to);
                if tos.is_empty() {
                    self.pending.remove(&from);
                }
            }
            self.add_dependency(&from, &to);
        }
    }

    pub(super) fn index(&self, id: &str) -> Result<NodeIndex, GraphError> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::WorkPackageNotFound(id.to_string()))
    }

    pub(super) fn id_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].id
    }

    /// Indices of the packages `idx` requires, in insertion order
    pub(super) fn dependency_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(idx, Direction::Incoming)
    }

    /// Indices of the packages that require `idx`, in insertion order
    pub(super) fn dependent_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(idx, Direction::Outgoing)
    }

    fn sorted_neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<_> = self.graph.neighbors_directed(idx, dir).collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    pub(super) fn cycle_error(&self, path: &[NodeIndex], idx: NodeIndex) -> GraphError {
        let start = path.iter().position(|&p| p == idx).unwrap_or(0);
        GraphError::CircularDependency(
            path[start..]
                .iter()
                .map(|&p| self.id_of(p).to_string())
                .collect(),
        )
    }

    /// Returns the direct dependencies of a work package
    pub fn dependencies(&self, id: &str) -> Vec<String> {
        match self.node_map.get(id) {
            Some(&idx) => self
                .dependency_indices(idx)
                .into_iter()
                .map(|i| self.id_of(i).to_string())
                .collect(),
            None => vec![],
        }
    }

    /// Returns the direct dependents of a work package (packages that require it)
    pub fn dependents(&self, id: &str) -> Vec<String> {
        match self.node_map.get(id) {
            Some(&idx) => self
                .dependent_indices(idx)
                .into_iter()
                .map(|i| self.id_of(i).to_string())
                .collect(),
            None => vec![],
        }
    }

    /// Returns every recorded requirement of `id`, including pending ones
    pub fn raw_dependencies(&self, id: &str) -> BTreeSet<String> {
        let mut deps: BTreeSet<String> = self.dependencies(id).into_iter().collect();
        if let Some(pending) = self.pending.get(id) {
            deps.extend(pending.iter().cloned());
        }
        deps
    }

    /// Returns ids of packages with no dependencies, in insertion order
    pub fn independent_work_packages(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.id_of(idx).to_string())
            .collect()
    }

    /// Length of the longest chain of requirements below `id`
    ///
    /// Zero for packages with no dependencies. Walks the requirements with an
    /// explicit stack, so chain length is bounded by memory only.
    pub fn dependency_depth(&self, id: &str) -> Result<usize, GraphError> {
        let root = self.index(id)?;
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        let mut on_path: HashSet<NodeIndex> = HashSet::from([root]);
        let mut stack = vec![(root, self.dependency_indices(root), 0usize)];

        while let Some((idx, deps, next)) = stack.last_mut() {
            if let Some(&dep) = deps.get(*next) {
                *next += 1;
                if depth.contains_key(&dep) {
                    continue;
                }
                if on_path.contains(&dep) {
                    let path: Vec<NodeIndex> = stack.iter().map(|frame| frame.0).collect();
                    return Err(self.cycle_error(&path, dep));
                }
                on_path.insert(dep);
                stack.push((dep, self.dependency_indices(dep), 0));
            } else {
                let idx = *idx;
                let below = deps
                    .iter()
                    .filter_map(|dep| depth.get(dep))
                    .map(|d| d + 1)
                    .max()
                    .unwrap_or(0);
                on_path.remove(&idx);
                depth.insert(idx, below);
                stack.pop();
            }
        }

        Ok(depth.get(&root).copied().unwrap_or(0))
    }

    /// Builds the tree of everything `id` requires, for diagnostics
    ///
    /// A dependency already on the current branch is listed without children.
    /// Branches deeper than [`MAX_TREE_DEPTH`] are cut and marked truncated.
    pub fn dependency_tree(&self, id: &str) -> Option<DependencyTree> {
        let idx = self.node_map.get(id).copied()?;
        let mut path = Vec::new();
        Some(self.tree_of(idx, &mut path))
    }

    fn tree_of(&self, idx: NodeIndex, path: &mut Vec<NodeIndex>) -> DependencyTree {
        let wp = &self.graph[idx];
        let mut tree = DependencyTree {
            id: wp.id.clone(),
            title: wp.title.clone(),
            dependencies: Vec::new(),
            truncated: false,
        };
        if path.contains(&idx) {
            return tree;
        }
        let deps = self.dependency_indices(idx);
        if path.len() >= MAX_TREE_DEPTH {
            tree.truncated = !deps.is_empty();
            return tree;
        }

        path.push(idx);
        tree.dependencies = deps.into_iter().map(|dep| self.tree_of(dep, path)).collect();
        path.pop();
        tree
    }

    /// Checks the graph for dangling and circular dependencies
    ///
    /// Never fails; returns one human-readable finding per problem.
    pub fn validate_dependencies(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (from, tos) in &self.pending {
            for to in tos {
                let finding = match (self.contains(from), self.contains(to)) {
                    (true, false) => format!(
                        "Missing dependency: {} depends on unknown work package {}",
                        from, to
                    ),
                    (false, true) => format!(
                        "Missing dependency: unknown work package {} depends on {}",
                        from, to
                    ),
                    (false, false) => format!(
                        "Missing dependency: unknown work package {} depends on unknown work package {}",
                        from, to
                    ),
                    (true, true) => continue,
                };
                errors.push(finding);
            }
        }

        for (from, tos) in &self.pending {
            if !self.contains(from) {
                continue;
            }
            for to in tos.iter().filter(|to| !self.contains(to)) {
                errors.push(format!(
                    "Orphaned dependency: {} requires unregistered work package {}",
                    from, to
                ));
            }
        }

        if let Err(e) = self.topological_sort() {
            errors.push(e.to_string());
        }

        errors
    }

    /// Returns the work package with the given id
    pub fn work_package(&self, id: &str) -> Option<&WorkPackage> {
        self.node_map.get(id).map(|&idx| &self.graph[idx])
    }

    /// Returns all work packages in insertion order
    pub fn work_packages(&self) -> impl Iterator<Item = &WorkPackage> {
        self.graph.node_weights()
    }

    /// Returns all ids in insertion order
    pub fn ids(&self) -> Vec<String> {
        self.graph.node_weights().map(|wp| wp.id.clone()).collect()
    }

    /// Returns true if the graph contains the work package
    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Returns the number of work packages in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Sum of every package's estimate, in hours
    pub fn total_estimated_hours(&self) -> f64 {
        self.graph.node_weights().map(|wp| wp.estimated_hours).sum()
    }
}
