// crates/rule-orchestrator-core/src/runtime/graph.rs
// ============================================================================
// Module: Reference Graph Walks
// Description: Cycle detection and dependency ordering over rule references.
// Purpose: Report reference cycles as data and order dependencies safely.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! The reference graph maps each document to the loaded documents it points
//! at. Both walks are depth-first with an explicit in-progress set, so cyclic
//! graphs always terminate.
//!
//! Cycles are reported in canonical form: rotated so the lexicographically
//! smallest path comes first, without repeating the first node at the end.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::identifiers::RulePath;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Document to referenced documents.
pub type ReferenceGraph = BTreeMap<RulePath, BTreeSet<RulePath>>;

/// Dependency order for one document.
///
/// # Invariants
/// - When `cycle` is `None`, every dependency precedes its dependents and the
///   requested document is last.
/// - When `cycle` is `Some`, `order` is best effort: the dependencies fully
///   resolved before the cycle was hit, followed by the requested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyOrder {
    /// Documents in load order.
    pub order: Vec<RulePath>,
    /// Cycle encountered while ordering, in canonical rotation.
    pub cycle: Option<Vec<RulePath>>,
}

impl DependencyOrder {
    /// Returns true when no cycle interrupted the walk.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.cycle.is_none()
    }
}

/// Visit state for dependency ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path.
    InProgress,
    /// Fully ordered.
    Done,
}

/// Cycle hit while ordering; caught at the public boundary.
struct DependencyCycle(Vec<RulePath>);

// ============================================================================
// SECTION: Cycle Detection
// ============================================================================

/// Finds reference cycles, each reported once in canonical rotation.
#[must_use]
pub fn detect_cycles(graph: &ReferenceGraph) -> Vec<Vec<RulePath>> {
    let mut visited = BTreeSet::new();
    let mut on_stack = BTreeSet::new();
    let mut path = Vec::new();
    let mut cycles = BTreeSet::new();
    for node in graph.keys() {
        if !visited.contains(node) {
            cycle_dfs(node, graph, &mut visited, &mut on_stack, &mut path, &mut cycles);
        }
    }
    cycles.into_iter().collect()
}

/// Depth-first walk recording every back edge as a cycle.
fn cycle_dfs(
    node: &RulePath,
    graph: &ReferenceGraph,
    visited: &mut BTreeSet<RulePath>,
    on_stack: &mut BTreeSet<RulePath>,
    path: &mut Vec<RulePath>,
    cycles: &mut BTreeSet<Vec<RulePath>>,
) {
    visited.insert(node.clone());
    on_stack.insert(node.clone());
    path.push(node.clone());
    for next in graph.get(node).into_iter().flatten() {
        if on_stack.contains(next) {
            if let Some(start) = path.iter().position(|entry| entry == next) {
                cycles.insert(canonical_cycle(&path[start..]));
            }
        } else if !visited.contains(next) {
            cycle_dfs(next, graph, visited, on_stack, path, cycles);
        }
    }
    path.pop();
    on_stack.remove(node);
}

/// Rotates a cycle so its smallest member comes first.
#[must_use]
pub fn canonical_cycle(cycle: &[RulePath]) -> Vec<RulePath> {
    let Some(start) =
        cycle.iter().enumerate().min_by(|(_, left), (_, right)| left.cmp(right)).map(|(idx, _)| idx)
    else {
        return Vec::new();
    };
    cycle[start..].iter().chain(cycle[..start].iter()).cloned().collect()
}

// ============================================================================
// SECTION: Dependency Ordering
// ============================================================================

/// Orders the transitive dependencies of `start`, dependencies first.
///
/// A cycle never fails the call: the walk stops, and the result carries the
/// partial order plus the cycle.
#[must_use]
pub fn resolve_dependencies(graph: &ReferenceGraph, start: &RulePath) -> DependencyOrder {
    let mut marks = BTreeMap::new();
    let mut order = Vec::new();
    let mut stack = Vec::new();
    match order_dfs(start, graph, &mut marks, &mut order, &mut stack) {
        Ok(()) => DependencyOrder {
            order,
            cycle: None,
        },
        Err(DependencyCycle(cycle)) => {
            if !order.contains(start) {
                order.push(start.clone());
            }
            DependencyOrder {
                order,
                cycle: Some(canonical_cycle(&cycle)),
            }
        }
    }
}

/// Post-order walk; an in-progress node seen again is a cycle.
fn order_dfs(
    node: &RulePath,
    graph: &ReferenceGraph,
    marks: &mut BTreeMap<RulePath, Mark>,
    order: &mut Vec<RulePath>,
    stack: &mut Vec<RulePath>,
) -> Result<(), DependencyCycle> {
    match marks.get(node) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = stack.iter().position(|entry| entry == node).unwrap_or_default();
            return Err(DependencyCycle(stack[start..].to_vec()));
        }
        None => {}
    }
    marks.insert(node.clone(), Mark::InProgress);
    stack.push(node.clone());
    for next in graph.get(node).into_iter().flatten() {
        order_dfs(next, graph, marks, order, stack)?;
    }
    stack.pop();
    marks.insert(node.clone(), Mark::Done);
    order.push(node.clone());
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
