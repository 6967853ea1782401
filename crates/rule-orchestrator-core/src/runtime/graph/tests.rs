// crates/rule-orchestrator-core/src/runtime/graph/tests.rs
// ============================================================================
// Module: Reference Graph Walk Tests
// Description: Unit tests for cycle rotation and the depth-first walkers.
// Purpose: Pin canonical cycle form and post-order dependency output.
// Dependencies: rule-orchestrator-core
// ============================================================================

//! ## Overview
//! Exercises the private walkers directly so rotation and visit marking are
//! checked independently of hierarchy loading.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use super::Mark;
use super::ReferenceGraph;
use super::canonical_cycle;
use super::detect_cycles;
use super::order_dfs;
use super::resolve_dependencies;
use crate::core::identifiers::RulePath;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds rule paths from literals.
fn paths(names: &[&str]) -> Vec<RulePath> {
    names.iter().map(RulePath::new).collect()
}

/// Builds a reference graph from `(from, to)` edges.
fn graph(edges: &[(&str, &str)]) -> ReferenceGraph {
    let mut graph = ReferenceGraph::new();
    for (from, to) in edges {
        graph.entry(RulePath::new(from)).or_default().insert(RulePath::new(to));
        graph.entry(RulePath::new(to)).or_default();
    }
    graph
}

// ============================================================================
// SECTION: Rotation
// ============================================================================

#[test]
fn canonical_cycle_of_nothing_is_empty() {
    assert!(canonical_cycle(&[]).is_empty());
}

#[test]
fn canonical_cycle_keeps_a_single_node() {
    assert_eq!(canonical_cycle(&paths(&["solo.md"])), paths(&["solo.md"]));
}

#[test]
fn canonical_cycle_rotates_smallest_member_first() {
    let rotated = canonical_cycle(&paths(&["c.md", "a.md", "b.md"]));
    assert_eq!(rotated, paths(&["a.md", "b.md", "c.md"]));
}

#[test]
fn canonical_cycle_preserves_direction() {
    let rotated = canonical_cycle(&paths(&["b.md", "c.md", "a.md"]));
    assert_eq!(rotated, paths(&["a.md", "b.md", "c.md"]));
    let reversed = canonical_cycle(&paths(&["b.md", "a.md", "c.md"]));
    assert_eq!(reversed, paths(&["a.md", "c.md", "b.md"]));
}

// ============================================================================
// SECTION: Cycle Detection
// ============================================================================

#[test]
fn self_reference_is_a_one_node_cycle() {
    let cycles = detect_cycles(&graph(&[("loop.md", "loop.md")]));
    assert_eq!(cycles, vec![paths(&["loop.md"])]);
}

#[test]
fn mutual_references_are_reported_once() {
    let cycles = detect_cycles(&graph(&[("a.md", "b.md"), ("b.md", "a.md")]));
    assert_eq!(cycles, vec![paths(&["a.md", "b.md"])]);
}

#[test]
fn acyclic_graph_reports_no_cycles() {
    let cycles = detect_cycles(&graph(&[("a.md", "b.md"), ("a.md", "c.md"), ("b.md", "c.md")]));
    assert!(cycles.is_empty());
}

// ============================================================================
// SECTION: Dependency Ordering
// ============================================================================

#[test]
fn diamond_orders_shared_dependency_once() {
    let graph = graph(&[("a.md", "b.md"), ("a.md", "c.md"), ("b.md", "d.md"), ("c.md", "d.md")]);
    let resolved = resolve_dependencies(&graph, &RulePath::new("a.md"));
    assert!(resolved.is_complete());
    assert_eq!(resolved.order, paths(&["d.md", "b.md", "c.md", "a.md"]));
}

#[test]
fn cycle_below_start_keeps_start_last() {
    let graph = graph(&[("a.md", "b.md"), ("b.md", "c.md"), ("c.md", "b.md")]);
    let resolved = resolve_dependencies(&graph, &RulePath::new("a.md"));
    assert_eq!(resolved.cycle, Some(paths(&["b.md", "c.md"])));
    assert_eq!(resolved.order, paths(&["a.md"]));
}

#[test]
fn order_walk_skips_nodes_already_done() {
    let graph = graph(&[("a.md", "b.md")]);
    let mut marks = BTreeMap::from([(RulePath::new("a.md"), Mark::Done)]);
    let mut order = Vec::new();
    let mut stack = Vec::new();
    assert!(order_dfs(&RulePath::new("a.md"), &graph, &mut marks, &mut order, &mut stack).is_ok());
    assert!(order.is_empty());
    assert!(stack.is_empty());
}

#[test]
fn order_walk_reports_in_progress_node_as_cycle() {
    let graph = graph(&[("a.md", "b.md"), ("b.md", "a.md")]);
    let mut marks = BTreeMap::new();
    let mut order = Vec::new();
    let mut stack = Vec::new();
    let Err(cycle) = order_dfs(&RulePath::new("a.md"), &graph, &mut marks, &mut order, &mut stack)
    else {
        panic!("expected a cycle");
    };
    assert_eq!(cycle.0, paths(&["a.md", "b.md"]));
    assert_eq!(marks.get(&RulePath::new("b.md")), Some(&Mark::InProgress));
    let unvisited: BTreeSet<_> = graph.keys().filter(|key| !marks.contains_key(*key)).collect();
    assert!(unvisited.is_empty());
}
