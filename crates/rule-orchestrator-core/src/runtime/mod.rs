// crates/rule-orchestrator-core/src/runtime/mod.rs
// ============================================================================
// Module: Rule Orchestrator Runtime
// Description: Parser, cache, hierarchy analysis, graph walks, and composition.
// Purpose: Turn a directory of rule files into composed artifacts.
// Dependencies: crate::core, regex, serde_yaml
// ============================================================================

//! ## Overview
//! [`parser::RuleParser`] turns files into documents,
//! [`hierarchy::HierarchyManager`] builds immutable snapshots over them,
//! [`compose`] folds inheritance chains, [`graph`] walks the reference graph,
//! and [`cache::RuleCache`] memoizes composed results.

pub mod cache;
pub mod compose;
pub mod graph;
pub mod hierarchy;
pub mod parser;
