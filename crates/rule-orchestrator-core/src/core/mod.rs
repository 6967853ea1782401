// crates/rule-orchestrator-core/src/core/mod.rs
// ============================================================================
// Module: Rule Orchestrator Core Types
// Description: Identifiers, documents, inheritance records, and clocks.
// Purpose: Shared data model for the parser, hierarchy, cache, and sync layers.
// Dependencies: serde, serde_json, sha2, time
// ============================================================================

//! ## Overview
//! Plain data types with no I/O. Runtime components in [`crate::runtime`]
//! produce and consume them.

pub mod hashing;
pub mod identifiers;
pub mod inheritance;
pub mod rule;
pub mod sync;
pub mod time;
