// crates/rule-orchestrator-core/src/lib.rs
// ============================================================================
// Module: Rule Orchestrator Core Library
// Description: Rule parsing, hierarchy analysis, composition, and caching.
// Purpose: Deterministic engine for hierarchical rule documents.
// Dependencies: regex, serde, serde_json, serde_yaml, sha2, time
// ============================================================================

//! ## Overview
//! The core crate loads a directory of rule documents, infers single-parent
//! inheritance between them, and composes any document with its ancestors
//! into one effective artifact.
//! Invariants:
//! - Hierarchy snapshots are immutable; a rescan produces a new snapshot.
//! - Composition is deterministic for a given snapshot.
//! - Reference cycles are reported as data and never abort analysis.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::EngineEvent;
pub use audit::EventLevel;
pub use audit::EventSink;
pub use audit::FileEventSink;
pub use audit::MemoryEventSink;
pub use audit::NoopEventSink;
pub use audit::SharedEventSink;
pub use audit::StderrEventSink;
pub use core::hashing;
pub use core::hashing::HashAlgorithm;
pub use core::hashing::HashDigest;
pub use core::identifiers::ClientId;
pub use core::identifiers::RequestId;
pub use core::identifiers::RulePath;
pub use core::identifiers::SubscriptionId;
pub use core::inheritance::CompositionKind;
pub use core::inheritance::CompositionMetadata;
pub use core::inheritance::CompositionResult;
pub use core::inheritance::InheritanceEdge;
pub use core::inheritance::InheritanceKind;
pub use core::rule::FileStats;
pub use core::rule::RuleCategory;
pub use core::rule::RuleContent;
pub use core::rule::RuleFormat;
pub use core::rule::RuleMetadata;
pub use core::rule::SectionMap;
pub use core::rule::VariableMap;
pub use core::sync::ConflictStrategy;
pub use core::sync::SyncOperation;
pub use core::sync::SyncStatus;
pub use core::time::Clock;
pub use core::time::ManualClock;
pub use core::time::SharedClock;
pub use core::time::SystemClock;
pub use core::time::duration_millis;
pub use core::time::format_millis;
pub use core::time::system_time_millis;
pub use runtime::cache::CacheStats;
pub use runtime::cache::DEFAULT_CACHE_CAPACITY;
pub use runtime::cache::DEFAULT_CACHE_TTL;
pub use runtime::cache::RuleCache;
pub use runtime::compose::display_value;
pub use runtime::compose::render_document;
pub use runtime::graph::DependencyOrder;
pub use runtime::graph::ReferenceGraph;
pub use runtime::hierarchy::DanglingReference;
pub use runtime::hierarchy::HierarchyError;
pub use runtime::hierarchy::HierarchyInfo;
pub use runtime::hierarchy::HierarchyManager;
pub use runtime::hierarchy::HierarchySnapshot;
pub use runtime::hierarchy::HierarchyStatistics;
pub use runtime::hierarchy::RuleTreeNode;
pub use runtime::hierarchy::SkippedFile;
pub use runtime::hierarchy::ValidationReport;
pub use runtime::parser::DEFAULT_MAX_FILE_BYTES;
pub use runtime::parser::ParseError;
pub use runtime::parser::RuleParser;
pub use runtime::parser::split_front_matter;
