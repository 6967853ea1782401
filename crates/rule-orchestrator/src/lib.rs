// crates/rule-orchestrator/src/lib.rs
// ============================================================================
// Module: Rule Orchestrator Library
// Description: Facade over hierarchy loading, composition, and client sync.
// Purpose: Single entry point for embedding the rule orchestrator.
// Dependencies: rule-orchestrator-core, rule-orchestrator-config, rule-orchestrator-sync
// ============================================================================

//! ## Overview
//! [`Orchestrator`] owns one parser, hierarchy manager, composition cache,
//! and client integrator built from an [`OrchestratorConfig`]. Composition
//! always reloads the rule root and caches results under the path plus the
//! snapshot hash, so edits on disk are never served stale.
//!
//! [`OrchestratorConfig`]: rule_orchestrator_config::OrchestratorConfig

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod error;
pub mod orchestrator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::CatalogEntry;
pub use catalog::scan_catalog;
pub use error::OrchestratorError;
pub use orchestrator::ComponentHealth;
pub use orchestrator::ComposedRule;
pub use orchestrator::HealthStatus;
pub use orchestrator::Orchestrator;
pub use orchestrator::OrchestratorInfo;
pub use orchestrator::RescanSummary;
