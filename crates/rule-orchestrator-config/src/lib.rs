// crates/rule-orchestrator-config/src/lib.rs
// ============================================================================
// Module: Rule Orchestrator Config Library
// Description: Canonical config model and fail-closed validation.
// Purpose: Single source of truth for rule-orchestrator.toml semantics.
// Dependencies: rule-orchestrator-core, serde, toml
// ============================================================================

//! ## Overview
//! `rule-orchestrator-config` defines the configuration model for the rule
//! orchestrator: the rule root, cache sizing, sync bookkeeping limits, event
//! logging, and the statically registered synchronization clients.
//! Client registrations are validated here so the sync crate and the config
//! loader share one rule set.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
