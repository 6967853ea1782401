// crates/rule-orchestrator-sync/src/lib.rs
// ============================================================================
// Module: Rule Orchestrator Sync Library
// Description: Client integration and rule synchronization.
// Purpose: Let registered clients push, pull, and merge rule documents.
// Dependencies: rule-orchestrator-core, rule-orchestrator-config, subtle, rand
// ============================================================================

//! ## Overview
//! The sync crate keeps an authoritative in-memory copy of the rule set and
//! reconciles client copies against it. Each registered client has typed
//! credentials, a permission set, a fixed-window rate limit, a per-path
//! snapshot of the last synchronized checksums, and a bounded result history.
//! Invariants:
//! - Every request passes the client, rate-limit, and permission gates in
//!   that order before any document is touched.
//! - Conflicts are reconciled by exactly one [`ConflictStrategy`] handler.
//!
//! [`ConflictStrategy`]: rule_orchestrator_core::ConflictStrategy

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod conflict;
pub mod error;
pub mod integrator;
pub mod limiter;
pub mod listener;
pub mod model;
pub mod registry;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::PresentedCredentials;
pub use auth::SessionStore;
pub use auth::SessionToken;
pub use auth::constant_time_eq_str;
pub use auth::verify_credentials;
pub use conflict::ConflictKind;
pub use conflict::ConflictReport;
pub use conflict::ResolvedConflict;
pub use conflict::RuleConflict;
pub use conflict::resolve_conflict;
pub use error::SyncError;
pub use integrator::ClientIntegrator;
pub use integrator::ClientRegistration;
pub use limiter::FixedWindowLimiter;
pub use limiter::RATE_LIMIT_WINDOW_MS;
pub use limiter::RateLimitUsage;
pub use listener::ListenerError;
pub use listener::SyncListener;
pub use model::ClientAnalytics;
pub use model::ClientSyncStatus;
pub use model::SyncDiff;
pub use model::SyncRequest;
pub use model::SyncResult;
pub use model::SyncStatusReport;
pub use model::SyncSummary;
pub use registry::ActiveSyncRegistry;
pub use store::RuleStore;
pub use store::StoredRule;
