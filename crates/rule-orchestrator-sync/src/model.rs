// crates/rule-orchestrator-sync/src/model.rs
// ============================================================================
// Module: Sync Data Model
// Description: Requests, results, diffs, status reports, and analytics.
// Purpose: Typed records exchanged with sync clients.
// Dependencies: serde, rule-orchestrator-core
// ============================================================================

//! ## Overview
//! Results are append-only per client. Paths are [`RulePath`] values so a
//! client may send `./a.md` and `a.md` and address the same document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rule_orchestrator_core::ClientId;
use rule_orchestrator_core::RequestId;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::SyncOperation;
use rule_orchestrator_core::SyncStatus;
use serde::Serialize;

use crate::conflict::ResolvedConflict;
use crate::conflict::RuleConflict;
use crate::limiter::RateLimitUsage;

// ============================================================================
// SECTION: Requests and Results
// ============================================================================

/// One sync request as executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRequest {
    /// Request identifier.
    pub request_id: RequestId,
    /// Requesting client.
    pub client_id: ClientId,
    /// Requested operation.
    pub operation: SyncOperation,
    /// Client documents (path to full text).
    pub payload: BTreeMap<RulePath, String>,
    /// Receive time (unix milliseconds).
    pub timestamp_ms: i64,
}

/// Outcome of one sync request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Request identifier.
    pub request_id: RequestId,
    /// Requesting client.
    pub client_id: ClientId,
    /// Executed operation.
    pub operation: SyncOperation,
    /// Terminal status.
    pub status: SyncStatus,
    /// Paths examined.
    pub processed: Vec<RulePath>,
    /// Documents the client should adopt (pulled or resolved content).
    pub documents: BTreeMap<RulePath, String>,
    /// Paths the client should delete.
    pub removed: Vec<RulePath>,
    /// Conflicts left for manual resolution.
    pub conflicts: Vec<RuleConflict>,
    /// Conflicts resolved by strategy.
    pub resolved: Vec<ResolvedConflict>,
    /// Per-document failures.
    pub errors: Vec<String>,
    /// Skipped documents and other notes.
    pub warnings: Vec<String>,
    /// Number of documents changed on either side.
    pub changes_applied: usize,
    /// Elapsed execution time in milliseconds.
    pub duration_ms: i64,
    /// Completion time (unix milliseconds).
    pub timestamp_ms: i64,
}

impl SyncResult {
    /// Returns true when the status is completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Completed
    }

    /// Condenses the result for status listings.
    #[must_use]
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            request_id: self.request_id.clone(),
            operation: self.operation,
            status: self.status,
            changes_applied: self.changes_applied,
            timestamp_ms: self.timestamp_ms,
        }
    }
}

/// Condensed sync result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Request identifier.
    pub request_id: RequestId,
    /// Executed operation.
    pub operation: SyncOperation,
    /// Terminal status.
    pub status: SyncStatus,
    /// Number of documents changed on either side.
    pub changes_applied: usize,
    /// Completion time (unix milliseconds).
    pub timestamp_ms: i64,
}

// ============================================================================
// SECTION: Diff
// ============================================================================

/// Server state compared with a client's last synchronized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncDiff {
    /// Client the diff was computed for.
    pub client_id: ClientId,
    /// On the server, never synchronized to the client.
    pub new: Vec<RulePath>,
    /// Changed on the server since the last sync.
    pub modified: Vec<RulePath>,
    /// Synchronized before, now absent on the server.
    pub deleted: Vec<RulePath>,
    /// Identical to the last synchronized version.
    pub unchanged: Vec<RulePath>,
}

impl SyncDiff {
    /// Returns true when the client is behind the server.
    #[must_use]
    pub fn sync_required(&self) -> bool {
        !(self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty())
    }
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Overall sync status of one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSyncStatus {
    /// Client identifier.
    pub client_id: ClientId,
    /// Last completed sync (unix milliseconds).
    pub last_sync_ms: Option<i64>,
    /// Whether the client expects periodic syncs.
    pub auto_sync: bool,
    /// Advisory sync interval in seconds.
    pub sync_interval_secs: u64,
    /// Most recent results, oldest first.
    pub recent: Vec<SyncSummary>,
    /// Requests currently executing for any client.
    pub active: Vec<RequestId>,
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum SyncStatusReport {
    /// One recorded request.
    Request(SyncResult),
    /// The client as a whole.
    Client(ClientSyncStatus),
}

// ============================================================================
// SECTION: Analytics
// ============================================================================

/// Aggregate sync statistics for one client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientAnalytics {
    /// Client identifier.
    pub client_id: ClientId,
    /// Display name.
    pub client_name: String,
    /// Registration time (unix milliseconds).
    pub registered_at_ms: i64,
    /// Last completed sync (unix milliseconds).
    pub last_sync_ms: Option<i64>,
    /// Retained results.
    pub total_syncs: usize,
    /// Results with completed status.
    pub successful_syncs: usize,
    /// Results with failed status.
    pub failed_syncs: usize,
    /// Results with conflict status.
    pub conflict_syncs: usize,
    /// Percentage of completed results.
    pub success_rate: f64,
    /// Mean execution time in milliseconds.
    pub average_duration_ms: f64,
    /// Sum of changes applied.
    pub total_changes_applied: usize,
    /// Results in the last 24 hours.
    pub recent_activity: usize,
    /// Current rate limit window.
    pub rate_limit: RateLimitUsage,
}
