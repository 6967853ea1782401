// crates/rule-orchestrator-core/src/core/sync.rs
// ============================================================================
// Module: Synchronization Vocabulary
// Description: Operation, strategy, and status enums shared by config and sync.
// Purpose: Give client permissions and conflict handling closed, typed values.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! These enums are shared between the configuration crate (which declares
//! client permissions and default strategies) and the sync crate (which
//! executes them). They serialize as `snake_case` strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Sync Operation
// ============================================================================

/// Synchronization operation requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    /// Client to server.
    Push,
    /// Server to client.
    Pull,
    /// Both directions against the client's last snapshot.
    Bidirectional,
    /// Reconcile every differing document.
    Merge,
}

impl SyncOperation {
    /// All operations in declaration order.
    pub const ALL: [Self; 4] = [Self::Push, Self::Pull, Self::Bidirectional, Self::Merge];

    /// Returns a stable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Bidirectional => "bidirectional",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Conflict Strategy
// ============================================================================

/// Strategy applied when client and server content disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Section-level merge with client precedence.
    #[default]
    Merge,
    /// Server content wins.
    Override,
    /// Server text followed by client text.
    Append,
    /// Leave unresolved for manual review.
    Manual,
}

impl ConflictStrategy {
    /// Returns a stable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Override => "override",
            Self::Append => "append",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Sync Status
// ============================================================================

/// Terminal status of a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// All documents processed, nothing left unresolved.
    Completed,
    /// The request could not be executed.
    Failed,
    /// At least one conflict awaits manual resolution.
    Conflict,
}

impl SyncStatus {
    /// Returns a stable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Conflict => "conflict",
        }
    }
}
