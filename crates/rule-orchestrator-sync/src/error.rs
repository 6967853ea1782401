// crates/rule-orchestrator-sync/src/error.rs
// ============================================================================
// Module: Sync Errors
// Description: Error type returned by the client integrator.
// Purpose: Give callers stable codes to branch on.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every failure carries a `code()` label that hosts map to responses.

use rule_orchestrator_core::ClientId;
use rule_orchestrator_core::RequestId;
use rule_orchestrator_core::SyncOperation;
use thiserror::Error;

/// Client integration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Client is not registered.
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),
    /// A client with the same identifier is already registered.
    #[error("client already registered: {0}")]
    DuplicateClient(ClientId),
    /// Client registration failed validation.
    #[error("invalid client config: {0}")]
    InvalidConfig(String),
    /// Client exceeded its per-minute request budget.
    #[error("rate limit exceeded for {client_id} ({limit} per minute)")]
    RateLimited {
        /// Client identifier.
        client_id: ClientId,
        /// Configured limit.
        limit: u32,
    },
    /// Client may not request this operation.
    #[error("operation {operation} not permitted for {client_id}")]
    PermissionDenied {
        /// Client identifier.
        client_id: ClientId,
        /// Requested operation.
        operation: SyncOperation,
    },
    /// Presented credentials were rejected.
    #[error("authentication failed for {0}")]
    AuthFailed(ClientId),
    /// Session token is unknown or expired.
    #[error("session token invalid or expired")]
    SessionInvalid,
    /// No recorded sync result has this identifier.
    #[error("sync request not found: {0}")]
    RequestNotFound(RequestId),
    /// Shared state lock was poisoned.
    #[error("sync state lock poisoned: {0}")]
    LockPoisoned(String),
}

impl SyncError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownClient(_) => "unknown_client",
            Self::DuplicateClient(_) => "duplicate_client",
            Self::InvalidConfig(_) => "invalid_config",
            Self::RateLimited {
                ..
            } => "rate_limited",
            Self::PermissionDenied {
                ..
            } => "permission_denied",
            Self::AuthFailed(_) => "auth_failed",
            Self::SessionInvalid => "session_invalid",
            Self::RequestNotFound(_) => "request_not_found",
            Self::LockPoisoned(_) => "lock_poisoned",
        }
    }
}
