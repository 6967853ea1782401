// crates/rule-orchestrator-sync/src/listener.rs
// ============================================================================
// Module: Sync Listeners
// Description: Callback interface notified after each sync completes.
// Purpose: Allow hosts to react to sync results.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A listener failure is logged and never changes the sync outcome. Plain
//! closures implement [`SyncListener`].

use thiserror::Error;

use crate::model::SyncResult;

/// Failure reported by a listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

/// Receives completed sync results.
pub trait SyncListener: Send + Sync {
    /// Handles one completed result.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the listener could not handle it.
    fn on_sync(&self, result: &SyncResult) -> Result<(), ListenerError>;
}

impl<F> SyncListener for F
where
    F: Fn(&SyncResult) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_sync(&self, result: &SyncResult) -> Result<(), ListenerError> {
        self(result)
    }
}
