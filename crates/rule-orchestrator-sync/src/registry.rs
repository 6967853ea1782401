// crates/rule-orchestrator-sync/src/registry.rs
// ============================================================================
// Module: Active Sync Registry
// Description: Mutex-guarded set of in-flight sync requests.
// Purpose: Let observers see which requests are executing.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The registry is a cloneable handle; every clone observes the same set.
//! Lock poisoning surfaces as [`SyncError::LockPoisoned`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rule_orchestrator_core::RequestId;

use crate::error::SyncError;
use crate::model::SyncRequest;

/// Shared registry of executing requests.
#[derive(Debug, Clone, Default)]
pub struct ActiveSyncRegistry {
    /// Request id to request.
    inner: Arc<Mutex<BTreeMap<RequestId, SyncRequest>>>,
}

impl ActiveSyncRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request as executing.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LockPoisoned`] when the lock is poisoned.
    pub fn begin(&self, request: SyncRequest) -> Result<(), SyncError> {
        self.lock()?.insert(request.request_id.clone(), request);
        Ok(())
    }

    /// Removes a request once it has finished.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LockPoisoned`] when the lock is poisoned.
    pub fn finish(&self, request_id: &RequestId) -> Result<Option<SyncRequest>, SyncError> {
        Ok(self.lock()?.remove(request_id))
    }

    /// Lists executing request ids.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LockPoisoned`] when the lock is poisoned.
    pub fn active(&self) -> Result<Vec<RequestId>, SyncError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    /// Acquires the lock.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<RequestId, SyncRequest>>, SyncError> {
        self.inner.lock().map_err(|err| SyncError::LockPoisoned(err.to_string()))
    }
}
