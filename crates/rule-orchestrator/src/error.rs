// crates/rule-orchestrator/src/error.rs
// ============================================================================
// Module: Orchestrator Errors
// Description: Failures surfaced at the facade boundary.
// Purpose: One error type with stable codes for embedders and the CLI.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Component errors are wrapped unchanged; [`OrchestratorError::code`]
//! forwards their labels so callers branch on the same strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rule_orchestrator_config::ConfigError;
use rule_orchestrator_core::HierarchyError;
use rule_orchestrator_sync::SyncError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Facade errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Rule root could not be prepared.
    #[error("failed to prepare rule root {path}: {message}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error text.
        message: String,
    },
    /// Hierarchy loading or lookup failed.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    /// Client integration failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl OrchestratorError {
    /// Returns a stable machine-readable label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(err) => err.code(),
            Self::Io {
                ..
            } => "io",
            Self::Hierarchy(err) => err.code(),
            Self::Sync(err) => err.code(),
        }
    }
}
