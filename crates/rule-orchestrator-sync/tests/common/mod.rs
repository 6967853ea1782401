// crates/rule-orchestrator-sync/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for rule-orchestrator-sync tests.
// Purpose: Build integrators on a manual clock with an in-memory sink.
// Dependencies: rule-orchestrator-sync, rule-orchestrator-config
// ============================================================================

//! ## Overview
//! Every integrator built here runs on a [`ManualClock`] and records events
//! in a [`MemoryEventSink`] so tests can move time and inspect audit output.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use rule_orchestrator_config::ClientAuthConfig;
use rule_orchestrator_config::ClientConfig;
use rule_orchestrator_config::SyncConfig;
use rule_orchestrator_core::ClientId;
use rule_orchestrator_core::ConflictStrategy;
use rule_orchestrator_core::ManualClock;
use rule_orchestrator_core::MemoryEventSink;
use rule_orchestrator_core::RuleParser;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::SyncOperation;
use rule_orchestrator_sync::ClientIntegrator;

/// Fixed start instant for every test clock.
pub const START_MS: i64 = 1_700_000_000_000;

/// Shared secret used by [`client`].
pub const SECRET: &str = "s3cret-value";

/// Integrator plus handles to its clock and sink.
pub struct Harness {
    /// Integrator under test.
    pub integrator: ClientIntegrator,
    /// Clock shared with the integrator.
    pub clock: ManualClock,
    /// Sink shared with the integrator.
    pub sink: Arc<MemoryEventSink>,
}

/// Builds an integrator with default sync settings.
pub fn harness() -> Harness {
    harness_with(SyncConfig::default())
}

/// Builds an integrator with the given sync settings.
pub fn harness_with(settings: SyncConfig) -> Harness {
    let clock = ManualClock::starting_at(START_MS);
    let sink = Arc::new(MemoryEventSink::new());
    let integrator = ClientIntegrator::new(
        RuleParser::default(),
        Arc::new(clock.clone()),
        sink.clone(),
        settings,
    );
    Harness {
        integrator,
        clock,
        sink,
    }
}

/// Client with a shared secret and every operation permitted.
pub fn client(id: &str) -> ClientConfig {
    ClientConfig::new(
        id,
        format!("{id} client"),
        ClientAuthConfig::SharedSecret {
            secret: SECRET.to_string(),
        },
        SyncOperation::ALL,
    )
}

/// Client with a specific conflict strategy.
pub fn client_with_strategy(id: &str, strategy: ConflictStrategy) -> ClientConfig {
    let mut config = client(id);
    config.conflict_strategy = strategy;
    config
}

/// Builds a payload from `(path, text)` pairs.
pub fn payload(documents: &[(&str, &str)]) -> BTreeMap<RulePath, String> {
    documents.iter().map(|(path, text)| (RulePath::new(path), (*text).to_string())).collect()
}

/// Shorthand for a client id.
pub fn id(value: &str) -> ClientId {
    ClientId::new(value)
}
