// crates/rule-orchestrator/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for rule-orchestrator facade tests.
// Purpose: Build orchestrators over temporary rule roots.
// Dependencies: rule-orchestrator, rule-orchestrator-config, tempfile
// ============================================================================

//! ## Overview
//! Orchestrators built here use a [`ManualClock`] and a [`MemoryEventSink`]
//! over a fresh temporary directory.

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

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rule_orchestrator::Orchestrator;
use rule_orchestrator_config::OrchestratorConfig;
use rule_orchestrator_core::ManualClock;
use rule_orchestrator_core::MemoryEventSink;
use tempfile::TempDir;

/// Orchestrator plus the handles a test needs.
pub struct Fixture {
    /// Orchestrator under test.
    pub orchestrator: Orchestrator,
    /// Temporary directory holding the rule root.
    pub dir: TempDir,
    /// Clock shared with the orchestrator.
    pub clock: ManualClock,
    /// Sink shared with the orchestrator.
    pub sink: Arc<MemoryEventSink>,
}

impl Fixture {
    /// Rule root inside the temporary directory.
    pub fn root(&self) -> &Path {
        self.orchestrator.root()
    }

    /// Writes or replaces a rule file.
    pub fn write(&self, relative: &str, text: &str) {
        write_rules(self.root(), &[(relative, text)]);
    }
}

/// Writes `(relative path, text)` pairs under `root`, creating directories.
pub fn write_rules(root: &Path, files: &[(&str, &str)]) {
    for (relative, text) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create rule dir");
        }
        fs::write(&path, text).expect("write rule file");
    }
}

/// Builds an orchestrator over `files` with the given base configuration.
/// The rule root is always replaced by a temporary directory.
pub fn fixture_with(mut config: OrchestratorConfig, files: &[(&str, &str)]) -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path().join("rules");
    write_rules(&root, files);
    config.rules.root = root;
    let clock = ManualClock::starting_at(1_700_000_000_000);
    let sink = Arc::new(MemoryEventSink::new());
    let orchestrator =
        Orchestrator::initialize_with(config, Arc::new(clock.clone()), sink.clone()).expect("initialize");
    Fixture {
        orchestrator,
        dir,
        clock,
        sink,
    }
}

/// Builds an orchestrator over `files` with default configuration.
pub fn fixture(files: &[(&str, &str)]) -> Fixture {
    fixture_with(OrchestratorConfig::default(), files)
}
