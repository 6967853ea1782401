// crates/rule-orchestrator-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for rule-orchestrator-core tests.
// Purpose: Build rule trees on disk and load them into snapshots.
// Dependencies: rule-orchestrator-core, tempfile
// ============================================================================

//! ## Overview
//! Helpers that write small rule trees into temporary directories and load
//! them with an in-memory event sink.

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

use rule_orchestrator_core::HierarchyManager;
use rule_orchestrator_core::HierarchySnapshot;
use rule_orchestrator_core::MemoryEventSink;
use rule_orchestrator_core::RuleParser;
use tempfile::TempDir;

// ============================================================================
// SECTION: Rule Trees
// ============================================================================

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

/// Creates a temporary rule tree.
pub fn rule_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    write_rules(dir.path(), files);
    dir
}

/// Builds a manager that records events in memory.
pub fn manager() -> (HierarchyManager, Arc<MemoryEventSink>) {
    let sink = Arc::new(MemoryEventSink::new());
    (HierarchyManager::new(RuleParser::default(), sink.clone()), sink)
}

/// Loads a snapshot of `root`.
pub fn load(root: &Path) -> Arc<HierarchySnapshot> {
    let (manager, _) = manager();
    manager.load_hierarchy(root).expect("load hierarchy")
}
