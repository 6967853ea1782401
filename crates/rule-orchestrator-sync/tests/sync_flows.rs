// crates/rule-orchestrator-sync/tests/sync_flows.rs
// ============================================================================
// Module: Sync Operation Tests
// Description: Push, pull, bidirectional, and merge against the store.
// Purpose: Pin three-way push semantics and per-strategy conflict handling.
// ============================================================================
//! ## Overview
//! Seeds the authoritative store as a rescan would, then drives client
//! requests through every operation and conflict strategy.

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
#![allow(dead_code, reason = "Common module may have unused helpers.")]

mod common;

use std::collections::BTreeMap;

use common::Harness;
use common::client;
use common::client_with_strategy;
use common::harness;
use common::id;
use common::payload;
use rule_orchestrator_core::ConflictStrategy;
use rule_orchestrator_core::RuleCategory;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::SyncOperation;
use rule_orchestrator_core::SyncStatus;
use rule_orchestrator_core::hashing::content_checksum;
use rule_orchestrator_sync::ConflictKind;
use rule_orchestrator_sync::SyncResult;

const SERVER_V1: &str = "# Style\nUse tabs.\n";
const SERVER_V2: &str = "# Style\nUse four spaces.\n";
const CLIENT_V3: &str = "# Style\nUse two spaces.\n";

fn seed(h: &mut Harness, documents: &[(&str, &str)]) {
    let paths: Vec<(RulePath, String)> =
        documents.iter().map(|(path, text)| (RulePath::new(path), (*text).to_string())).collect();
    h.integrator.refresh_server_state(paths.iter().map(|(path, text)| (path, text.as_str())));
}

fn stored(h: &Harness, path: &str) -> Option<String> {
    h.integrator.store().get(&RulePath::new(path)).map(|rule| rule.content.clone())
}

fn run(h: &mut Harness, client_id: &str, operation: SyncOperation, docs: &[(&str, &str)]) -> SyncResult {
    h.integrator.sync(&id(client_id), operation, payload(docs)).unwrap()
}

/// Server at v1, client pulled v1, server moved to v2.
fn diverged(strategy: ConflictStrategy) -> Harness {
    let mut h = harness();
    h.integrator.register(client_with_strategy("ide", strategy)).unwrap();
    seed(&mut h, &[("style.md", SERVER_V1)]);
    run(&mut h, "ide", SyncOperation::Pull, &[]);
    seed(&mut h, &[("style.md", SERVER_V2)]);
    h
}

// ============================================================================
// SECTION: Push
// ============================================================================

#[test]
fn push_of_new_document_fast_forwards() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();

    let result = run(&mut h, "ide", SyncOperation::Push, &[("style.md", SERVER_V1)]);
    assert_eq!(result.status, SyncStatus::Completed);
    assert_eq!(result.processed, vec![RulePath::new("style.md")]);
    assert_eq!(result.changes_applied, 1);
    assert!(result.documents.is_empty());
    assert_eq!(stored(&h, "style.md").as_deref(), Some(SERVER_V1));

    let again = run(&mut h, "ide", SyncOperation::Push, &[("style.md", SERVER_V1)]);
    assert_eq!(again.changes_applied, 0);
    assert_eq!(again.status, SyncStatus::Completed);
}

#[test]
fn push_after_pull_replaces_unchanged_server_copy() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    seed(&mut h, &[("style.md", SERVER_V1)]);
    run(&mut h, "ide", SyncOperation::Pull, &[]);

    let result = run(&mut h, "ide", SyncOperation::Push, &[("style.md", CLIENT_V3)]);
    assert!(result.conflicts.is_empty());
    assert!(result.resolved.is_empty());
    assert_eq!(result.changes_applied, 1);
    assert_eq!(stored(&h, "style.md").as_deref(), Some(CLIENT_V3));
}

#[test]
fn manual_strategy_leaves_concurrent_modification_unresolved() {
    let mut h = diverged(ConflictStrategy::Manual);
    let result = run(&mut h, "ide", SyncOperation::Push, &[("style.md", CLIENT_V3)]);

    assert_eq!(result.status, SyncStatus::Conflict);
    assert!(!result.is_success());
    assert_eq!(result.conflicts.len(), 1);
    let conflict = &result.conflicts[0];
    assert_eq!(conflict.kind, ConflictKind::ConcurrentModification);
    assert_eq!(conflict.base_checksum, Some(content_checksum(SERVER_V1)));
    assert_eq!(conflict.server_content, SERVER_V2);
    assert_eq!(conflict.client_content, CLIENT_V3);
    assert_eq!(stored(&h, "style.md").as_deref(), Some(SERVER_V2));
}

#[test]
fn override_strategy_keeps_server_version() {
    let mut h = diverged(ConflictStrategy::Override);
    let result = run(&mut h, "ide", SyncOperation::Push, &[("style.md", CLIENT_V3)]);

    assert_eq!(result.status, SyncStatus::Completed);
    assert_eq!(result.resolved.len(), 1);
    assert_eq!(result.resolved[0].strategy, ConflictStrategy::Override);
    assert_eq!(result.documents.get(&RulePath::new("style.md")).map(String::as_str), Some(SERVER_V2));
    assert_eq!(stored(&h, "style.md").as_deref(), Some(SERVER_V2));
}

#[test]
fn append_strategy_concatenates_server_then_client() {
    let mut h = diverged(ConflictStrategy::Append);
    let result = run(&mut h, "ide", SyncOperation::Push, &[("style.md", CLIENT_V3)]);

    let expected = format!("{}\n\n{}", SERVER_V2.trim_end(), CLIENT_V3);
    assert_eq!(result.resolved[0].content, expected);
    assert_eq!(stored(&h, "style.md"), Some(expected));
}

#[test]
fn merge_strategy_prefers_client_sections() {
    let mut h = harness();
    h.integrator.register(client_with_strategy("ide", ConflictStrategy::Merge)).unwrap();
    seed(&mut h, &[("guide.md", "# Intro\nserver intro\n\n# Testing\nserver testing\n")]);

    let result = run(&mut h, "ide", SyncOperation::Push, &[(
        "guide.md",
        "# Intro\nclient intro\n\n# Naming\nclient naming\n",
    )]);
    assert_eq!(result.status, SyncStatus::Completed);
    assert_eq!(result.resolved.len(), 1);
    let merged = stored(&h, "guide.md").unwrap();
    assert!(merged.contains("client intro"), "{merged}");
    assert!(merged.contains("server testing"), "{merged}");
    assert!(merged.contains("client naming"), "{merged}");
    assert!(!merged.contains("server intro"), "{merged}");
}

#[test]
fn push_without_prior_sync_is_divergent() {
    let mut h = harness();
    h.integrator.register(client_with_strategy("ide", ConflictStrategy::Manual)).unwrap();
    seed(&mut h, &[("style.md", SERVER_V1)]);

    let result = run(&mut h, "ide", SyncOperation::Push, &[("style.md", CLIENT_V3)]);
    assert_eq!(result.conflicts[0].kind, ConflictKind::Divergent);
    assert_eq!(result.conflicts[0].base_checksum, None);
}

#[test]
fn unsupported_extension_fails_the_request() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();

    let result = run(&mut h, "ide", SyncOperation::Push, &[("tool.exe", "binary")]);
    assert_eq!(result.status, SyncStatus::Failed);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("unsupported rule file extension"));
    assert!(h.integrator.store().is_empty());
}

#[test]
fn disallowed_category_is_skipped_with_warning() {
    let mut h = harness();
    let mut config = client("ide");
    config.allowed_categories = [RuleCategory::Custom].into_iter().collect();
    h.integrator.register(config).unwrap();

    let result = run(&mut h, "ide", SyncOperation::Push, &[
        ("core/base.md", "# Base\nAlways answer.\n"),
        ("style.md", SERVER_V1),
    ]);
    assert_eq!(result.status, SyncStatus::Completed);
    assert_eq!(result.processed, vec![RulePath::new("style.md")]);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("category core not allowed"), "{:?}", result.warnings);
    assert!(stored(&h, "core/base.md").is_none());
}

// ============================================================================
// SECTION: Pull
// ============================================================================

#[test]
fn pull_sends_unsynchronized_documents_once() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    seed(&mut h, &[("a.md", "# A\n"), ("b.md", "# B\n")]);

    let first = run(&mut h, "ide", SyncOperation::Pull, &[]);
    assert_eq!(first.documents.len(), 2);
    assert_eq!(first.changes_applied, 2);
    assert!(first.removed.is_empty());

    let second = run(&mut h, "ide", SyncOperation::Pull, &[]);
    assert!(second.documents.is_empty());
    assert_eq!(second.changes_applied, 0);
}

#[test]
fn pull_reports_documents_removed_from_server() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    seed(&mut h, &[("a.md", "# A\n"), ("b.md", "# B\n")]);
    run(&mut h, "ide", SyncOperation::Pull, &[]);

    seed(&mut h, &[("a.md", "# A\n")]);
    let result = run(&mut h, "ide", SyncOperation::Pull, &[]);
    assert_eq!(result.removed, vec![RulePath::new("b.md")]);
    assert!(result.documents.is_empty());
}

#[test]
fn pull_ignores_payload_with_warning() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();

    let result = run(&mut h, "ide", SyncOperation::Pull, &[("a.md", "# A\n")]);
    assert_eq!(result.status, SyncStatus::Completed);
    assert!(result.warnings[0].contains("pull ignores 1"));
    assert!(h.integrator.store().is_empty());
}

// ============================================================================
// SECTION: Bidirectional and Merge
// ============================================================================

#[test]
fn bidirectional_pushes_then_pulls() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    seed(&mut h, &[("server.md", "# Server\n")]);

    let result = run(&mut h, "ide", SyncOperation::Bidirectional, &[("local.md", "# Local\n")]);
    assert_eq!(result.status, SyncStatus::Completed);
    assert!(stored(&h, "local.md").is_some());
    assert!(result.documents.contains_key(&RulePath::new("server.md")));
    assert!(!result.documents.contains_key(&RulePath::new("local.md")));
    assert_eq!(result.changes_applied, 2);
}

#[test]
fn merge_reconciles_both_sides() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    seed(&mut h, &[
        ("shared.md", "# One\nserver one\n"),
        ("server.md", "# Server\n"),
    ]);

    let result = run(&mut h, "ide", SyncOperation::Merge, &[
        ("shared.md", "# Two\nclient two\n"),
        ("local.md", "# Local\n"),
    ]);
    assert_eq!(result.status, SyncStatus::Completed);
    assert_eq!(result.resolved.len(), 1);
    assert!(stored(&h, "local.md").is_some());
    let shared = stored(&h, "shared.md").unwrap();
    assert!(shared.contains("server one") && shared.contains("client two"), "{shared}");
    assert!(result.documents.contains_key(&RulePath::new("server.md")));
    assert!(result.documents.contains_key(&RulePath::new("shared.md")));
}

// ============================================================================
// SECTION: Diff and Conflict Resolution
// ============================================================================

#[test]
fn diff_tracks_server_changes_since_last_sync() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    seed(&mut h, &[("a.md", "# A\n"), ("b.md", "# B\n")]);
    run(&mut h, "ide", SyncOperation::Pull, &[]);

    let clean = h.integrator.diff(&id("ide"), &h.integrator.store().checksums()).unwrap();
    assert!(!clean.sync_required());
    assert_eq!(clean.unchanged.len(), 2);

    seed(&mut h, &[("a.md", "# A changed\n"), ("c.md", "# C\n")]);
    let diff = h.integrator.diff(&id("ide"), &h.integrator.store().checksums()).unwrap();
    assert!(diff.sync_required());
    assert_eq!(diff.modified, vec![RulePath::new("a.md")]);
    assert_eq!(diff.new, vec![RulePath::new("c.md")]);
    assert_eq!(diff.deleted, vec![RulePath::new("b.md")]);
    assert!(diff.unchanged.is_empty());
}

#[test]
fn diff_for_unknown_client_fails() {
    let h = harness();
    let err = h.integrator.diff(&id("ghost"), &BTreeMap::new()).unwrap_err();
    assert_eq!(err.code(), "unknown_client");
}

#[test]
fn resolve_conflicts_applies_chosen_strategy() {
    let mut h = diverged(ConflictStrategy::Manual);
    let result = run(&mut h, "ide", SyncOperation::Push, &[("style.md", CLIENT_V3)]);

    let report = h.integrator.resolve_conflicts(&id("ide"), result.conflicts.clone(), None).unwrap();
    assert!(report.manual_review_required());
    assert_eq!(report.strategy, ConflictStrategy::Manual);

    let report = h
        .integrator
        .resolve_conflicts(&id("ide"), result.conflicts, Some(ConflictStrategy::Append))
        .unwrap();
    assert!(!report.manual_review_required());
    assert_eq!(report.resolved.len(), 1);
    assert_eq!(stored(&h, "style.md"), Some(report.resolved[0].content.clone()));
    assert_eq!(h.sink.count("sync_conflicts_resolved"), 2);

    let diff = h.integrator.diff(&id("ide"), &h.integrator.store().checksums()).unwrap();
    assert!(!diff.sync_required());
}
