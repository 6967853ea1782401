// crates/rule-orchestrator-sync/tests/status_analytics.rs
// ============================================================================
// Module: Status, Analytics, and Listener Tests
// Description: History queries, aggregate statistics, and notifications.
// Purpose: Ensure recorded results drive reports and listeners.
// ============================================================================
//! ## Overview
//! Runs a few requests on a manual clock and checks status reports,
//! analytics, history bounds, and listener delivery.

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
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use common::START_MS;
use common::client;
use common::client_with_strategy;
use common::harness;
use common::harness_with;
use common::id;
use common::payload;
use rule_orchestrator_config::SyncConfig;
use rule_orchestrator_core::ConflictStrategy;
use rule_orchestrator_core::RequestId;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::SyncOperation;
use rule_orchestrator_core::SyncStatus;
use rule_orchestrator_sync::ListenerError;
use rule_orchestrator_sync::SyncResult;
use rule_orchestrator_sync::SyncStatusReport;

#[test]
fn status_by_request_returns_the_recorded_result() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let result = h.integrator.sync(&id("ide"), SyncOperation::Push, payload(&[("a.md", "# A\n")])).unwrap();

    let report = h.integrator.sync_status(&id("ide"), Some(&result.request_id)).unwrap();
    assert_eq!(report, SyncStatusReport::Request(result));

    let err = h.integrator.sync_status(&id("ide"), Some(&RequestId::new("sync-missing"))).unwrap_err();
    assert_eq!(err.code(), "request_not_found");
}

#[test]
fn client_status_lists_last_five_results() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let mut ids = Vec::new();
    for _ in 0 .. 7 {
        h.clock.advance(Duration::from_secs(1));
        ids.push(h.integrator.sync(&id("ide"), SyncOperation::Pull, BTreeMap::new()).unwrap().request_id);
    }

    let SyncStatusReport::Client(status) = h.integrator.sync_status(&id("ide"), None).unwrap() else {
        panic!("expected client status");
    };
    assert_eq!(status.recent.len(), 5);
    let recent: Vec<RequestId> = status.recent.iter().map(|summary| summary.request_id.clone()).collect();
    assert_eq!(recent, ids[2 ..].to_vec());
    assert_eq!(status.last_sync_ms, Some(START_MS + 7_000));
    assert!(status.auto_sync);
    assert!(status.active.is_empty());
}

#[test]
fn request_ids_are_unique() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let a = h.integrator.sync(&id("ide"), SyncOperation::Pull, BTreeMap::new()).unwrap();
    let b = h.integrator.sync(&id("ide"), SyncOperation::Pull, BTreeMap::new()).unwrap();
    assert_ne!(a.request_id, b.request_id);
    assert!(a.request_id.as_str().starts_with("sync-"));
}

#[test]
fn history_is_bounded_by_max_history() {
    let mut h = harness_with(SyncConfig {
        max_history: 3,
        ..SyncConfig::default()
    });
    h.integrator.register(client("ide")).unwrap();
    for _ in 0 .. 5 {
        h.integrator.sync(&id("ide"), SyncOperation::Pull, BTreeMap::new()).unwrap();
    }
    assert_eq!(h.integrator.analytics(&id("ide")).unwrap().total_syncs, 3);
}

#[test]
fn analytics_aggregate_outcomes() {
    let mut h = harness();
    h.integrator.register(client_with_strategy("ide", ConflictStrategy::Manual)).unwrap();
    let a = RulePath::new("a.md");
    let b = RulePath::new("b.md");
    h.integrator.refresh_server_state([(&a, "# A server\n"), (&b, "# B\n")]);

    h.integrator.sync(&id("ide"), SyncOperation::Push, payload(&[("a.md", "# A client\n")])).unwrap();
    h.integrator.sync(&id("ide"), SyncOperation::Push, payload(&[("tool.exe", "x")])).unwrap();
    h.integrator.sync(&id("ide"), SyncOperation::Push, payload(&[("c.md", "# C\n")])).unwrap();
    h.integrator.sync(&id("ide"), SyncOperation::Pull, BTreeMap::new()).unwrap();

    let analytics = h.integrator.analytics(&id("ide")).unwrap();
    assert_eq!(analytics.client_name, "ide client");
    assert_eq!(analytics.registered_at_ms, START_MS);
    assert_eq!(analytics.total_syncs, 4);
    assert_eq!(analytics.successful_syncs, 2);
    assert_eq!(analytics.failed_syncs, 1);
    assert_eq!(analytics.conflict_syncs, 1);
    assert!((analytics.success_rate - 50.0).abs() < f64::EPSILON);
    assert!(analytics.average_duration_ms.abs() < f64::EPSILON);
    assert_eq!(analytics.recent_activity, 4);
    assert_eq!(analytics.rate_limit.used, 4);
    assert_eq!(analytics.rate_limit.limit, 100);

    h.clock.advance(Duration::from_secs(25 * 60 * 60));
    let later = h.integrator.analytics(&id("ide")).unwrap();
    assert_eq!(later.recent_activity, 0);
    assert_eq!(later.rate_limit.used, 0);
}

#[test]
fn analytics_for_idle_client_are_zero() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let analytics = h.integrator.analytics(&id("ide")).unwrap();
    assert_eq!(analytics.total_syncs, 0);
    assert!(analytics.success_rate.abs() < f64::EPSILON);
    assert_eq!(analytics.last_sync_ms, None);
}

#[test]
fn listeners_receive_results_until_unsubscribed() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let seen: Arc<Mutex<Vec<SyncStatus>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = h.integrator.subscribe(move |result: &SyncResult| -> Result<(), ListenerError> {
        sink.lock().unwrap().push(result.status);
        Ok(())
    });

    h.integrator.sync(&id("ide"), SyncOperation::Pull, BTreeMap::new()).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);

    assert!(h.integrator.unsubscribe(&subscription));
    assert!(!h.integrator.unsubscribe(&subscription));
    h.integrator.sync(&id("ide"), SyncOperation::Pull, BTreeMap::new()).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn failing_listener_is_logged_and_others_still_run() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let calls = Arc::new(Mutex::new(0_u32));
    let counter = Arc::clone(&calls);
    h.integrator.subscribe(|_: &SyncResult| -> Result<(), ListenerError> {
        Err(ListenerError("downstream offline".to_string()))
    });
    h.integrator.subscribe(move |_: &SyncResult| -> Result<(), ListenerError> {
        *counter.lock().unwrap() += 1;
        Ok(())
    });

    let result = h.integrator.sync(&id("ide"), SyncOperation::Pull, BTreeMap::new()).unwrap();
    assert!(result.is_success());
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(h.sink.count("sync_listener_failed"), 1);
    assert_eq!(h.sink.count("sync_completed"), 1);
}
