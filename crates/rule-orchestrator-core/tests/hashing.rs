// crates/rule-orchestrator-core/tests/hashing.rs
// ============================================================================
// Module: Rule Content Hashing Tests
// Description: Checksums, digest identity, and canonical JSON hashing.
// ============================================================================
//! ## Overview
//! Digests are used as map keys and set members by the sync layer, so
//! equality and hashing must agree on algorithm plus value.

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

use std::collections::HashMap;
use std::collections::HashSet;

use rule_orchestrator_core::HashAlgorithm;
use rule_orchestrator_core::hashing::content_checksum;
use rule_orchestrator_core::hashing::hash_canonical_json;
use serde_json::json;

#[test]
fn checksum_of_empty_text_is_sha256_of_nothing() {
    let digest = content_checksum("");
    assert_eq!(digest.algorithm, HashAlgorithm::Sha256);
    assert_eq!(digest.value, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    assert_eq!(digest.short(8), "e3b0c442");
}

#[test]
fn digests_work_as_hash_keys() {
    let mut seen = HashSet::new();
    assert!(seen.insert(content_checksum("# Rules\nR1")));
    assert!(!seen.insert(content_checksum("# Rules\nR1")));
    assert!(seen.insert(content_checksum("# Rules\nR2")));

    let mut by_digest = HashMap::new();
    by_digest.insert(content_checksum("a"), "a.md");
    assert_eq!(by_digest.get(&content_checksum("a")), Some(&"a.md"));
    assert_eq!(by_digest.get(&content_checksum("b")), None);
}

#[test]
fn canonical_json_hash_ignores_key_order() {
    let first = hash_canonical_json(HashAlgorithm::Sha256, &json!({"b": 1, "a": [1, 2]})).unwrap();
    let second = hash_canonical_json(HashAlgorithm::Sha256, &json!({"a": [1, 2], "b": 1})).unwrap();
    assert_eq!(first, second);
    let other = hash_canonical_json(HashAlgorithm::Sha256, &json!({"a": [2, 1], "b": 1})).unwrap();
    assert_ne!(first, other);
}
