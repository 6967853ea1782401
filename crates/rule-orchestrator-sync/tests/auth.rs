// crates/rule-orchestrator-sync/tests/auth.rs
// ============================================================================
// Module: Client Authentication Tests
// Description: Per-method credential checks and session lifecycle.
// Purpose: Ensure authentication fails closed.
// ============================================================================
//! ## Overview
//! Checks every auth method, cross-method rejection, session expiry, and
//! revocation on credential change.

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

use std::time::Duration;

use common::SECRET;
use common::client;
use common::harness;
use common::id;
use rule_orchestrator_config::ClientAuthConfig;
use rule_orchestrator_config::ClientConfig;
use rule_orchestrator_core::SyncOperation;
use rule_orchestrator_sync::PresentedCredentials;
use rule_orchestrator_sync::SyncError;
use rule_orchestrator_sync::constant_time_eq_str;
use rule_orchestrator_sync::verify_credentials;

fn secret(value: &str) -> PresentedCredentials {
    PresentedCredentials::SharedSecret {
        secret: value.to_string(),
    }
}

fn bearer(value: &str) -> PresentedCredentials {
    PresentedCredentials::BearerToken {
        token: value.to_string(),
    }
}

#[test]
fn shared_secret_issues_a_verifiable_session() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();

    let session = h.integrator.authenticate(&id("ide"), &secret(SECRET)).unwrap();
    assert_eq!(session.client_id, id("ide"));
    assert_eq!(session.expires_at_ms - session.issued_at_ms, 3_600_000);
    assert_eq!(h.integrator.verify_session(&session.token).unwrap(), id("ide"));
    assert_eq!(h.sink.count("sync_auth_allowed"), 1);
}

#[test]
fn wrong_secret_is_rejected_and_logged() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();

    let err = h.integrator.authenticate(&id("ide"), &secret("not-the-secret")).unwrap_err();
    assert_eq!(err, SyncError::AuthFailed(id("ide")));
    assert_eq!(err.code(), "auth_failed");
    assert_eq!(h.sink.count("sync_auth_denied"), 1);
    let denied = h.sink.events().into_iter().find(|event| event.event == "sync_auth_denied").unwrap();
    assert!(!denied.message.contains("not-the-secret"));
}

#[test]
fn unknown_client_cannot_authenticate() {
    let mut h = harness();
    let err = h.integrator.authenticate(&id("ghost"), &secret(SECRET)).unwrap_err();
    assert_eq!(err.code(), "unknown_client");
}

#[test]
fn bearer_token_honors_the_allow_list() {
    let config = ClientAuthConfig::BearerToken {
        allowed_tokens: vec!["tok-abcdefghijk".to_string()],
    };
    assert!(verify_credentials(&config, &bearer("tok-abcdefghijk")));
    assert!(!verify_credentials(&config, &bearer("tok-zzzzzzzzzzz")));
}

#[test]
fn bearer_token_with_empty_allow_list_requires_well_formed_token() {
    let config = ClientAuthConfig::BearerToken {
        allowed_tokens: Vec::new(),
    };
    assert!(verify_credentials(&config, &bearer("any-token-123")));
    assert!(!verify_credentials(&config, &bearer("short")));
    assert!(!verify_credentials(&config, &bearer("has a space in it")));
}

#[test]
fn oauth2_requires_matching_client_id_and_access_token() {
    let config = ClientAuthConfig::OAuth2 {
        oauth_client_id: "oauth-app".to_string(),
    };
    let good = PresentedCredentials::OAuth2 {
        oauth_client_id: "oauth-app".to_string(),
        access_token: "access-token-0001".to_string(),
    };
    let wrong_id = PresentedCredentials::OAuth2 {
        oauth_client_id: "other-app".to_string(),
        access_token: "access-token-0001".to_string(),
    };
    let bad_token = PresentedCredentials::OAuth2 {
        oauth_client_id: "oauth-app".to_string(),
        access_token: "tiny".to_string(),
    };
    assert!(verify_credentials(&config, &good));
    assert!(!verify_credentials(&config, &wrong_id));
    assert!(!verify_credentials(&config, &bad_token));
}

#[test]
fn certificate_subject_must_match() {
    let config = ClientAuthConfig::Certificate {
        subject: "CN=ide.local".to_string(),
    };
    let matching = PresentedCredentials::Certificate {
        subject: "CN=ide.local".to_string(),
    };
    let other = PresentedCredentials::Certificate {
        subject: "CN=evil.local".to_string(),
    };
    assert!(verify_credentials(&config, &matching));
    assert!(!verify_credentials(&config, &other));
}

#[test]
fn credentials_for_another_method_never_match() {
    let config = ClientAuthConfig::SharedSecret {
        secret: "tok-abcdefghijk".to_string(),
    };
    assert!(!verify_credentials(&config, &bearer("tok-abcdefghijk")));
}

#[test]
fn session_expires_after_ttl() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let session = h.integrator.authenticate(&id("ide"), &secret(SECRET)).unwrap();

    h.clock.advance(Duration::from_secs(3599));
    assert!(h.integrator.verify_session(&session.token).is_ok());
    h.clock.advance(Duration::from_secs(1));
    assert_eq!(h.integrator.verify_session(&session.token).unwrap_err(), SyncError::SessionInvalid);
}

#[test]
fn unknown_token_is_invalid() {
    let h = harness();
    let err = h.integrator.verify_session("forged").unwrap_err();
    assert_eq!(err.code(), "session_invalid");
}

#[test]
fn changing_credentials_revokes_sessions() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let session = h.integrator.authenticate(&id("ide"), &secret(SECRET)).unwrap();

    let rotated = ClientConfig::new(
        "ide",
        "ide client",
        ClientAuthConfig::SharedSecret {
            secret: "rotated-secret".to_string(),
        },
        SyncOperation::ALL,
    );
    h.integrator.update_client(rotated).unwrap();
    assert!(h.integrator.verify_session(&session.token).is_err());
    assert!(h.integrator.authenticate(&id("ide"), &secret(SECRET)).is_err());
    assert!(h.integrator.authenticate(&id("ide"), &secret("rotated-secret")).is_ok());
}

#[test]
fn debug_output_redacts_secrets() {
    let mut h = harness();
    h.integrator.register(client("ide")).unwrap();
    let session = h.integrator.authenticate(&id("ide"), &secret(SECRET)).unwrap();

    assert!(!format!("{:?}", secret(SECRET)).contains(SECRET));
    assert!(!format!("{session:?}").contains(&session.token));
}

#[test]
fn constant_time_comparison_matches_equality() {
    assert!(constant_time_eq_str("abc", "abc"));
    assert!(!constant_time_eq_str("abc", "abd"));
    assert!(!constant_time_eq_str("abc", "abcd"));
}
