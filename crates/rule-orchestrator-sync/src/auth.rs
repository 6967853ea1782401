// crates/rule-orchestrator-sync/src/auth.rs
// ============================================================================
// Module: Client Authentication
// Description: Credential verification and session token issuance.
// Purpose: Authenticate clients against their registered auth method.
// Dependencies: subtle, rand, base64, rule-orchestrator-config
// ============================================================================

//! ## Overview
//! Presented credentials are checked against the registered
//! [`ClientAuthConfig`] with one match arm per method. A credential for a
//! different method never matches. Secret comparisons run in constant time.
//! Successful authentication issues a random session token; the store keeps
//! only its SHA-256 fingerprint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use rule_orchestrator_config::ClientAuthConfig;
use rule_orchestrator_config::is_well_formed_token;
use rule_orchestrator_core::ClientId;
use rule_orchestrator_core::HashAlgorithm;
use rule_orchestrator_core::duration_millis;
use rule_orchestrator_core::hashing::hash_bytes;
use serde::Deserialize;
use serde::Serialize;
use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Random bytes per session token.
const SESSION_TOKEN_BYTES: usize = 32;

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Credentials presented by a client when authenticating.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PresentedCredentials {
    /// Pre-shared secret.
    SharedSecret {
        /// Secret value.
        secret: String,
    },
    /// Bearer token.
    BearerToken {
        /// Token value.
        token: String,
    },
    /// OAuth2 client id plus access token.
    #[serde(rename = "oauth2")]
    OAuth2 {
        /// OAuth2 client identifier.
        oauth_client_id: String,
        /// Access token issued to that client.
        access_token: String,
    },
    /// Certificate subject extracted by the transport.
    Certificate {
        /// Certificate subject.
        subject: String,
    },
}

impl PresentedCredentials {
    /// Returns a stable label for the auth method.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::SharedSecret {
                ..
            } => "shared_secret",
            Self::BearerToken {
                ..
            } => "bearer_token",
            Self::OAuth2 {
                ..
            } => "oauth2",
            Self::Certificate {
                ..
            } => "certificate",
        }
    }
}

impl fmt::Debug for PresentedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentedCredentials").field("method", &self.method()).finish_non_exhaustive()
    }
}

/// Compares two strings in constant time.
#[must_use]
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Verifies presented credentials against a registration.
#[must_use]
pub fn verify_credentials(expected: &ClientAuthConfig, presented: &PresentedCredentials) -> bool {
    match (expected, presented) {
        (
            ClientAuthConfig::SharedSecret {
                secret,
            },
            PresentedCredentials::SharedSecret {
                secret: given,
            },
        ) => constant_time_eq_str(secret, given),
        (
            ClientAuthConfig::BearerToken {
                allowed_tokens,
            },
            PresentedCredentials::BearerToken {
                token,
            },
        ) => {
            if !is_well_formed_token(token) {
                return false;
            }
            allowed_tokens.is_empty()
                || allowed_tokens
                    .iter()
                    .fold(false, |found, allowed| found | constant_time_eq_str(allowed, token))
        }
        (
            ClientAuthConfig::OAuth2 {
                oauth_client_id,
            },
            PresentedCredentials::OAuth2 {
                oauth_client_id: given,
                access_token,
            },
        ) => constant_time_eq_str(oauth_client_id, given) & is_well_formed_token(access_token),
        (
            ClientAuthConfig::Certificate {
                subject,
            },
            PresentedCredentials::Certificate {
                subject: given,
            },
        ) => constant_time_eq_str(subject, given),
        _ => false,
    }
}

// ============================================================================
// SECTION: Sessions
// ============================================================================

/// Session token returned by a successful authentication.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SessionToken {
    /// Opaque bearer value presented on later calls.
    pub token: String,
    /// Authenticated client.
    pub client_id: ClientId,
    /// Issue time (unix milliseconds).
    pub issued_at_ms: i64,
    /// Expiry time (unix milliseconds).
    pub expires_at_ms: i64,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("client_id", &self.client_id)
            .field("issued_at_ms", &self.issued_at_ms)
            .field("expires_at_ms", &self.expires_at_ms)
            .finish_non_exhaustive()
    }
}

/// Stored session, keyed by token fingerprint.
#[derive(Debug, Clone)]
struct SessionRecord {
    /// Session owner.
    client_id: ClientId,
    /// Expiry time (unix milliseconds).
    expires_at_ms: i64,
}

/// Issued sessions.
///
/// # Invariants
/// - Raw tokens are never stored; lookups hash the presented value.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Session lifetime in milliseconds.
    ttl_ms: i64,
    /// Fingerprint to session.
    sessions: BTreeMap<String, SessionRecord>,
}

impl SessionStore {
    /// Creates an empty store with the given session lifetime.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_ms: duration_millis(ttl),
            sessions: BTreeMap::new(),
        }
    }

    /// Issues a new session for `client_id`, dropping expired sessions first.
    pub fn issue(&mut self, client_id: &ClientId, now_ms: i64) -> SessionToken {
        self.sessions.retain(|_, record| record.expires_at_ms > now_ms);
        let mut bytes = [0u8; SESSION_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let expires_at_ms = now_ms.saturating_add(self.ttl_ms);
        self.sessions.insert(fingerprint(&token), SessionRecord {
            client_id: client_id.clone(),
            expires_at_ms,
        });
        SessionToken {
            token,
            client_id: client_id.clone(),
            issued_at_ms: now_ms,
            expires_at_ms,
        }
    }

    /// Returns the session owner when `token` is known and unexpired.
    #[must_use]
    pub fn verify(&self, token: &str, now_ms: i64) -> Option<&ClientId> {
        self.sessions
            .get(&fingerprint(token))
            .filter(|record| record.expires_at_ms > now_ms)
            .map(|record| &record.client_id)
    }

    /// Drops every session owned by `client_id`.
    pub fn revoke_client(&mut self, client_id: &ClientId) {
        self.sessions.retain(|_, record| &record.client_id != client_id);
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true when no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Hex SHA-256 of a token.
fn fingerprint(token: &str) -> String {
    hash_bytes(HashAlgorithm::Sha256, token.as_bytes()).value
}
