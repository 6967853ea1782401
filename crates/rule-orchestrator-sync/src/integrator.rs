// crates/rule-orchestrator-sync/src/integrator.rs
// ============================================================================
// Module: Client Integrator
// Description: Registration, authentication, and sync execution per client.
// Purpose: Reconcile client rule copies with the authoritative store.
// Dependencies: rule-orchestrator-core, rule-orchestrator-config, rand
// ============================================================================

//! ## Overview
//! The integrator owns the authoritative [`RuleStore`] and one state record
//! per registered client: its configuration, rate limiter, last synchronized
//! checksum per path, and bounded result history.
//!
//! A sync request is gated in order: unknown client, rate limit, permission.
//! It is then registered as active, executed, recorded, and broadcast to
//! listeners.
//!
//! Push is three-way: the client's content is compared with the server copy
//! and with the checksum the client last synchronized. When the server has
//! not moved since that base the client version is applied directly; when
//! it has, the client's conflict strategy decides.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;
use rule_orchestrator_config::ClientConfig;
use rule_orchestrator_config::SyncConfig;
use rule_orchestrator_core::ClientId;
use rule_orchestrator_core::ConflictStrategy;
use rule_orchestrator_core::EngineEvent;
use rule_orchestrator_core::EventLevel;
use rule_orchestrator_core::FileStats;
use rule_orchestrator_core::HashDigest;
use rule_orchestrator_core::RequestId;
use rule_orchestrator_core::RuleParser;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::SharedClock;
use rule_orchestrator_core::SharedEventSink;
use rule_orchestrator_core::SubscriptionId;
use rule_orchestrator_core::SyncOperation;
use rule_orchestrator_core::SyncStatus;
use rule_orchestrator_core::hashing::content_checksum;
use serde::Serialize;

use crate::auth::PresentedCredentials;
use crate::auth::SessionStore;
use crate::auth::SessionToken;
use crate::auth::verify_credentials;
use crate::conflict::ConflictKind;
use crate::conflict::ConflictReport;
use crate::conflict::ResolvedConflict;
use crate::conflict::RuleConflict;
use crate::conflict::resolve_conflict;
use crate::error::SyncError;
use crate::limiter::FixedWindowLimiter;
use crate::listener::SyncListener;
use crate::model::ClientAnalytics;
use crate::model::ClientSyncStatus;
use crate::model::SyncDiff;
use crate::model::SyncRequest;
use crate::model::SyncResult;
use crate::model::SyncStatusReport;
use crate::registry::ActiveSyncRegistry;
use crate::store::RuleStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Results listed in a client status report.
const RECENT_SYNC_COUNT: usize = 5;
/// Window for the recent-activity count.
const RECENT_ACTIVITY_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

// ============================================================================
// SECTION: Identifier Generation
// ============================================================================

/// Boot-scoped identifier generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
struct IdGenerator {
    /// Prefix included in every identifier.
    prefix: &'static str,
    /// Boot-scoped random component.
    boot_id: u64,
    /// Monotonic counter.
    counter: AtomicU64,
}

impl IdGenerator {
    /// Creates a generator with the given prefix.
    fn new(prefix: &'static str) -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            prefix,
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues the next identifier.
    fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:016x}-{:016x}", self.prefix, self.boot_id, seq)
    }
}

// ============================================================================
// SECTION: Client State
// ============================================================================

/// Summary returned by registration and updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRegistration {
    /// Client identifier.
    pub client_id: ClientId,
    /// Display name.
    pub client_name: String,
    /// Auth method label.
    pub auth_method: &'static str,
    /// Permitted operations.
    pub permissions: Vec<SyncOperation>,
    /// Requests allowed per minute.
    pub rate_limit_per_minute: u32,
}

impl ClientRegistration {
    /// Summarizes a client configuration.
    fn from_config(config: &ClientConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_name: config.client_name.clone(),
            auth_method: config.auth.method(),
            permissions: config.permissions.iter().copied().collect(),
            rate_limit_per_minute: config.rate_limit_per_minute,
        }
    }
}

/// Runtime state of one registered client.
#[derive(Debug, Clone)]
struct ClientState {
    /// Registration.
    config: ClientConfig,
    /// Request budget.
    limiter: FixedWindowLimiter,
    /// Last synchronized checksum per path.
    snapshot: BTreeMap<RulePath, HashDigest>,
    /// Results, oldest first.
    history: VecDeque<SyncResult>,
    /// Registration time (unix milliseconds).
    registered_at_ms: i64,
    /// Last sync time (unix milliseconds).
    last_sync_ms: Option<i64>,
}

// ============================================================================
// SECTION: Integrator
// ============================================================================

/// Registered clients plus the authoritative rule store.
pub struct ClientIntegrator {
    /// Parser used to classify and merge documents.
    parser: RuleParser,
    /// Time source.
    clock: SharedClock,
    /// Event sink.
    sink: SharedEventSink,
    /// Bookkeeping limits.
    settings: SyncConfig,
    /// Registered clients.
    clients: BTreeMap<ClientId, ClientState>,
    /// Authoritative documents.
    store: RuleStore,
    /// Issued sessions.
    sessions: SessionStore,
    /// In-flight requests.
    registry: ActiveSyncRegistry,
    /// Subscribed listeners in subscription order.
    listeners: Vec<(SubscriptionId, Arc<dyn SyncListener>)>,
    /// Request identifier source.
    request_ids: IdGenerator,
    /// Subscription identifier source.
    subscription_ids: IdGenerator,
}

impl ClientIntegrator {
    /// Creates an integrator with an empty store and no clients.
    #[must_use]
    pub fn new(
        parser: RuleParser,
        clock: SharedClock,
        sink: SharedEventSink,
        settings: SyncConfig,
    ) -> Self {
        Self {
            parser,
            clock,
            sink,
            sessions: SessionStore::new(settings.session_ttl()),
            settings,
            clients: BTreeMap::new(),
            store: RuleStore::new(),
            registry: ActiveSyncRegistry::new(),
            listeners: Vec::new(),
            request_ids: IdGenerator::new("sync"),
            subscription_ids: IdGenerator::new("sub"),
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers a client.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] when validation fails and
    /// [`SyncError::DuplicateClient`] when the id is taken.
    pub fn register(&mut self, config: ClientConfig) -> Result<ClientRegistration, SyncError> {
        config.validate().map_err(|err| SyncError::InvalidConfig(err.to_string()))?;
        if self.clients.contains_key(&config.client_id) {
            return Err(SyncError::DuplicateClient(config.client_id));
        }
        let now = self.clock.now_millis();
        let registration = ClientRegistration::from_config(&config);
        self.clients.insert(config.client_id.clone(), ClientState {
            limiter: FixedWindowLimiter::new(config.rate_limit_per_minute, now),
            config,
            snapshot: BTreeMap::new(),
            history: VecDeque::new(),
            registered_at_ms: now,
            last_sync_ms: None,
        });
        self.sink.record(
            &EngineEvent::new(
                "sync_client_registered",
                EventLevel::Info,
                format!("client registered with {} auth", registration.auth_method),
            )
            .with_client(registration.client_id.as_str()),
        );
        Ok(registration)
    }

    /// Replaces the configuration of a registered client, keeping its
    /// history, snapshot, and current rate-limit window.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] when validation fails and
    /// [`SyncError::UnknownClient`] when the client is not registered.
    pub fn update_client(&mut self, config: ClientConfig) -> Result<ClientRegistration, SyncError> {
        config.validate().map_err(|err| SyncError::InvalidConfig(err.to_string()))?;
        let state = self
            .clients
            .get_mut(&config.client_id)
            .ok_or_else(|| SyncError::UnknownClient(config.client_id.clone()))?;
        if state.config.auth != config.auth {
            self.sessions.revoke_client(&config.client_id);
        }
        state.limiter.set_limit(config.rate_limit_per_minute);
        state.config = config;
        let registration = ClientRegistration::from_config(&state.config);
        self.sink.record(
            &EngineEvent::new("sync_client_updated", EventLevel::Info, "client configuration replaced")
                .with_client(registration.client_id.as_str()),
        );
        Ok(registration)
    }

    /// Returns a client's configuration.
    #[must_use]
    pub fn client(&self, client_id: &ClientId) -> Option<&ClientConfig> {
        self.clients.get(client_id).map(|state| &state.config)
    }

    /// Lists registered client ids.
    #[must_use]
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.keys().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    /// Verifies credentials and issues a session token.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownClient`] or [`SyncError::AuthFailed`].
    pub fn authenticate(
        &mut self,
        client_id: &ClientId,
        credentials: &PresentedCredentials,
    ) -> Result<SessionToken, SyncError> {
        let state =
            self.clients.get(client_id).ok_or_else(|| SyncError::UnknownClient(client_id.clone()))?;
        if !verify_credentials(&state.config.auth, credentials) {
            self.sink.record(
                &EngineEvent::new(
                    "sync_auth_denied",
                    EventLevel::Warn,
                    format!("{} credentials rejected", credentials.method()),
                )
                .with_client(client_id.as_str()),
            );
            return Err(SyncError::AuthFailed(client_id.clone()));
        }
        let token = self.sessions.issue(client_id, self.clock.now_millis());
        self.sink.record(
            &EngineEvent::new(
                "sync_auth_allowed",
                EventLevel::Info,
                format!("{} credentials accepted", credentials.method()),
            )
            .with_client(client_id.as_str()),
        );
        Ok(token)
    }

    /// Resolves a session token to its client.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SessionInvalid`] when the token is unknown,
    /// expired, or its client is gone.
    pub fn verify_session(&self, token: &str) -> Result<ClientId, SyncError> {
        self.sessions
            .verify(token, self.clock.now_millis())
            .filter(|client_id| self.clients.contains_key(*client_id))
            .cloned()
            .ok_or(SyncError::SessionInvalid)
    }

    // ------------------------------------------------------------------------
    // Server State
    // ------------------------------------------------------------------------

    /// Returns the authoritative store.
    #[must_use]
    pub const fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Applies the current on-disk documents to the store.
    pub fn refresh_server_state<'a>(
        &mut self,
        documents: impl IntoIterator<Item = (&'a RulePath, &'a str)>,
    ) -> usize {
        self.store.refresh_from_disk(documents)
    }

    /// Returns a handle to the in-flight request registry.
    #[must_use]
    pub fn registry(&self) -> ActiveSyncRegistry {
        self.registry.clone()
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// Runs one sync request.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownClient`], [`SyncError::RateLimited`], or
    /// [`SyncError::PermissionDenied`] when a gate rejects the request, and
    /// [`SyncError::LockPoisoned`] when the active registry is poisoned.
    pub fn sync(
        &mut self,
        client_id: &ClientId,
        operation: SyncOperation,
        payload: BTreeMap<RulePath, String>,
    ) -> Result<SyncResult, SyncError> {
        let started = self.clock.now_millis();
        let state = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| SyncError::UnknownClient(client_id.clone()))?;
        if !state.limiter.try_acquire(started) {
            self.sink.record(
                &EngineEvent::new(
                    "sync_rate_limited",
                    EventLevel::Warn,
                    format!("{operation} rejected by rate limit"),
                )
                .with_client(client_id.as_str()),
            );
            return Err(SyncError::RateLimited {
                client_id: client_id.clone(),
                limit: state.limiter.limit(),
            });
        }
        if !state.config.permits(operation) {
            self.sink.record(
                &EngineEvent::new(
                    "sync_permission_denied",
                    EventLevel::Warn,
                    format!("{operation} not permitted"),
                )
                .with_client(client_id.as_str()),
            );
            return Err(SyncError::PermissionDenied {
                client_id: client_id.clone(),
                operation,
            });
        }

        let request = SyncRequest {
            request_id: RequestId::new(self.request_ids.issue()),
            client_id: client_id.clone(),
            operation,
            payload,
            timestamp_ms: started,
        };
        self.registry.begin(request.clone())?;
        let mut pass = SyncPass::new(&self.parser, &state.config, &mut state.snapshot, &mut self.store);
        match operation {
            SyncOperation::Push => pass.push(&request.payload),
            SyncOperation::Pull => {
                if !request.payload.is_empty() {
                    pass.warnings.push(format!(
                        "pull ignores {} payload document(s)",
                        request.payload.len()
                    ));
                }
                pass.pull();
            }
            SyncOperation::Bidirectional => {
                pass.push(&request.payload);
                pass.pull();
            }
            SyncOperation::Merge => pass.merge(&request.payload),
        }
        let outcome = pass.finish();
        self.registry.finish(&request.request_id)?;

        let finished = self.clock.now_millis();
        let result = outcome.into_result(&request, finished.saturating_sub(started), finished);
        state.history.push_back(result.clone());
        while state.history.len() > self.settings.max_history {
            state.history.pop_front();
        }
        state.last_sync_ms = Some(finished);

        let level = if result.is_success() { EventLevel::Info } else { EventLevel::Warn };
        self.sink.record(
            &EngineEvent::new(
                "sync_completed",
                level,
                format!(
                    "{operation} {}: {} processed, {} applied, {} unresolved",
                    result.status.label(),
                    result.processed.len(),
                    result.changes_applied,
                    result.conflicts.len()
                ),
            )
            .with_client(client_id.as_str())
            .with_request(result.request_id.as_str()),
        );
        self.notify(&result);
        Ok(result)
    }

    /// Compares server checksums with the client's last synchronized state.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownClient`] when the client is not registered.
    pub fn diff(
        &self,
        client_id: &ClientId,
        server_state: &BTreeMap<RulePath, HashDigest>,
    ) -> Result<SyncDiff, SyncError> {
        let state = self.state(client_id)?;
        let mut diff = SyncDiff {
            client_id: client_id.clone(),
            new: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
            unchanged: Vec::new(),
        };
        for (path, checksum) in server_state {
            match state.snapshot.get(path) {
                None => diff.new.push(path.clone()),
                Some(known) if known == checksum => diff.unchanged.push(path.clone()),
                Some(_) => diff.modified.push(path.clone()),
            }
        }
        diff.deleted = state
            .snapshot
            .keys()
            .filter(|path| !server_state.contains_key(*path))
            .cloned()
            .collect();
        Ok(diff)
    }

    /// Resolves conflicts with `strategy` (or the client's default) and
    /// applies every resolution to the store.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownClient`] when the client is not registered.
    pub fn resolve_conflicts(
        &mut self,
        client_id: &ClientId,
        conflicts: Vec<RuleConflict>,
        strategy: Option<ConflictStrategy>,
    ) -> Result<ConflictReport, SyncError> {
        let state = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| SyncError::UnknownClient(client_id.clone()))?;
        let strategy = strategy.unwrap_or(state.config.conflict_strategy);
        let mut report = ConflictReport {
            client_id: client_id.clone(),
            strategy,
            resolved: Vec::new(),
            unresolved: Vec::new(),
        };
        for conflict in conflicts {
            match resolve_conflict(&self.parser, &conflict, strategy) {
                Some(resolved) => {
                    self.store.put(resolved.path.clone(), resolved.content.clone());
                    state.snapshot.insert(resolved.path.clone(), resolved.checksum.clone());
                    report.resolved.push(resolved);
                }
                None => report.unresolved.push(conflict),
            }
        }
        self.sink.record(
            &EngineEvent::new(
                "sync_conflicts_resolved",
                EventLevel::Info,
                format!(
                    "{strategy}: {} resolved, {} unresolved",
                    report.resolved.len(),
                    report.unresolved.len()
                ),
            )
            .with_client(client_id.as_str()),
        );
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Status and Analytics
    // ------------------------------------------------------------------------

    /// Reports one recorded request, or the client's overall status when no
    /// request id is given.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownClient`], [`SyncError::RequestNotFound`],
    /// or [`SyncError::LockPoisoned`].
    pub fn sync_status(
        &self,
        client_id: &ClientId,
        request_id: Option<&RequestId>,
    ) -> Result<SyncStatusReport, SyncError> {
        let state = self.state(client_id)?;
        if let Some(request_id) = request_id {
            return state
                .history
                .iter()
                .find(|result| &result.request_id == request_id)
                .map(|result| SyncStatusReport::Request(result.clone()))
                .ok_or_else(|| SyncError::RequestNotFound(request_id.clone()));
        }
        let skip = state.history.len().saturating_sub(RECENT_SYNC_COUNT);
        Ok(SyncStatusReport::Client(ClientSyncStatus {
            client_id: client_id.clone(),
            last_sync_ms: state.last_sync_ms,
            auto_sync: state.config.auto_sync,
            sync_interval_secs: state.config.sync_interval_secs,
            recent: state.history.iter().skip(skip).map(SyncResult::summary).collect(),
            active: self.registry.active()?,
        }))
    }

    /// Aggregates a client's retained history.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownClient`] when the client is not registered.
    pub fn analytics(&self, client_id: &ClientId) -> Result<ClientAnalytics, SyncError> {
        let state = self.state(client_id)?;
        let now = self.clock.now_millis();
        let count = |status: SyncStatus| state.history.iter().filter(|r| r.status == status).count();
        let total = state.history.len();
        let successful = count(SyncStatus::Completed);
        let total_duration: i64 = state.history.iter().map(|result| result.duration_ms).sum();
        let cutoff = now.saturating_sub(RECENT_ACTIVITY_WINDOW_MS);
        Ok(ClientAnalytics {
            client_id: client_id.clone(),
            client_name: state.config.client_name.clone(),
            registered_at_ms: state.registered_at_ms,
            last_sync_ms: state.last_sync_ms,
            total_syncs: total,
            successful_syncs: successful,
            failed_syncs: count(SyncStatus::Failed),
            conflict_syncs: count(SyncStatus::Conflict),
            success_rate: percentage(successful, total),
            average_duration_ms: mean(total_duration, total),
            total_changes_applied: state.history.iter().map(|result| result.changes_applied).sum(),
            recent_activity: state.history.iter().filter(|r| r.timestamp_ms > cutoff).count(),
            rate_limit: state.limiter.usage(now),
        })
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    /// Subscribes a listener to completed sync results.
    pub fn subscribe(&mut self, listener: impl SyncListener + 'static) -> SubscriptionId {
        let id = SubscriptionId::new(self.subscription_ids.issue());
        self.listeners.push((id.clone(), Arc::new(listener)));
        id
    }

    /// Removes a listener; returns false when the id is unknown.
    pub fn unsubscribe(&mut self, subscription_id: &SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| id != subscription_id);
        self.listeners.len() != before
    }

    /// Delivers a result to every listener, logging failures.
    fn notify(&self, result: &SyncResult) {
        for (id, listener) in &self.listeners {
            if let Err(err) = listener.on_sync(result) {
                self.sink.record(
                    &EngineEvent::new(
                        "sync_listener_failed",
                        EventLevel::Warn,
                        format!("listener {id} failed: {err}"),
                    )
                    .with_client(result.client_id.as_str())
                    .with_request(result.request_id.as_str()),
                );
            }
        }
    }

    /// Looks up a client's state.
    fn state(&self, client_id: &ClientId) -> Result<&ClientState, SyncError> {
        self.clients.get(client_id).ok_or_else(|| SyncError::UnknownClient(client_id.clone()))
    }
}

// ============================================================================
// SECTION: Sync Pass
// ============================================================================

/// How a pushed document relates to the server copy.
enum PushDecision {
    /// Same content on both sides.
    Unchanged,
    /// Server absent or unchanged since the client's base.
    FastForward,
    /// Server moved since the client's base; carries the server text.
    Conflict(String),
}

/// Mutable view over one client's snapshot and the store for one request.
struct SyncPass<'a> {
    /// Parser for classification and merges.
    parser: &'a RuleParser,
    /// Requesting client.
    config: &'a ClientConfig,
    /// Client snapshot being advanced.
    snapshot: &'a mut BTreeMap<RulePath, HashDigest>,
    /// Authoritative store.
    store: &'a mut RuleStore,
    /// Paths examined, in order.
    processed: Vec<RulePath>,
    /// Documents for the client.
    documents: BTreeMap<RulePath, String>,
    /// Paths the client should delete.
    removed: Vec<RulePath>,
    /// Unresolved conflicts.
    conflicts: Vec<RuleConflict>,
    /// Strategy resolutions.
    resolved: Vec<ResolvedConflict>,
    /// Per-document failures.
    errors: Vec<String>,
    /// Skips and notes.
    warnings: Vec<String>,
    /// Documents changed on either side.
    changes: usize,
}

/// Accumulated outcome of a pass.
struct SyncOutcome {
    /// Paths examined, in order.
    processed: Vec<RulePath>,
    /// Documents for the client.
    documents: BTreeMap<RulePath, String>,
    /// Paths the client should delete.
    removed: Vec<RulePath>,
    /// Unresolved conflicts.
    conflicts: Vec<RuleConflict>,
    /// Strategy resolutions.
    resolved: Vec<ResolvedConflict>,
    /// Per-document failures.
    errors: Vec<String>,
    /// Skips and notes.
    warnings: Vec<String>,
    /// Documents changed on either side.
    changes: usize,
}

impl<'a> SyncPass<'a> {
    /// Starts an empty pass.
    const fn new(
        parser: &'a RuleParser,
        config: &'a ClientConfig,
        snapshot: &'a mut BTreeMap<RulePath, HashDigest>,
        store: &'a mut RuleStore,
    ) -> Self {
        Self {
            parser,
            config,
            snapshot,
            store,
            processed: Vec::new(),
            documents: BTreeMap::new(),
            removed: Vec::new(),
            conflicts: Vec::new(),
            resolved: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            changes: 0,
        }
    }

    /// Three-way push of every payload document.
    fn push(&mut self, payload: &BTreeMap<RulePath, String>) {
        for (path, content) in payload {
            if !self.admissible(path, content) {
                continue;
            }
            self.processed.push(path.clone());
            let client_checksum = content_checksum(content);
            let decision = match self.store.get(path) {
                Some(server) if server.checksum == client_checksum => PushDecision::Unchanged,
                Some(server) if self.snapshot.get(path) != Some(&server.checksum) => {
                    PushDecision::Conflict(server.content.clone())
                }
                _ => PushDecision::FastForward,
            };
            match decision {
                PushDecision::Unchanged => {
                    self.snapshot.insert(path.clone(), client_checksum);
                }
                PushDecision::FastForward => {
                    self.store.put(path.clone(), content.clone());
                    self.snapshot.insert(path.clone(), client_checksum);
                    self.changes += 1;
                }
                PushDecision::Conflict(server_content) => {
                    let base = self.snapshot.get(path).cloned();
                    let kind = if base.is_some() {
                        ConflictKind::ConcurrentModification
                    } else {
                        ConflictKind::Divergent
                    };
                    self.reconcile(RuleConflict::new(
                        path.clone(),
                        kind,
                        content.clone(),
                        server_content,
                        base,
                    ));
                }
            }
        }
    }

    /// Sends every server document the client has not synchronized, and
    /// removals for documents gone from the server.
    fn pull(&mut self) {
        let pending: BTreeSet<RulePath> =
            self.conflicts.iter().map(|conflict| conflict.path.clone()).collect();
        let mut updates = Vec::new();
        for (path, rule) in self.store.documents() {
            if pending.contains(path) || self.documents.contains_key(path) {
                continue;
            }
            if self.snapshot.get(path) != Some(&rule.checksum) {
                updates.push((path.clone(), rule.content.clone(), rule.checksum.clone()));
            }
        }
        for (path, content, checksum) in updates {
            self.processed.push(path.clone());
            self.snapshot.insert(path.clone(), checksum);
            self.documents.insert(path, content);
            self.changes += 1;
        }
        let gone: Vec<RulePath> = self
            .snapshot
            .keys()
            .filter(|path| self.store.get(path).is_none())
            .cloned()
            .collect();
        for path in gone {
            self.snapshot.remove(&path);
            self.removed.push(path);
            self.changes += 1;
        }
    }

    /// Reconciles every path present on either side.
    fn merge(&mut self, payload: &BTreeMap<RulePath, String>) {
        for (path, content) in payload {
            if !self.admissible(path, content) {
                continue;
            }
            self.processed.push(path.clone());
            let client_checksum = content_checksum(content);
            let server = self.store.get(path).map(|rule| (rule.content.clone(), rule.checksum.clone()));
            match server {
                None => {
                    self.store.put(path.clone(), content.clone());
                    self.snapshot.insert(path.clone(), client_checksum);
                    self.changes += 1;
                }
                Some((_, server_checksum)) if server_checksum == client_checksum => {
                    self.snapshot.insert(path.clone(), client_checksum);
                }
                Some((server_content, _)) => {
                    let base = self.snapshot.get(path).cloned();
                    self.reconcile(RuleConflict::new(
                        path.clone(),
                        ConflictKind::Divergent,
                        content.clone(),
                        server_content,
                        base,
                    ));
                }
            }
        }
        let server_only: Vec<(RulePath, String, HashDigest)> = self
            .store
            .documents()
            .iter()
            .filter(|(path, _)| !payload.contains_key(*path))
            .map(|(path, rule)| (path.clone(), rule.content.clone(), rule.checksum.clone()))
            .collect();
        for (path, content, checksum) in server_only {
            self.processed.push(path.clone());
            self.snapshot.insert(path.clone(), checksum);
            self.documents.insert(path, content);
            self.changes += 1;
        }
    }

    /// Applies the client's strategy to a conflict.
    fn reconcile(&mut self, conflict: RuleConflict) {
        match resolve_conflict(self.parser, &conflict, self.config.conflict_strategy) {
            Some(resolved) => {
                self.store.put(resolved.path.clone(), resolved.content.clone());
                self.snapshot.insert(resolved.path.clone(), resolved.checksum.clone());
                self.documents.insert(resolved.path.clone(), resolved.content.clone());
                self.resolved.push(resolved);
                self.changes += 1;
            }
            None => self.conflicts.push(conflict),
        }
    }

    /// Checks the path shape and the client's category allowance.
    fn admissible(&mut self, path: &RulePath, content: &str) -> bool {
        if path.as_str().is_empty() {
            self.errors.push("empty document path".to_string());
            return false;
        }
        if !RuleParser::is_rule_file(Path::new(path.as_str())) {
            self.errors.push(format!("{path}: unsupported rule file extension"));
            return false;
        }
        let category = self.parser.parse_str(path.clone(), content, FileStats::default()).category();
        if !self.config.allows_category(category) {
            self.warnings.push(format!("{path}: category {category} not allowed; skipped"));
            return false;
        }
        true
    }

    /// Ends the pass, releasing the borrowed state.
    fn finish(self) -> SyncOutcome {
        SyncOutcome {
            processed: self.processed,
            documents: self.documents,
            removed: self.removed,
            conflicts: self.conflicts,
            resolved: self.resolved,
            errors: self.errors,
            warnings: self.warnings,
            changes: self.changes,
        }
    }
}

impl SyncOutcome {
    /// Builds the final result; unresolved conflicts win over errors.
    fn into_result(self, request: &SyncRequest, duration_ms: i64, timestamp_ms: i64) -> SyncResult {
        let status = if !self.conflicts.is_empty() {
            SyncStatus::Conflict
        } else if !self.errors.is_empty() && self.processed.is_empty() {
            SyncStatus::Failed
        } else {
            SyncStatus::Completed
        };
        SyncResult {
            request_id: request.request_id.clone(),
            client_id: request.client_id.clone(),
            operation: request.operation,
            status,
            processed: self.processed,
            documents: self.documents,
            removed: self.removed,
            conflicts: self.conflicts,
            resolved: self.resolved,
            errors: self.errors,
            warnings: self.warnings,
            changes_applied: self.changes,
            duration_ms,
            timestamp_ms,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// `part / whole` as a percentage; zero when `whole` is zero.
#[allow(clippy::cast_precision_loss, reason = "History counts are far below 2^52.")]
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Mean of `total` over `count` items; zero when `count` is zero.
#[allow(clippy::cast_precision_loss, reason = "Durations and counts are far below 2^52.")]
fn mean(total: i64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total as f64 / count as f64
}
