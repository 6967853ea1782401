// crates/rule-orchestrator/src/orchestrator.rs
// ============================================================================
// Module: Orchestrator
// Description: Component wiring and the facade operations.
// Purpose: Load, compose, validate, and synchronize a rule root.
// Dependencies: rule-orchestrator-core, rule-orchestrator-config, rule-orchestrator-sync
// ============================================================================

//! ## Overview
//! The orchestrator holds the most recently loaded [`HierarchySnapshot`].
//! [`Orchestrator::compose`] and [`Orchestrator::rescan`] reload it from disk;
//! the read-only analyses reuse it and load it on first use. Every reload
//! also refreshes the client integrator's authoritative store.
//!
//! Cached compositions are keyed by `path@snapshot-hash`, so a change
//! anywhere in the tree produces new keys and stale entries age out by LRU
//! order or TTL.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use rule_orchestrator_config::OrchestratorConfig;
use rule_orchestrator_core::CacheStats;
use rule_orchestrator_core::ClientId;
use rule_orchestrator_core::CompositionResult;
use rule_orchestrator_core::DependencyOrder;
use rule_orchestrator_core::EngineEvent;
use rule_orchestrator_core::EventLevel;
use rule_orchestrator_core::HierarchyInfo;
use rule_orchestrator_core::HierarchyManager;
use rule_orchestrator_core::HierarchySnapshot;
use rule_orchestrator_core::RuleCache;
use rule_orchestrator_core::RuleParser;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::SharedClock;
use rule_orchestrator_core::SharedEventSink;
use rule_orchestrator_core::SystemClock;
use rule_orchestrator_core::ValidationReport;
use rule_orchestrator_sync::ClientIntegrator;
use rule_orchestrator_sync::SyncDiff;
use serde::Serialize;

use crate::catalog::CatalogEntry;
use crate::catalog::scan_catalog;
use crate::error::OrchestratorError;

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Component status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Working normally.
    Healthy,
    /// Working with skipped input or unresolved findings.
    Degraded,
}

/// Per-component status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    /// Content parser.
    pub parser: HealthStatus,
    /// Hierarchy manager; degraded when files were skipped or cycles exist.
    pub hierarchy: HealthStatus,
    /// Composition cache.
    pub cache: HealthStatus,
    /// Client integrator.
    pub integrator: HealthStatus,
}

/// Facade status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratorInfo {
    /// Rule root.
    pub root: String,
    /// Initialization time (unix milliseconds).
    pub initialized_at_ms: i64,
    /// Component status.
    pub components: ComponentHealth,
    /// Composition cache statistics.
    pub cache: CacheStats,
    /// Loaded hierarchy summary.
    pub hierarchy: HierarchyInfo,
    /// Rule files on disk at the last scan.
    pub catalog: Vec<CatalogEntry>,
    /// Registered sync clients.
    pub clients: Vec<ClientId>,
}

/// A composition and whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedRule {
    /// Composed document.
    pub result: CompositionResult,
    /// True when served from the cache.
    pub cache_hit: bool,
    /// Hash of the snapshot the composition belongs to.
    pub snapshot_hash: String,
}

/// Outcome of a rescan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RescanSummary {
    /// Documents in the new snapshot.
    pub documents: usize,
    /// Store documents written or removed by the refresh.
    pub store_changes: usize,
    /// Hash of the new snapshot.
    pub snapshot_hash: String,
    /// Rule files on disk.
    pub catalog_entries: usize,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Rule orchestrator facade.
pub struct Orchestrator {
    /// Rule root.
    root: PathBuf,
    /// Event sink.
    sink: SharedEventSink,
    /// Hierarchy loader.
    manager: HierarchyManager,
    /// Composition cache.
    cache: RuleCache<CompositionResult>,
    /// Client registrations and the authoritative store.
    integrator: ClientIntegrator,
    /// Most recently loaded snapshot.
    snapshot: Option<Arc<HierarchySnapshot>>,
    /// Rule files on disk at the last scan.
    catalog: Vec<CatalogEntry>,
    /// Initialization time (unix milliseconds).
    initialized_at_ms: i64,
}

impl Orchestrator {
    /// Builds an orchestrator using the wall clock and the configured sink.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the configuration is invalid, the
    /// sink cannot be opened, the root cannot be created, or a configured
    /// client fails to register.
    pub fn initialize(config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        let sink = config.logging.build_sink()?;
        Self::initialize_with(config, Arc::new(SystemClock), sink)
    }

    /// Builds an orchestrator with an explicit clock and sink.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::initialize`], minus sink construction.
    pub fn initialize_with(
        config: OrchestratorConfig,
        clock: SharedClock,
        sink: SharedEventSink,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let root = config.rules.root.clone();
        fs::create_dir_all(&root).map_err(|err| OrchestratorError::Io {
            path: root.display().to_string(),
            message: err.to_string(),
        })?;

        let parser = RuleParser::new(config.rules.max_file_bytes);
        let manager = HierarchyManager::new(parser, Arc::clone(&sink));
        let cache = RuleCache::new(config.cache.capacity, config.cache.default_ttl(), Arc::clone(&clock));
        let mut integrator =
            ClientIntegrator::new(parser, Arc::clone(&clock), Arc::clone(&sink), config.sync);
        for client in config.clients {
            integrator.register(client)?;
        }
        let catalog = scan_catalog(&root).map_err(|err| OrchestratorError::Io {
            path: root.display().to_string(),
            message: err.to_string(),
        })?;

        sink.record(&EngineEvent::new(
            "orchestrator_initialized",
            EventLevel::Info,
            format!(
                "root {} with {} rule files and {} clients",
                root.display(),
                catalog.len(),
                integrator.client_ids().len()
            ),
        ));
        Ok(Self {
            initialized_at_ms: clock.now_millis(),
            root,
            sink,
            manager,
            cache,
            integrator,
            snapshot: None,
            catalog,
        })
    }

    /// Returns the rule root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the catalog from the last scan.
    #[must_use]
    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Returns composition cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Returns the client integrator.
    #[must_use]
    pub const fn integrator(&self) -> &ClientIntegrator {
        &self.integrator
    }

    /// Returns the client integrator for registration and sync calls.
    pub const fn integrator_mut(&mut self) -> &mut ClientIntegrator {
        &mut self.integrator
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Reloads the hierarchy, refreshes the integrator store, and rescans the
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the root cannot be loaded.
    pub fn rescan(&mut self) -> Result<RescanSummary, OrchestratorError> {
        let (snapshot, store_changes) = self.reload()?;
        self.catalog = scan_catalog(&self.root).map_err(|err| OrchestratorError::Io {
            path: self.root.display().to_string(),
            message: err.to_string(),
        })?;
        Ok(RescanSummary {
            documents: snapshot.len(),
            store_changes,
            snapshot_hash: snapshot.hash().value.clone(),
            catalog_entries: self.catalog.len(),
        })
    }

    /// Loads a fresh snapshot and applies it to the integrator store.
    fn reload(&mut self) -> Result<(Arc<HierarchySnapshot>, usize), OrchestratorError> {
        let snapshot = self.manager.load_hierarchy(&self.root)?;
        let store_changes = self
            .integrator
            .refresh_server_state(snapshot.documents().iter().map(|doc| (doc.path(), doc.raw.as_str())));
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok((snapshot, store_changes))
    }

    /// Returns the loaded snapshot, loading it on first use.
    fn current(&mut self) -> Result<Arc<HierarchySnapshot>, OrchestratorError> {
        match &self.snapshot {
            Some(snapshot) => Ok(Arc::clone(snapshot)),
            None => Ok(self.reload()?.0),
        }
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Reports component health, cache statistics, and the hierarchy summary.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the hierarchy cannot be loaded.
    pub fn info(&mut self) -> Result<OrchestratorInfo, OrchestratorError> {
        let snapshot = self.current()?;
        let hierarchy = snapshot.info();
        let hierarchy_status = if hierarchy.skipped_files > 0 || !hierarchy.cycles.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        Ok(OrchestratorInfo {
            root: self.root.display().to_string(),
            initialized_at_ms: self.initialized_at_ms,
            components: ComponentHealth {
                parser: HealthStatus::Healthy,
                hierarchy: hierarchy_status,
                cache: HealthStatus::Healthy,
                integrator: HealthStatus::Healthy,
            },
            cache: self.cache.stats(),
            hierarchy,
            catalog: self.catalog.clone(),
            clients: self.integrator.client_ids(),
        })
    }

    /// Composes `path` with its inheritance chain against a freshly loaded
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Hierarchy`] with code `rule_not_found`
    /// when the document does not exist, or when the root cannot be loaded.
    pub fn compose(&mut self, path: &RulePath) -> Result<ComposedRule, OrchestratorError> {
        let (snapshot, _) = self.reload()?;
        let snapshot_hash = snapshot.hash().value.clone();
        let key = format!("{path}@{snapshot_hash}");
        if let Some(result) = self.cache.get(&key) {
            return Ok(ComposedRule {
                result,
                cache_hit: true,
                snapshot_hash,
            });
        }
        let result = snapshot.compose(path)?;
        self.cache.put(key, result.clone(), None);
        self.sink.record(
            &EngineEvent::new(
                "rule_composed",
                EventLevel::Info,
                format!("composed with {} inheritance edges", result.chain.len()),
            )
            .with_path(path.as_str()),
        );
        Ok(ComposedRule {
            result,
            cache_hit: false,
            snapshot_hash,
        })
    }

    /// Validates the loaded hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the hierarchy cannot be loaded.
    pub fn validate_hierarchy(&mut self) -> Result<ValidationReport, OrchestratorError> {
        Ok(self.current()?.validate())
    }

    /// Orders the dependencies of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] for unknown paths or when the hierarchy
    /// cannot be loaded.
    pub fn resolve_dependencies(&mut self, path: &RulePath) -> Result<DependencyOrder, OrchestratorError> {
        let snapshot = self.current()?;
        Ok(self.manager.resolve_dependencies(&snapshot, path)?)
    }

    /// Finds reference cycles in the loaded hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the hierarchy cannot be loaded.
    pub fn detect_cycles(&mut self) -> Result<Vec<Vec<RulePath>>, OrchestratorError> {
        let snapshot = self.current()?;
        Ok(self.manager.detect_circular_dependencies(&snapshot))
    }

    /// Compares the authoritative store with a client's last synchronized
    /// state. The store is seeded from the loaded snapshot and holds
    /// accepted pushes on top of it.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] for unknown clients or when the
    /// hierarchy cannot be loaded.
    pub fn diff(&mut self, client_id: &ClientId) -> Result<SyncDiff, OrchestratorError> {
        self.current()?;
        let server_state = self.integrator.store().checksums();
        Ok(self.integrator.diff(client_id, &server_state)?)
    }
}
