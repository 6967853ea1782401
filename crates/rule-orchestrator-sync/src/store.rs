// crates/rule-orchestrator-sync/src/store.rs
// ============================================================================
// Module: Authoritative Rule Store
// Description: In-memory server copy of the rule set.
// Purpose: Hold the server side of every sync comparison.
// Dependencies: rule-orchestrator-core
// ============================================================================

//! ## Overview
//! The store is seeded from the loaded hierarchy and updated by client
//! pushes. Refreshing from disk only overwrites a path whose on-disk checksum
//! changed since the previous refresh, so accepted pushes survive a rescan of
//! an unchanged tree.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rule_orchestrator_core::HashDigest;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::hashing::content_checksum;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One server-side document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRule {
    /// Full document text.
    pub content: String,
    /// Checksum of `content`.
    pub checksum: HashDigest,
}

impl StoredRule {
    /// Wraps text with its checksum.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let checksum = content_checksum(&content);
        Self {
            content,
            checksum,
        }
    }
}

/// Authoritative document set.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    /// Current server documents.
    documents: BTreeMap<RulePath, StoredRule>,
    /// Checksums seen on disk at the last refresh.
    disk: BTreeMap<RulePath, HashDigest>,
}

impl RuleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a document.
    #[must_use]
    pub fn get(&self, path: &RulePath) -> Option<&StoredRule> {
        self.documents.get(path)
    }

    /// Returns all documents.
    #[must_use]
    pub const fn documents(&self) -> &BTreeMap<RulePath, StoredRule> {
        &self.documents
    }

    /// Returns the checksum of every document.
    #[must_use]
    pub fn checksums(&self) -> BTreeMap<RulePath, HashDigest> {
        self.documents.iter().map(|(path, rule)| (path.clone(), rule.checksum.clone())).collect()
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true when the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Writes a document; returns true when its content changed.
    pub fn put(&mut self, path: RulePath, content: impl Into<String>) -> bool {
        let rule = StoredRule::new(content);
        let changed = self.documents.get(&path).is_none_or(|existing| existing.checksum != rule.checksum);
        self.documents.insert(path, rule);
        changed
    }

    /// Removes a document.
    pub fn remove(&mut self, path: &RulePath) -> Option<StoredRule> {
        self.documents.remove(path)
    }

    /// Applies the current on-disk documents; returns the number of paths
    /// written or removed.
    ///
    /// # Invariants
    /// - A path is overwritten only when its disk checksum changed.
    /// - A path that vanished from disk is removed only when the store still
    ///   holds the last disk version.
    pub fn refresh_from_disk<'a>(
        &mut self,
        documents: impl IntoIterator<Item = (&'a RulePath, &'a str)>,
    ) -> usize {
        let mut changed = 0;
        let mut seen = BTreeMap::new();
        for (path, text) in documents {
            let checksum = content_checksum(text);
            if self.disk.get(path) != Some(&checksum) {
                self.documents.insert(path.clone(), StoredRule {
                    content: text.to_string(),
                    checksum: checksum.clone(),
                });
                changed += 1;
            }
            seen.insert(path.clone(), checksum);
        }
        for (path, previous) in &self.disk {
            if seen.contains_key(path) {
                continue;
            }
            if self.documents.get(path).is_some_and(|rule| &rule.checksum == previous) {
                self.documents.remove(path);
                changed += 1;
            }
        }
        self.disk = seen;
        changed
    }
}
