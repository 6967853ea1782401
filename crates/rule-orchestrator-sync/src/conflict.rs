// crates/rule-orchestrator-sync/src/conflict.rs
// ============================================================================
// Module: Conflict Resolution
// Description: Conflict records and one handler per conflict strategy.
// Purpose: Reconcile client and server versions of a document.
// Dependencies: rule-orchestrator-core, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! A conflict exists when client and server both hold a version of a path
//! and neither can simply replace the other. [`resolve_conflict`] applies one
//! [`ConflictStrategy`]:
//! - `merge`: section-level merge with client precedence. Markdown sections
//!   come from headings; JSON and YAML documents merge their object trees;
//!   plain text keeps the client copy.
//! - `override`: the server version wins.
//! - `append`: server text, a blank line, then client text.
//! - `manual`: left unresolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rule_orchestrator_core::ClientId;
use rule_orchestrator_core::ConflictStrategy;
use rule_orchestrator_core::FileStats;
use rule_orchestrator_core::HashDigest;
use rule_orchestrator_core::RuleFormat;
use rule_orchestrator_core::RuleParser;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::VariableMap;
use rule_orchestrator_core::hashing::content_checksum;
use rule_orchestrator_core::render_document;
use rule_orchestrator_core::split_front_matter;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// How a conflict arose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The server changed since the client's last synchronized version.
    ConcurrentModification,
    /// Both sides differ and no common version is known.
    Divergent,
}

/// A document both sides changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleConflict {
    /// Document path.
    pub path: RulePath,
    /// How the conflict arose.
    pub kind: ConflictKind,
    /// Client text.
    pub client_content: String,
    /// Server text.
    pub server_content: String,
    /// Checksum of the client text.
    pub client_checksum: HashDigest,
    /// Checksum of the server text.
    pub server_checksum: HashDigest,
    /// Checksum of the last synchronized version, if any.
    pub base_checksum: Option<HashDigest>,
}

impl RuleConflict {
    /// Builds a conflict record, computing both checksums.
    #[must_use]
    pub fn new(
        path: RulePath,
        kind: ConflictKind,
        client_content: impl Into<String>,
        server_content: impl Into<String>,
        base_checksum: Option<HashDigest>,
    ) -> Self {
        let client_content = client_content.into();
        let server_content = server_content.into();
        Self {
            client_checksum: content_checksum(&client_content),
            server_checksum: content_checksum(&server_content),
            path,
            kind,
            client_content,
            server_content,
            base_checksum,
        }
    }
}

/// A conflict settled by a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConflict {
    /// Document path.
    pub path: RulePath,
    /// Strategy applied.
    pub strategy: ConflictStrategy,
    /// Resolved text, now the server version.
    pub content: String,
    /// Checksum of `content`.
    pub checksum: HashDigest,
}

/// Outcome of resolving a batch of conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    /// Client the conflicts belong to.
    pub client_id: ClientId,
    /// Strategy applied.
    pub strategy: ConflictStrategy,
    /// Settled conflicts.
    pub resolved: Vec<ResolvedConflict>,
    /// Conflicts that need manual review.
    pub unresolved: Vec<RuleConflict>,
}

impl ConflictReport {
    /// Returns true when any conflict needs manual review.
    #[must_use]
    pub fn manual_review_required(&self) -> bool {
        !self.unresolved.is_empty()
    }
}

// ============================================================================
// SECTION: Strategies
// ============================================================================

/// Applies `strategy` to a conflict; `None` leaves it unresolved.
#[must_use]
pub fn resolve_conflict(
    parser: &RuleParser,
    conflict: &RuleConflict,
    strategy: ConflictStrategy,
) -> Option<ResolvedConflict> {
    let content = match strategy {
        ConflictStrategy::Merge => merge_contents(
            parser,
            &conflict.path,
            &conflict.client_content,
            &conflict.server_content,
        ),
        ConflictStrategy::Override => Some(conflict.server_content.clone()),
        ConflictStrategy::Append => Some(format!(
            "{}\n\n{}",
            conflict.server_content.trim_end(),
            conflict.client_content.trim_start()
        )),
        ConflictStrategy::Manual => None,
    }?;
    Some(ResolvedConflict {
        path: conflict.path.clone(),
        strategy,
        checksum: content_checksum(&content),
        content,
    })
}

/// Section-level merge with client precedence.
fn merge_contents(parser: &RuleParser, path: &RulePath, client: &str, server: &str) -> Option<String> {
    let format = RuleParser::detect_format(Path::new(path.as_str()));
    match format {
        RuleFormat::Mdc | RuleFormat::Markdown => {
            Some(merge_markdown(parser, path, format, client, server))
        }
        RuleFormat::Json => {
            let mut merged: Value = serde_json::from_str(server).ok()?;
            let overlay: Value = serde_json::from_str(client).ok()?;
            merge_values(&mut merged, overlay);
            serde_json::to_string_pretty(&merged).ok()
        }
        RuleFormat::Yaml => {
            let mut merged: Value = serde_yaml::from_str(server).ok()?;
            let overlay: Value = serde_yaml::from_str(client).ok()?;
            merge_values(&mut merged, overlay);
            serde_yaml::to_string(&merged).ok()
        }
        RuleFormat::Text => Some(client.to_string()),
    }
}

/// Merges heading sections and keeps the client's front matter (else the
/// server's).
fn merge_markdown(
    parser: &RuleParser,
    path: &RulePath,
    format: RuleFormat,
    client: &str,
    server: &str,
) -> String {
    let client_doc = parser.parse_str(path.clone(), client, FileStats::default());
    let server_doc = parser.parse_str(path.clone(), server, FileStats::default());
    let mut sections = server_doc.sections;
    sections.extend(client_doc.sections);
    let body = render_document(format, &sections, &VariableMap::new());
    match split_front_matter(client).or_else(|| split_front_matter(server)) {
        Some((front, _)) => format!("---\n{front}---\n{body}\n"),
        None => body,
    }
}

/// Overlays `overlay` onto `base`; objects merge key by key, anything else
/// is replaced.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
