// crates/rule-orchestrator-core/src/runtime/hierarchy.rs
// ============================================================================
// Module: Rule Hierarchy
// Description: Directory loading, parent discovery, inheritance analysis.
// Purpose: Build immutable hierarchy snapshots and answer questions about them.
// Dependencies: crate::{audit, core, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`HierarchyManager::load_hierarchy`] walks a rule root, parses every
//! recognized file, and returns an immutable [`HierarchySnapshot`]. The
//! snapshot stores documents in a vector, indexes them by path, and keeps
//! the inheritance edge of each document in a parallel vector.
//!
//! Parent discovery is conventional: a document's parent is the nearest
//! `index`, `base`, `parent`, or `_base` file in an ancestor directory, with
//! root-level `base`, `index`, `_base` as fallback. A document whose own stem
//! is conventional skips its own directory, so parents always live strictly
//! higher in the tree and the inheritance relation is a forest.
//!
//! Invariants:
//! - Each document has at most one parent edge and never parents itself.
//! - The reference graph only contains edges between loaded documents.
//! - Snapshot hashes change whenever any document checksum changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::audit::EngineEvent;
use crate::audit::EventLevel;
use crate::audit::SharedEventSink;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_bytes;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::RulePath;
use crate::core::inheritance::CompositionResult;
use crate::core::inheritance::InheritanceEdge;
use crate::core::inheritance::InheritanceKind;
use crate::core::rule::RULE_EXTENSIONS;
use crate::core::rule::RuleContent;
use crate::runtime::compose::ChainStep;
use crate::runtime::compose::compose_chain;
use crate::runtime::compose::compose_direct;
use crate::runtime::compose::display_value;
use crate::runtime::graph::DependencyOrder;
use crate::runtime::graph::ReferenceGraph;
use crate::runtime::graph::detect_cycles;
use crate::runtime::graph::resolve_dependencies;
use crate::runtime::parser::RuleParser;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional parent stems searched in ancestor directories.
const PARENT_STEMS: [&str; 4] = ["index", "base", "parent", "_base"];

/// Root-level fallback parent stems.
const ROOT_FALLBACK_STEMS: [&str; 3] = ["base", "index", "_base"];

/// Section overlap ratio above which inheritance is content-only.
const CONTENT_OVERLAP_THRESHOLD: f64 = 0.7;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hierarchy errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// Rule root does not exist.
    #[error("rule root not found: {0}")]
    MissingRoot(String),
    /// Rule root is not a directory.
    #[error("rule root is not a directory: {0}")]
    NotADirectory(String),
    /// Rule root could not be listed.
    #[error("failed to read rule root {path}: {message}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error text.
        message: String,
    },
    /// Requested document is not part of the snapshot.
    #[error("rule not found: {0}")]
    RuleNotFound(RulePath),
}

impl HierarchyError {
    /// Returns a stable machine-readable label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingRoot(_) => "missing_root",
            Self::NotADirectory(_) => "not_a_directory",
            Self::Io {
                ..
            } => "io",
            Self::RuleNotFound(_) => "rule_not_found",
        }
    }
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Node of the path-segment tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleTreeNode {
    /// Subdirectories by name.
    pub directories: BTreeMap<String, RuleTreeNode>,
    /// Documents directly in this directory.
    pub documents: Vec<RulePath>,
}

impl RuleTreeNode {
    /// Returns the number of directories below this node.
    #[must_use]
    pub fn directory_count(&self) -> usize {
        self.directories.values().map(|child| 1 + child.directory_count()).sum()
    }

    /// Returns the deepest document level (root documents are level 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        let below = self.directories.values().map(Self::depth).max().unwrap_or_default();
        if below > 0 {
            below + 1
        } else {
            usize::from(!self.documents.is_empty())
        }
    }
}

/// Reference that did not resolve to a loaded document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DanglingReference {
    /// Referencing document.
    pub source: RulePath,
    /// Reference as written.
    pub reference: String,
}

/// File skipped during loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// Path as seen on disk.
    pub path: String,
    /// Reason code.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

/// Aggregate inheritance statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HierarchyStatistics {
    /// Loaded documents.
    pub total_documents: usize,
    /// Documents with a parent edge.
    pub documents_with_inheritance: usize,
    /// Deepest inheritance chain.
    pub max_depth: usize,
    /// Edge count per inheritance kind.
    pub kind_counts: BTreeMap<InheritanceKind, usize>,
    /// Conflict descriptions across all edges.
    pub total_conflicts: usize,
}

/// Result of validating a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True when no errors were found.
    pub valid: bool,
    /// Blocking problems.
    pub errors: Vec<String>,
    /// Non-blocking problems.
    pub warnings: Vec<String>,
    /// Reference cycles in canonical rotation.
    pub cycles: Vec<Vec<RulePath>>,
    /// Unresolved references.
    pub dangling_references: Vec<DanglingReference>,
    /// Aggregate statistics.
    pub statistics: HierarchyStatistics,
}

/// Structural summary of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyInfo {
    /// Rule root.
    pub root: String,
    /// Snapshot hash.
    pub snapshot_hash: String,
    /// Loaded documents.
    pub total_files: usize,
    /// Directories containing documents.
    pub total_directories: usize,
    /// Reference graph nodes.
    pub graph_nodes: usize,
    /// Reference graph edges.
    pub graph_edges: usize,
    /// Parent edges.
    pub inheritance_relationships: usize,
    /// Deepest document level in the tree.
    pub tree_depth: usize,
    /// Reference cycles.
    pub cycles: Vec<Vec<RulePath>>,
    /// Edge count per inheritance kind.
    pub kind_counts: BTreeMap<InheritanceKind, usize>,
    /// Files skipped during loading.
    pub skipped_files: usize,
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable view of a loaded rule root.
///
/// # Invariants
/// - `documents` is sorted by path and `index` maps every path to its slot.
/// - `parents[i]` is the edge whose child is `documents[i]`.
#[derive(Debug, Clone)]
pub struct HierarchySnapshot {
    /// Rule root on disk.
    root: PathBuf,
    /// Documents sorted by path.
    documents: Vec<RuleContent>,
    /// Path to document slot.
    index: BTreeMap<RulePath, usize>,
    /// Parent edge per document slot.
    parents: Vec<Option<InheritanceEdge>>,
    /// Resolved reference graph.
    graph: ReferenceGraph,
    /// Unresolved references.
    dangling: Vec<DanglingReference>,
    /// Path-segment tree.
    tree: RuleTreeNode,
    /// Files skipped during loading.
    skipped: Vec<SkippedFile>,
    /// Hash over every document checksum.
    hash: HashDigest,
}

impl HierarchySnapshot {
    /// Builds a snapshot from parsed documents.
    #[must_use]
    pub fn from_documents(
        root: PathBuf,
        mut documents: Vec<RuleContent>,
        skipped: Vec<SkippedFile>,
    ) -> Self {
        documents.sort_by(|left, right| left.path().cmp(right.path()));
        documents.dedup_by(|left, right| left.path() == right.path());
        let index: BTreeMap<RulePath, usize> = documents
            .iter()
            .enumerate()
            .map(|(slot, document)| (document.path().clone(), slot))
            .collect();

        let parent_slots: Vec<Option<usize>> =
            documents.iter().map(|document| find_parent(document.path(), &index)).collect();
        let parents = documents
            .iter()
            .enumerate()
            .map(|(slot, child)| {
                parent_slots[slot].map(|parent| {
                    let depth = chain_depth(slot, &parent_slots);
                    build_edge(&documents[parent], child, depth)
                })
            })
            .collect();

        let (graph, dangling) = build_reference_graph(&documents, &index);
        let tree = build_tree(&documents);
        let hash = snapshot_hash(&documents);
        Self {
            root,
            documents,
            index,
            parents,
            graph,
            dangling,
            tree,
            skipped,
            hash,
        }
    }

    /// Returns the rule root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns all documents sorted by path.
    #[must_use]
    pub fn documents(&self) -> &[RuleContent] {
        &self.documents
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true when no documents were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Looks up a document.
    #[must_use]
    pub fn get(&self, path: &RulePath) -> Option<&RuleContent> {
        self.index.get(path).map(|slot| &self.documents[*slot])
    }

    /// Returns the edge whose child is `path`.
    #[must_use]
    pub fn parent_edge(&self, path: &RulePath) -> Option<&InheritanceEdge> {
        self.index.get(path).and_then(|slot| self.parents[*slot].as_ref())
    }

    /// Iterates every inheritance edge.
    pub fn edges(&self) -> impl Iterator<Item = &InheritanceEdge> {
        self.parents.iter().flatten()
    }

    /// Returns the resolved reference graph.
    #[must_use]
    pub const fn graph(&self) -> &ReferenceGraph {
        &self.graph
    }

    /// Returns unresolved references.
    #[must_use]
    pub fn dangling_references(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// Returns the path-segment tree.
    #[must_use]
    pub const fn tree(&self) -> &RuleTreeNode {
        &self.tree
    }

    /// Returns files skipped during loading.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Returns the snapshot hash.
    #[must_use]
    pub const fn hash(&self) -> &HashDigest {
        &self.hash
    }

    /// Returns path to checksum for every document.
    #[must_use]
    pub fn checksums(&self) -> BTreeMap<RulePath, HashDigest> {
        self.documents
            .iter()
            .map(|document| (document.path().clone(), document.metadata.checksum.clone()))
            .collect()
    }

    /// Returns the inheritance chain of `path`, root first, ending at `path`.
    ///
    /// Unknown paths yield an empty chain.
    #[must_use]
    pub fn inheritance_chain(&self, path: &RulePath) -> Vec<RulePath> {
        if !self.index.contains_key(path) {
            return Vec::new();
        }
        let mut chain = vec![path.clone()];
        let mut seen = BTreeSet::from([path.clone()]);
        let mut current = path.clone();
        while let Some(edge) = self.parent_edge(&current) {
            if !seen.insert(edge.parent.clone()) {
                break;
            }
            chain.push(edge.parent.clone());
            current = edge.parent.clone();
        }
        chain.reverse();
        chain
    }

    /// Composes `path` with its ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::RuleNotFound`] for unknown paths.
    pub fn compose(&self, path: &RulePath) -> Result<CompositionResult, HierarchyError> {
        let target = self.get(path).ok_or_else(|| HierarchyError::RuleNotFound(path.clone()))?;
        let chain = self.inheritance_chain(path);
        let mut steps = Vec::with_capacity(chain.len().saturating_sub(1));
        for pair in chain.windows(2) {
            let (Some(parent), Some(child), Some(edge)) =
                (self.get(&pair[0]), self.get(&pair[1]), self.parent_edge(&pair[1]))
            else {
                continue;
            };
            steps.push(ChainStep {
                parent,
                child,
                edge,
            });
        }
        if steps.is_empty() {
            return Ok(compose_direct(target));
        }
        Ok(compose_chain(target, &steps))
    }

    /// Finds reference cycles.
    #[must_use]
    pub fn detect_circular_dependencies(&self) -> Vec<Vec<RulePath>> {
        detect_cycles(&self.graph)
    }

    /// Orders the dependencies of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::RuleNotFound`] for unknown paths.
    pub fn resolve_dependencies(&self, path: &RulePath) -> Result<DependencyOrder, HierarchyError> {
        if !self.index.contains_key(path) {
            return Err(HierarchyError::RuleNotFound(path.clone()));
        }
        Ok(resolve_dependencies(&self.graph, path))
    }

    /// Aggregates inheritance statistics.
    #[must_use]
    pub fn statistics(&self) -> HierarchyStatistics {
        let mut statistics = HierarchyStatistics {
            total_documents: self.documents.len(),
            ..HierarchyStatistics::default()
        };
        for edge in self.edges() {
            statistics.documents_with_inheritance += 1;
            statistics.max_depth = statistics.max_depth.max(edge.depth);
            *statistics.kind_counts.entry(edge.kind).or_default() += 1;
            statistics.total_conflicts += edge.conflicts.len();
        }
        statistics
    }

    /// Checks cycles, edges, and references.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let cycles = self.detect_circular_dependencies();
        for cycle in &cycles {
            errors.push(format!("Circular dependency: {}", describe_cycle(cycle)));
        }
        for edge in self.edges() {
            if !self.index.contains_key(&edge.parent) {
                errors.push(format!("Orphaned inheritance: {} -> {}", edge.child, edge.parent));
            }
            for conflict in &edge.conflicts {
                warnings.push(format!("Inheritance conflict in {}: {conflict}", edge.child));
            }
        }
        for dangling in &self.dangling {
            warnings.push(format!(
                "Unresolved reference in {}: {}",
                dangling.source, dangling.reference
            ));
        }
        for document in &self.documents {
            for issue in &document.parse_issues {
                warnings.push(format!("Parse issue in {}: {issue}", document.path()));
            }
        }
        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            cycles,
            dangling_references: self.dangling.clone(),
            statistics: self.statistics(),
        }
    }

    /// Summarizes the snapshot structure.
    #[must_use]
    pub fn info(&self) -> HierarchyInfo {
        HierarchyInfo {
            root: self.root.display().to_string(),
            snapshot_hash: self.hash.value.clone(),
            total_files: self.documents.len(),
            total_directories: self.tree.directory_count(),
            graph_nodes: self.graph.len(),
            graph_edges: self.graph.values().map(BTreeSet::len).sum(),
            inheritance_relationships: self.edges().count(),
            tree_depth: self.tree.depth(),
            cycles: self.detect_circular_dependencies(),
            kind_counts: self.statistics().kind_counts,
            skipped_files: self.skipped.len(),
        }
    }
}

/// Renders a cycle as `a -> b -> a`.
fn describe_cycle(cycle: &[RulePath]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(RulePath::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.as_str());
    }
    parts.join(" -> ")
}

// ============================================================================
// SECTION: Parent Discovery and Edges
// ============================================================================

/// Finds the conventional parent of `path`, if any.
fn find_parent(path: &RulePath, index: &BTreeMap<RulePath, usize>) -> Option<usize> {
    let conventional = PARENT_STEMS.contains(&path.file_stem());
    let segments: Vec<&str> = path.segments().collect();
    let dir_count = segments.len().saturating_sub(1);
    if conventional && dir_count == 0 {
        return None;
    }
    // A conventional file skips its own directory.
    let deepest = if conventional { dir_count - 1 } else { dir_count };
    for depth in (1..=deepest).rev() {
        let dir = segments[..depth].join("/");
        if let Some(slot) = lookup_stems(&dir, &PARENT_STEMS, path, index) {
            return Some(slot);
        }
    }
    lookup_stems("", &ROOT_FALLBACK_STEMS, path, index)
}

/// Finds the first `dir/stem.ext` present in the index, excluding `exclude`.
fn lookup_stems(
    dir: &str,
    stems: &[&str],
    exclude: &RulePath,
    index: &BTreeMap<RulePath, usize>,
) -> Option<usize> {
    for stem in stems {
        for extension in RULE_EXTENSIONS {
            let candidate = if dir.is_empty() {
                RulePath::new(format!("{stem}.{extension}"))
            } else {
                RulePath::new(format!("{dir}/{stem}.{extension}"))
            };
            if &candidate == exclude {
                continue;
            }
            if let Some(slot) = index.get(&candidate) {
                return Some(*slot);
            }
        }
    }
    None
}

/// Counts ancestors above `slot`, stopping on revisits.
fn chain_depth(slot: usize, parents: &[Option<usize>]) -> usize {
    let mut depth = 0;
    let mut seen = BTreeSet::from([slot]);
    let mut current = slot;
    while let Some(parent) = parents[current] {
        if !seen.insert(parent) {
            break;
        }
        depth += 1;
        current = parent;
    }
    depth
}

/// Infers the inheritance kind between two documents.
#[must_use]
pub fn infer_kind(parent: &RuleContent, child: &RuleContent) -> InheritanceKind {
    if let Some(kind) = child.inherit_directive() {
        return kind;
    }
    let parent_sections: BTreeSet<&String> = parent.sections.keys().collect();
    let common = parent_sections.iter().filter(|name| child.sections.contains_key(**name)).count();
    if common == parent_sections.len() {
        return InheritanceKind::Full;
    }
    #[allow(clippy::cast_precision_loss, reason = "Section counts are small.")]
    let ratio = common as f64 / parent_sections.len() as f64;
    if ratio > CONTENT_OVERLAP_THRESHOLD {
        InheritanceKind::Content
    } else if common > 0 {
        InheritanceKind::Selective
    } else {
        InheritanceKind::Metadata
    }
}

/// Lists category and variable disagreements between parent and child.
#[must_use]
pub fn detect_conflicts(parent: &RuleContent, child: &RuleContent) -> Vec<String> {
    let mut conflicts = Vec::new();
    if parent.category() != child.category() {
        conflicts.push(format!(
            "Type mismatch: parent={}, child={}",
            parent.category(),
            child.category()
        ));
    }
    for (name, child_value) in &child.variables {
        if let Some(parent_value) = parent.variables.get(name)
            && parent_value != child_value
        {
            conflicts.push(format!(
                "Variable conflict: {name} (parent={}, child={})",
                display_value(parent_value),
                display_value(child_value)
            ));
        }
    }
    conflicts
}

/// Builds the edge from `parent` to `child`.
fn build_edge(parent: &RuleContent, child: &RuleContent, depth: usize) -> InheritanceEdge {
    let mut merged_variables = parent.variables.clone();
    merged_variables.extend(child.variables.iter().map(|(name, value)| (name.clone(), value.clone())));
    let (overridden_sections, inherited_sections): (Vec<String>, Vec<String>) =
        parent.sections.keys().cloned().partition(|name| child.sections.contains_key(name));
    InheritanceEdge {
        parent: parent.path().clone(),
        child: child.path().clone(),
        kind: infer_kind(parent, child),
        inherited_sections,
        overridden_sections,
        merged_variables,
        depth,
        conflicts: detect_conflicts(parent, child),
    }
}

// ============================================================================
// SECTION: References, Tree, and Hash
// ============================================================================

/// Resolves references and declared dependencies to loaded documents.
fn build_reference_graph(
    documents: &[RuleContent],
    index: &BTreeMap<RulePath, usize>,
) -> (ReferenceGraph, Vec<DanglingReference>) {
    let mut graph = ReferenceGraph::new();
    let mut dangling = BTreeSet::new();
    for document in documents {
        let source = document.path();
        let targets = graph.entry(source.clone()).or_default();
        let raw = document.references.iter().chain(document.metadata.dependencies.iter());
        for reference in raw {
            match resolve_reference(source, reference, documents, index) {
                Resolution::Found(target) => {
                    if &target != source {
                        targets.insert(target);
                    }
                }
                Resolution::Missing => {
                    dangling.insert(DanglingReference {
                        source: source.clone(),
                        reference: reference.clone(),
                    });
                }
                Resolution::External => {}
            }
        }
    }
    (graph, dangling.into_iter().collect())
}

/// Outcome of resolving one reference.
enum Resolution {
    /// Resolved to a loaded document.
    Found(RulePath),
    /// Looks like a document path but nothing matched.
    Missing,
    /// URL, anchor, or unmatched mention.
    External,
}

/// Resolves one raw reference.
fn resolve_reference(
    source: &RulePath,
    reference: &str,
    documents: &[RuleContent],
    index: &BTreeMap<RulePath, usize>,
) -> Resolution {
    let reference = reference.trim();
    if reference.is_empty()
        || reference.contains("://")
        || reference.starts_with('#')
        || reference.starts_with("mailto:")
    {
        return Resolution::External;
    }
    if let Some(name) = reference.strip_prefix('@') {
        return documents
            .iter()
            .find(|document| document.path().file_stem() == name)
            .map_or(Resolution::External, |document| Resolution::Found(document.path().clone()));
    }
    let cleaned = reference.strip_prefix("mdc:").unwrap_or(reference);
    let cleaned = cleaned.split('#').next().unwrap_or_default();
    let cleaned = cleaned.trim_start_matches("./").trim_start_matches('/');
    if cleaned.is_empty() {
        return Resolution::External;
    }
    let exact = RulePath::new(cleaned);
    if index.contains_key(&exact) {
        return Resolution::Found(exact);
    }
    let sibling = source.join_sibling(cleaned);
    if index.contains_key(&sibling) {
        return Resolution::Found(sibling);
    }
    let suffix = format!("/{}", exact.as_str());
    index
        .keys()
        .find(|candidate| candidate.as_str().ends_with(&suffix))
        .map_or(Resolution::Missing, |found| Resolution::Found(found.clone()))
}

/// Builds the path-segment tree.
fn build_tree(documents: &[RuleContent]) -> RuleTreeNode {
    let mut root = RuleTreeNode::default();
    for document in documents {
        let segments: Vec<&str> = document.path().segments().collect();
        let mut node = &mut root;
        for directory in segments.iter().take(segments.len().saturating_sub(1)) {
            node = node.directories.entry((*directory).to_string()).or_default();
        }
        node.documents.push(document.path().clone());
    }
    root
}

/// Hashes the path to checksum map.
fn snapshot_hash(documents: &[RuleContent]) -> HashDigest {
    let checksums: BTreeMap<&str, &str> = documents
        .iter()
        .map(|document| (document.path().as_str(), document.metadata.checksum.value.as_str()))
        .collect();
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &checksums).unwrap_or_else(|_| {
        let joined: String =
            checksums.iter().map(|(path, checksum)| format!("{path}:{checksum}\n")).collect();
        hash_bytes(DEFAULT_HASH_ALGORITHM, joined.as_bytes())
    })
}

// ============================================================================
// SECTION: Manager
// ============================================================================

/// Loads hierarchy snapshots and reports notable findings as events.
#[derive(Clone)]
pub struct HierarchyManager {
    /// Parser used for every file.
    parser: RuleParser,
    /// Event destination.
    sink: SharedEventSink,
}

impl HierarchyManager {
    /// Creates a manager.
    #[must_use]
    pub fn new(parser: RuleParser, sink: SharedEventSink) -> Self {
        Self {
            parser,
            sink,
        }
    }

    /// Returns the parser.
    #[must_use]
    pub const fn parser(&self) -> &RuleParser {
        &self.parser
    }

    /// Loads every rule file under `root` into a new snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError`] when the root is missing, not a directory,
    /// or cannot be listed. Individual unreadable files are skipped.
    pub fn load_hierarchy(&self, root: &Path) -> Result<Arc<HierarchySnapshot>, HierarchyError> {
        let display = root.display().to_string();
        let metadata = fs::metadata(root).map_err(|_| HierarchyError::MissingRoot(display.clone()))?;
        if !metadata.is_dir() {
            return Err(HierarchyError::NotADirectory(display));
        }
        let mut files = Vec::new();
        collect_rule_files(root, &mut files).map_err(|err| HierarchyError::Io {
            path: display,
            message: err.to_string(),
        })?;

        let mut documents = Vec::with_capacity(files.len());
        let mut skipped = Vec::new();
        for file in files {
            match self.parser.parse(root, &file) {
                Ok(document) => {
                    for issue in &document.parse_issues {
                        self.sink.record(
                            &EngineEvent::new("rule_parse_issue", EventLevel::Warn, issue.clone())
                                .with_path(document.path().as_str()),
                        );
                    }
                    documents.push(document);
                }
                Err(err) => {
                    let path = file.display().to_string();
                    self.sink.record(
                        &EngineEvent::new("rule_file_skipped", EventLevel::Warn, err.to_string())
                            .with_path(path.clone()),
                    );
                    skipped.push(SkippedFile {
                        path,
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
        let snapshot = HierarchySnapshot::from_documents(root.to_path_buf(), documents, skipped);
        self.sink.record(&EngineEvent::new(
            "hierarchy_loaded",
            EventLevel::Info,
            format!(
                "loaded {} rules ({} inheritance edges, hash {})",
                snapshot.len(),
                snapshot.edges().count(),
                snapshot.hash().short(12)
            ),
        ));
        Ok(Arc::new(snapshot))
    }

    /// Finds reference cycles and logs each one.
    #[must_use]
    pub fn detect_circular_dependencies(&self, snapshot: &HierarchySnapshot) -> Vec<Vec<RulePath>> {
        let cycles = snapshot.detect_circular_dependencies();
        for cycle in &cycles {
            self.sink.record(&EngineEvent::new(
                "dependency_cycle",
                EventLevel::Warn,
                describe_cycle(cycle),
            ));
        }
        cycles
    }

    /// Orders the dependencies of `path`, logging an interrupted walk.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::RuleNotFound`] for unknown paths.
    pub fn resolve_dependencies(
        &self,
        snapshot: &HierarchySnapshot,
        path: &RulePath,
    ) -> Result<DependencyOrder, HierarchyError> {
        let order = snapshot.resolve_dependencies(path)?;
        if let Some(cycle) = &order.cycle {
            self.sink.record(
                &EngineEvent::new(
                    "dependency_cycle",
                    EventLevel::Warn,
                    format!("dependency order truncated by cycle {}", describe_cycle(cycle)),
                )
                .with_path(path.as_str()),
            );
        }
        Ok(order)
    }
}

/// Recursively collects rule files in sorted order. Symlinked directories are
/// not followed.
fn collect_rule_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(Result::ok).collect();
    entries.sort_by_key(fs::DirEntry::file_name);
    for entry in entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_dir() {
            // Unreadable subdirectories are skipped rather than failing the load.
            let _ = collect_rule_files(&path, files);
        } else if RuleParser::is_rule_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}
