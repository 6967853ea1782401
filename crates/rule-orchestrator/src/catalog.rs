// crates/rule-orchestrator/src/catalog.rs
// ============================================================================
// Module: Rule Catalog
// Description: Unparsed listing of rule files with filesystem facts.
// Purpose: Cheap inventory of the rule root for status reporting.
// Dependencies: rule-orchestrator-core
// ============================================================================

//! ## Overview
//! The catalog lists every recognized rule file under the root without
//! parsing it. Entries are sorted by path. Symlinked directories are not
//! followed and unreadable subdirectories are skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;

use rule_orchestrator_core::RuleFormat;
use rule_orchestrator_core::RuleParser;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::system_time_millis;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One rule file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Path relative to the rule root.
    pub path: RulePath,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time (unix milliseconds).
    pub modified_ms: i64,
    /// Format detected from the extension.
    pub format: RuleFormat,
}

// ============================================================================
// SECTION: Scan
// ============================================================================

/// Lists rule files under `root`.
///
/// # Errors
///
/// Returns an I/O error when `root` itself cannot be listed.
pub fn scan_catalog(root: &Path) -> io::Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();
    walk(root, root, &mut entries)?;
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Appends the rule files of `dir` and its subdirectories.
fn walk(root: &Path, dir: &Path, entries: &mut Vec<CatalogEntry>) -> io::Result<()> {
    for entry in fs::read_dir(dir)?.filter_map(Result::ok) {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_dir() {
            let _ = walk(root, &path, entries);
            continue;
        }
        if !file_type.is_file() || !RuleParser::is_rule_file(&path) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        entries.push(CatalogEntry {
            path: RulePath::from_relative(relative),
            size: metadata.len(),
            modified_ms: metadata.modified().map(system_time_millis).unwrap_or_default(),
            format: RuleParser::detect_format(&path),
        });
    }
    Ok(())
}
