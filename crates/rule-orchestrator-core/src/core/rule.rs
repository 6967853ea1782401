// crates/rule-orchestrator-core/src/core/rule.rs
// ============================================================================
// Module: Rule Documents
// Description: Parsed rule documents, formats, categories, and metadata.
// Purpose: Canonical in-memory form of one rule file after parsing.
// Dependencies: crate::core::{hashing, identifiers, inheritance}, serde
// ============================================================================

//! ## Overview
//! A [`RuleContent`] is created once by the parser and never mutated. A
//! re-scan replaces documents wholesale. Sections and variables are kept in
//! ordered maps so rendering and hashing stay deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::RulePath;
use crate::core::inheritance::InheritanceKind;

// ============================================================================
// SECTION: Aliases
// ============================================================================

/// Section name to section text.
pub type SectionMap = BTreeMap<String, String>;

/// Variable name to variable value.
pub type VariableMap = BTreeMap<String, Value>;

/// Variable name that carries an explicit inheritance directive.
pub const INHERIT_VARIABLE: &str = "inherit";

/// Section name used for text outside any heading.
pub const DEFAULT_SECTION: &str = "content";

/// File extensions recognized as rule documents.
pub const RULE_EXTENSIONS: [&str; 6] = ["mdc", "md", "json", "yaml", "yml", "txt"];

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Document format, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFormat {
    /// Cursor-style markdown rule (`.mdc`).
    Mdc,
    /// Plain markdown (`.md`).
    Markdown,
    /// JSON document.
    Json,
    /// YAML document (`.yaml` / `.yml`).
    Yaml,
    /// Plain text fallback.
    Text,
}

impl RuleFormat {
    /// Maps a lowercase extension to a format; unknown extensions are text.
    #[must_use]
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            Some("mdc") => Self::Mdc,
            Some("md") => Self::Markdown,
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Text,
        }
    }

    /// Returns true for the heading-structured markdown variants.
    #[must_use]
    pub const fn is_structured_text(self) -> bool {
        matches!(self, Self::Mdc | Self::Markdown)
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mdc => "mdc",
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for RuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Categories
// ============================================================================

/// Classification of a rule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Essential system rules.
    Core,
    /// Development workflow rules.
    Workflow,
    /// Agent-specific rules.
    Agent,
    /// Project-specific rules.
    Project,
    /// Context management rules.
    Context,
    /// User-defined rules.
    Custom,
}

impl RuleCategory {
    /// All categories in declaration order.
    pub const ALL: [Self; 6] =
        [Self::Core, Self::Workflow, Self::Agent, Self::Project, Self::Context, Self::Custom];

    /// Returns a stable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Workflow => "workflow",
            Self::Agent => "agent",
            Self::Project => "project",
            Self::Context => "context",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Structured metadata derived from a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMetadata {
    /// Path relative to the rule root.
    pub path: RulePath,
    /// Detected format.
    pub format: RuleFormat,
    /// Classified category.
    pub category: RuleCategory,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time (unix milliseconds).
    pub modified_ms: i64,
    /// Checksum of the raw text.
    pub checksum: HashDigest,
    /// Declared dependencies, deduplicated and sorted.
    pub dependencies: Vec<String>,
    /// Declared version.
    pub version: String,
    /// Declared author.
    pub author: String,
    /// Free-form description.
    pub description: String,
    /// Free-form tags.
    pub tags: Vec<String>,
}

/// Filesystem facts the parser needs alongside the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    /// File size in bytes.
    pub size: u64,
    /// Last modification time (unix milliseconds).
    pub modified_ms: i64,
}

// ============================================================================
// SECTION: Rule Content
// ============================================================================

/// A parsed rule document.
///
/// # Invariants
/// - `metadata.checksum` is the checksum of `raw`.
/// - `parse_issues` is empty unless a structured extractor failed; in that
///   case `sections` and `variables` hold whatever could be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleContent {
    /// Document metadata.
    pub metadata: RuleMetadata,
    /// Raw file text.
    pub raw: String,
    /// Section name to text.
    pub sections: SectionMap,
    /// Extracted cross references (raw form).
    pub references: BTreeSet<String>,
    /// Extracted variables.
    pub variables: VariableMap,
    /// Non-fatal parse problems.
    pub parse_issues: Vec<String>,
}

impl RuleContent {
    /// Returns the document path.
    #[must_use]
    pub const fn path(&self) -> &RulePath {
        &self.metadata.path
    }

    /// Returns the document format.
    #[must_use]
    pub const fn format(&self) -> RuleFormat {
        self.metadata.format
    }

    /// Returns the document category.
    #[must_use]
    pub const fn category(&self) -> RuleCategory {
        self.metadata.category
    }

    /// Returns the explicit inheritance directive, if declared and valid.
    #[must_use]
    pub fn inherit_directive(&self) -> Option<InheritanceKind> {
        self.variables.get(INHERIT_VARIABLE).and_then(Value::as_str).and_then(InheritanceKind::parse)
    }
}
