// crates/rule-orchestrator-core/src/core/inheritance.rs
// ============================================================================
// Module: Inheritance Records
// Description: Inheritance edges and composition results.
// Purpose: Describe how a document inherits from its parent and what a
// composed document looks like.
// Dependencies: crate::core::{identifiers, rule}, serde
// ============================================================================

//! ## Overview
//! Inheritance forms a forest: each document has at most one parent edge.
//! Edges are rebuilt from scratch whenever the hierarchy is analyzed and are
//! owned by the immutable hierarchy snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RulePath;
use crate::core::rule::RuleFormat;
use crate::core::rule::SectionMap;
use crate::core::rule::VariableMap;

// ============================================================================
// SECTION: Inheritance Kind
// ============================================================================

/// How a child inherits from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceKind {
    /// Inherit all content and metadata.
    Full,
    /// Inherit content sections only.
    Content,
    /// Inherit metadata only.
    Metadata,
    /// Inherit variables only.
    Variables,
    /// Inherit specific sections.
    Selective,
}

impl InheritanceKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 5] =
        [Self::Full, Self::Content, Self::Metadata, Self::Variables, Self::Selective];

    /// Parses a directive value (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "content" => Some(Self::Content),
            "metadata" => Some(Self::Metadata),
            "variables" => Some(Self::Variables),
            "selective" => Some(Self::Selective),
            _ => None,
        }
    }

    /// Returns true when parent sections are seeded into the composition.
    #[must_use]
    pub const fn includes_content(self) -> bool {
        matches!(self, Self::Full | Self::Content)
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Content => "content",
            Self::Metadata => "metadata",
            Self::Variables => "variables",
            Self::Selective => "selective",
        }
    }
}

impl fmt::Display for InheritanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Inheritance Edge
// ============================================================================

/// Parent/child relationship between two documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InheritanceEdge {
    /// Parent document path.
    pub parent: RulePath,
    /// Child document path.
    pub child: RulePath,
    /// Inheritance kind.
    pub kind: InheritanceKind,
    /// Parent sections the child does not define.
    pub inherited_sections: Vec<String>,
    /// Parent sections the child redefines.
    pub overridden_sections: Vec<String>,
    /// Parent variables overlaid with child variables.
    pub merged_variables: VariableMap,
    /// Number of ancestors above the child.
    pub depth: usize,
    /// Human-readable conflict descriptions.
    pub conflicts: Vec<String>,
}

// ============================================================================
// SECTION: Composition
// ============================================================================

/// Whether a composition folded any ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionKind {
    /// No parent; output is the raw document.
    Direct,
    /// Ancestors were folded into the output.
    Composed,
}

/// Descriptive metadata for a composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionMetadata {
    /// Composition kind.
    pub kind: CompositionKind,
    /// Length of the inheritance chain.
    pub depth: usize,
    /// Number of sections in the output.
    pub section_count: usize,
    /// Number of variables in the output.
    pub variable_count: usize,
    /// Output format.
    pub format: RuleFormat,
}

/// Output of composing a document with its ancestors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionResult {
    /// Rendered output in the target's native format.
    pub content: String,
    /// Merged section map.
    pub sections: SectionMap,
    /// Merged variable map.
    pub variables: VariableMap,
    /// Contributing document paths, root first.
    pub sources: Vec<RulePath>,
    /// Edges used, nearest parent first.
    pub chain: Vec<InheritanceEdge>,
    /// Overrides applied during the fold.
    pub resolved_conflicts: Vec<String>,
    /// Inheritance conflicts carried along the chain.
    pub warnings: Vec<String>,
    /// Descriptive metadata.
    pub metadata: CompositionMetadata,
}
