// crates/rule-orchestrator-core/src/runtime/compose.rs
// ============================================================================
// Module: Rule Composition
// Description: Folds an inheritance chain into one document and renders it.
// Purpose: Produce the effective rule for a document and its ancestors.
// Dependencies: crate::core, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! Composition walks the chain root first. For every edge the parent's
//! sections are seeded when the edge kind carries content, parent variables
//! are seeded, and then the child's own sections and variables overwrite.
//! Every overwrite that changes an already-set value is recorded as a
//! resolved conflict naming the child that won.
//!
//! Rendering is format-native so composed output re-parses into the same
//! sections: headings for markdown, a `{variables, sections}` object for JSON
//! and YAML, blank-line separated text otherwise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::inheritance::CompositionKind;
use crate::core::inheritance::CompositionMetadata;
use crate::core::inheritance::CompositionResult;
use crate::core::inheritance::InheritanceEdge;
use crate::core::rule::DEFAULT_SECTION;
use crate::core::rule::RuleContent;
use crate::core::rule::RuleFormat;
use crate::core::rule::SectionMap;
use crate::core::rule::VariableMap;

// ============================================================================
// SECTION: Chain Steps
// ============================================================================

/// One edge of an inheritance chain with both endpoint documents.
#[derive(Debug, Clone, Copy)]
pub struct ChainStep<'a> {
    /// Parent document.
    pub parent: &'a RuleContent,
    /// Child document.
    pub child: &'a RuleContent,
    /// Edge between them.
    pub edge: &'a InheritanceEdge,
}

// ============================================================================
// SECTION: Composition
// ============================================================================

/// Composition of a document without a parent: the raw document.
#[must_use]
pub fn compose_direct(target: &RuleContent) -> CompositionResult {
    CompositionResult {
        content: target.raw.clone(),
        sections: target.sections.clone(),
        variables: target.variables.clone(),
        sources: vec![target.path().clone()],
        chain: Vec::new(),
        resolved_conflicts: Vec::new(),
        warnings: Vec::new(),
        metadata: CompositionMetadata {
            kind: CompositionKind::Direct,
            depth: 0,
            section_count: target.sections.len(),
            variable_count: target.variables.len(),
            format: target.format(),
        },
    }
}

/// Folds `steps` (root first, the last child being `target`).
///
/// An empty step list is a direct composition.
#[must_use]
pub fn compose_chain(target: &RuleContent, steps: &[ChainStep<'_>]) -> CompositionResult {
    let Some(root) = steps.first() else {
        return compose_direct(target);
    };
    let mut sections = SectionMap::new();
    let mut variables = VariableMap::new();
    let mut resolved_conflicts = Vec::new();
    let mut warnings = Vec::new();
    let mut sources = vec![root.parent.path().clone()];

    for step in steps {
        if step.edge.kind.includes_content() {
            for (name, text) in &step.parent.sections {
                sections.entry(name.clone()).or_insert_with(|| text.clone());
            }
        }
        for (name, value) in &step.parent.variables {
            variables.entry(name.clone()).or_insert_with(|| value.clone());
        }
        let child = step.child.path();
        for (name, text) in &step.child.sections {
            if let Some(previous) = sections.insert(name.clone(), text.clone())
                && previous != *text
            {
                resolved_conflicts.push(format!("Section '{name}' overridden by {child}"));
            }
        }
        for (name, value) in &step.child.variables {
            if let Some(previous) = variables.insert(name.clone(), value.clone())
                && previous != *value
            {
                resolved_conflicts.push(format!("Variable '{name}' overridden by {child}"));
            }
        }
        warnings.extend(step.edge.conflicts.iter().map(|conflict| format!("{child}: {conflict}")));
        sources.push(child.clone());
    }

    let format = target.format();
    CompositionResult {
        content: render_document(format, &sections, &variables),
        metadata: CompositionMetadata {
            kind: CompositionKind::Composed,
            depth: steps.len(),
            section_count: sections.len(),
            variable_count: variables.len(),
            format,
        },
        chain: steps.iter().rev().map(|step| step.edge.clone()).collect(),
        sections,
        variables,
        sources,
        resolved_conflicts,
        warnings,
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders sections and variables in a document format.
#[must_use]
pub fn render_document(format: RuleFormat, sections: &SectionMap, variables: &VariableMap) -> String {
    match format {
        RuleFormat::Mdc | RuleFormat::Markdown => render_markdown(sections, variables),
        RuleFormat::Json => {
            let tree = json!({ "variables": variables, "sections": sections });
            serde_json::to_string_pretty(&tree).unwrap_or_default()
        }
        RuleFormat::Yaml => {
            let tree = json!({ "variables": variables, "sections": sections });
            serde_yaml::to_string(&tree).unwrap_or_default()
        }
        RuleFormat::Text => ordered_sections(sections)
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Markdown: the untitled section, the variable list, then one heading per
/// named section.
fn render_markdown(sections: &SectionMap, variables: &VariableMap) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(text) = sections.get(DEFAULT_SECTION) {
        parts.push(text.clone());
        parts.push(String::new());
    }
    if !variables.is_empty() {
        parts.push("# Variables".to_string());
        for (name, value) in variables {
            parts.push(format!("- {name}: {}", display_value(value)));
        }
        parts.push(String::new());
    }
    for (name, text) in sections.iter().filter(|(name, _)| name.as_str() != DEFAULT_SECTION) {
        parts.push(format!("# {name}"));
        parts.push(text.clone());
        parts.push(String::new());
    }
    parts.join("\n").trim().to_string()
}

/// Iterates sections with the untitled section first.
fn ordered_sections(sections: &SectionMap) -> impl Iterator<Item = (&String, &String)> {
    let leading = sections.get_key_value(DEFAULT_SECTION);
    leading.into_iter().chain(sections.iter().filter(|(name, _)| name.as_str() != DEFAULT_SECTION))
}

/// Displays a variable value; strings render without quotes.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
