// crates/rule-orchestrator-core/src/runtime/parser.rs
// ============================================================================
// Module: Rule Content Parser
// Description: Format detection and structural parsing of rule files.
// Purpose: Turn raw rule text into sections, references, and variables.
// Dependencies: crate::core, regex, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! [`RuleParser`] reads one file (size-limited, UTF-8 only) and produces an
//! immutable [`RuleContent`]. Structured extractors never fail the parse:
//! malformed JSON, YAML, or front matter is recorded in
//! [`RuleContent::parse_issues`] and the document keeps whatever structure
//! could be recovered.
//!
//! Security posture: file contents are untrusted; reads are bounded by
//! `max_file_bytes` and confined to the rule root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::content_checksum;
use crate::core::identifiers::RulePath;
use crate::core::rule::DEFAULT_SECTION;
use crate::core::rule::FileStats;
use crate::core::rule::INHERIT_VARIABLE;
use crate::core::rule::RULE_EXTENSIONS;
use crate::core::rule::RuleCategory;
use crate::core::rule::RuleContent;
use crate::core::rule::RuleFormat;
use crate::core::rule::RuleMetadata;
use crate::core::rule::SectionMap;
use crate::core::rule::VariableMap;
use crate::core::time::system_time_millis;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Default upper bound on a single rule file.
pub const DEFAULT_MAX_FILE_BYTES: usize = 1024 * 1024;

/// Version recorded when a document declares none.
const DEFAULT_VERSION: &str = "1.0";

/// Author recorded when a document declares none.
const DEFAULT_AUTHOR: &str = "system";

/// Front matter fence line.
const FRONT_MATTER_FENCE: &str = "---";

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Compiles a literal pattern; an invalid literal disables that extractor.
fn pattern(source: &str) -> Option<Regex> {
    Regex::new(source).ok()
}

/// `[text](mdc:target)` dependency links.
static MDC_DEPENDENCY: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"\[([^\]]+)\]\(mdc:([^)]+)\)"));
/// `@import "target"` directives.
static IMPORT_DEPENDENCY: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r#"@import\s+"([^"]+)""#));
/// `include: target` directives.
static INCLUDE_DEPENDENCY: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"include:[ \t]*([^\n]+)"));
/// `depends_on: [a, b]` lists.
static DEPENDS_ON: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"depends_on:\s*\[([^\]]+)\]"));
/// Markdown link targets.
static LINK_TARGET: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"\[([^\]]*)\]\(([^)\s]+)\)"));
/// `@name` mentions.
static MENTION: LazyLock<Option<Regex>> = LazyLock::new(|| pattern(r"(?:^|[^\w@])@([a-zA-Z_-]+)"));
/// `{{name}}` placeholders.
static HANDLEBARS_VARIABLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"\{\{\s*([^{}]+?)\s*\}\}"));
/// `${name}` placeholders.
static SHELL_VARIABLE: LazyLock<Option<Regex>> = LazyLock::new(|| pattern(r"\$\{([^{}]+)\}"));
/// Bare `UPPER_CASE` placeholders (at least one underscore).
static BARE_VARIABLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"\b[A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+\b"));
/// Absolute URLs.
static URL: LazyLock<Option<Regex>> = LazyLock::new(|| pattern(r"https?://[^\s)\]]+"));

/// Iterates captures of a lazily compiled pattern.
fn captures<'t>(
    pattern: &'static LazyLock<Option<Regex>>,
    text: &'t str,
) -> impl Iterator<Item = Captures<'t>> + 't {
    pattern.as_ref().into_iter().flat_map(move |regex| regex.captures_iter(text))
}

/// Returns the trimmed text of a capture group, if present and non-empty.
fn group(captures: &Captures<'_>, index: usize) -> Option<String> {
    captures
        .get(index)
        .map(|found| found.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while reading a rule file.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Filesystem error.
    #[error("failed to read rule file {path}: {message}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error text.
        message: String,
    },
    /// File exceeds the configured limit.
    #[error("rule file {path} exceeds size limit ({actual} > {limit} bytes)")]
    TooLarge {
        /// Offending path.
        path: String,
        /// Configured limit.
        limit: usize,
        /// Observed size.
        actual: u64,
    },
    /// File is not valid UTF-8.
    #[error("rule file {path} is not valid utf-8")]
    InvalidUtf8 {
        /// Offending path.
        path: String,
    },
    /// File lies outside the rule root.
    #[error("rule file {path} is outside the rule root")]
    OutsideRoot {
        /// Offending path.
        path: String,
    },
}

impl ParseError {
    /// Returns a stable machine-readable label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io {
                ..
            } => "io",
            Self::TooLarge {
                ..
            } => "too_large",
            Self::InvalidUtf8 {
                ..
            } => "invalid_utf8",
            Self::OutsideRoot {
                ..
            } => "outside_root",
        }
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Parses rule files into [`RuleContent`] documents.
#[derive(Debug, Clone, Copy)]
pub struct RuleParser {
    /// Maximum accepted file size.
    max_file_bytes: usize,
}

impl Default for RuleParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

impl RuleParser {
    /// Creates a parser with the given per-file byte limit.
    #[must_use]
    pub const fn new(max_file_bytes: usize) -> Self {
        Self {
            max_file_bytes,
        }
    }

    /// Returns the per-file byte limit.
    #[must_use]
    pub const fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Detects the format of a file from its extension.
    #[must_use]
    pub fn detect_format(path: &Path) -> RuleFormat {
        let extension =
            path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        RuleFormat::from_extension(extension.as_deref())
    }

    /// Returns true when the file has a recognized rule extension.
    #[must_use]
    pub fn is_rule_file(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| RULE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Reads and parses a rule file located under `root`.
    ///
    /// `path` may be absolute or relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the file is outside the root, unreadable,
    /// too large, or not UTF-8.
    pub fn parse(&self, root: &Path, path: &Path) -> Result<RuleContent, ParseError> {
        let full = if path.is_absolute() { path.to_path_buf() } else { root.join(path) };
        let display = full.display().to_string();
        let relative = full.strip_prefix(root).map_err(|_| ParseError::OutsideRoot {
            path: display.clone(),
        })?;
        let metadata = fs::metadata(&full).map_err(|err| ParseError::Io {
            path: display.clone(),
            message: err.to_string(),
        })?;
        let limit = u64::try_from(self.max_file_bytes).unwrap_or(u64::MAX);
        if metadata.len() > limit {
            return Err(ParseError::TooLarge {
                path: display,
                limit: self.max_file_bytes,
                actual: metadata.len(),
            });
        }
        let bytes = fs::read(&full).map_err(|err| ParseError::Io {
            path: display.clone(),
            message: err.to_string(),
        })?;
        let text = String::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8 {
            path: display,
        })?;
        let stats = FileStats {
            size: metadata.len(),
            modified_ms: metadata.modified().map(system_time_millis).unwrap_or_default(),
        };
        Ok(self.parse_str(RulePath::from_relative(relative), &text, stats))
    }

    /// Parses rule text that has already been read.
    #[must_use]
    pub fn parse_str(&self, path: RulePath, text: &str, stats: FileStats) -> RuleContent {
        let format = RuleFormat::from_extension(path.extension().as_deref());
        let category = classify(&path, text);
        let dependencies = scan_dependencies(text);
        let extracted = match format {
            RuleFormat::Mdc | RuleFormat::Markdown => extract_markdown(text),
            RuleFormat::Json => extract_tree(serde_json::from_str::<Value>(text), "json"),
            RuleFormat::Yaml => extract_tree(serde_yaml::from_str::<Value>(text), "yaml"),
            RuleFormat::Text => extract_text(text),
        };
        let details = extracted.details;
        RuleContent {
            metadata: RuleMetadata {
                path,
                format,
                category,
                size: stats.size,
                modified_ms: stats.modified_ms,
                checksum: content_checksum(text),
                dependencies: dependencies.into_iter().collect(),
                version: details.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
                author: details.author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
                description: details.description.unwrap_or_default(),
                tags: details.tags,
            },
            raw: text.to_string(),
            sections: extracted.sections,
            references: extracted.references,
            variables: extracted.variables,
            parse_issues: extracted.issues,
        }
    }
}

// ============================================================================
// SECTION: Classification and Dependencies
// ============================================================================

/// Classifies a document by path keywords first, then content keywords.
fn classify(path: &RulePath, text: &str) -> RuleCategory {
    let path_lower = path.as_str().to_ascii_lowercase();
    let path_rules: [(&[&str], RuleCategory); 5] = [
        (&["core", "essential"], RuleCategory::Core),
        (&["workflow"], RuleCategory::Workflow),
        (&["agent"], RuleCategory::Agent),
        (&["project"], RuleCategory::Project),
        (&["context"], RuleCategory::Context),
    ];
    for (keywords, category) in path_rules {
        if keywords.iter().any(|keyword| path_lower.contains(keyword)) {
            return category;
        }
    }
    let text_lower = text.to_lowercase();
    let content_rules: [(&[&str], RuleCategory); 3] = [
        (&["core", "essential", "critical"], RuleCategory::Core),
        (&["workflow", "development", "process"], RuleCategory::Workflow),
        (&["agent", "@agent", "role"], RuleCategory::Agent),
    ];
    for (keywords, category) in content_rules {
        if keywords.iter().any(|keyword| text_lower.contains(keyword)) {
            return category;
        }
    }
    RuleCategory::Custom
}

/// Collects declared dependencies from every supported directive syntax.
fn scan_dependencies(text: &str) -> BTreeSet<String> {
    let mut dependencies = BTreeSet::new();
    dependencies.extend(captures(&MDC_DEPENDENCY, text).filter_map(|found| group(&found, 2)));
    dependencies.extend(captures(&IMPORT_DEPENDENCY, text).filter_map(|found| group(&found, 1)));
    dependencies.extend(captures(&INCLUDE_DEPENDENCY, text).filter_map(|found| group(&found, 1)));
    for found in captures(&DEPENDS_ON, text) {
        let Some(list) = group(&found, 1) else {
            continue;
        };
        dependencies.extend(
            list.split(',')
                .map(|item| item.trim().trim_matches(['"', '\'']).trim().to_string())
                .filter(|item| !item.is_empty()),
        );
    }
    dependencies
}

// ============================================================================
// SECTION: Extractors
// ============================================================================

/// Descriptive fields declared by the document itself.
#[derive(Debug, Default)]
struct DeclaredDetails {
    /// Declared version.
    version: Option<String>,
    /// Declared author.
    author: Option<String>,
    /// Declared description.
    description: Option<String>,
    /// Declared tags.
    tags: Vec<String>,
}

/// Output of a format-specific extractor.
#[derive(Debug, Default)]
struct Extracted {
    /// Section map.
    sections: SectionMap,
    /// Raw references.
    references: BTreeSet<String>,
    /// Variables.
    variables: VariableMap,
    /// Non-fatal problems.
    issues: Vec<String>,
    /// Declared descriptive fields.
    details: DeclaredDetails,
}

/// Normalizes a placeholder name to the canonical `${name}` value.
fn canonical_placeholder(name: &str) -> Value {
    Value::String(format!("${{{name}}}"))
}

/// Strips the `mdc:` prefix from a reference target.
fn strip_mdc(target: &str) -> String {
    target.strip_prefix("mdc:").unwrap_or(target).to_string()
}

/// Splits optional YAML front matter from a markdown body.
#[must_use]
pub fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix(FRONT_MATTER_FENCE)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let body = &rest[offset + line.len()..];
            return Some((&rest[..offset], body));
        }
        offset += line.len();
    }
    None
}

/// Applies front matter fields to extracted state.
fn apply_front_matter(front: &str, extracted: &mut Extracted) {
    let value = match serde_yaml::from_str::<Value>(front) {
        Ok(value) => value,
        Err(err) => {
            extracted.issues.push(format!("invalid front matter: {err}"));
            return;
        }
    };
    let fields = match value {
        Value::Object(fields) => fields,
        Value::Null => return,
        _ => {
            extracted.issues.push("front matter is not a mapping".to_string());
            return;
        }
    };
    extracted.details.description = fields.get("description").and_then(scalar_text);
    extracted.details.version = fields.get("version").and_then(scalar_text);
    extracted.details.author = fields.get("author").and_then(scalar_text);
    extracted.details.tags = match fields.get("tags") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    seed_variables(&fields, extracted);
}

/// Seeds variables and the inheritance directive from a top-level object.
fn seed_variables(fields: &serde_json::Map<String, Value>, extracted: &mut Extracted) {
    if let Some(Value::Object(variables)) = fields.get("variables") {
        for (name, value) in variables {
            extracted.variables.insert(name.clone(), value.clone());
        }
    }
    if let Some(Value::String(directive)) = fields.get(INHERIT_VARIABLE) {
        extracted
            .variables
            .insert(INHERIT_VARIABLE.to_string(), Value::String(directive.trim().to_string()));
    }
}

/// Renders a scalar JSON value as text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Extracts sections, references, and variables from markdown text.
fn extract_markdown(text: &str) -> Extracted {
    let mut extracted = Extracted::default();
    let body = match split_front_matter(text) {
        Some((front, body)) => {
            apply_front_matter(front, &mut extracted);
            body
        }
        None => text,
    };

    let mut current = DEFAULT_SECTION.to_string();
    let mut headed = false;
    let mut buffer: Vec<&str> = Vec::new();
    for line in body.lines() {
        if line.starts_with('#') {
            let name = line.trim_start_matches('#').trim();
            if !name.is_empty() {
                store_section(&mut extracted.sections, &current, &buffer, headed);
                current = name.to_string();
                headed = true;
                buffer.clear();
                continue;
            }
        }
        buffer.push(line);
    }
    store_section(&mut extracted.sections, &current, &buffer, headed);

    for found in captures(&LINK_TARGET, body) {
        if let Some(target) = group(&found, 2) {
            extracted.references.insert(strip_mdc(&target));
        }
    }
    for found in captures(&MENTION, body) {
        if let Some(name) = group(&found, 1) {
            extracted.references.insert(format!("@{name}"));
        }
    }

    let mut placeholders = VariableMap::new();
    for source in [&HANDLEBARS_VARIABLE, &SHELL_VARIABLE] {
        for found in captures(source, body) {
            if let Some(name) = group(&found, 1) {
                placeholders.insert(name.clone(), canonical_placeholder(&name));
            }
        }
    }
    if let Some(regex) = BARE_VARIABLE.as_ref() {
        for found in regex.find_iter(body) {
            let name = found.as_str();
            placeholders.insert(name.to_string(), canonical_placeholder(name));
        }
    }
    // Declared values take precedence over discovered placeholders.
    for (name, value) in placeholders {
        extracted.variables.entry(name).or_insert(value);
    }
    extracted
}

/// Stores a buffered section; the implicit leading section is kept only when
/// it has text.
fn store_section(sections: &mut SectionMap, name: &str, lines: &[&str], headed: bool) {
    let text = lines.join("\n").trim().to_string();
    if !headed && text.is_empty() {
        return;
    }
    match sections.get_mut(name) {
        Some(existing) if !text.is_empty() => {
            if !existing.is_empty() {
                existing.push_str("\n\n");
            }
            existing.push_str(&text);
        }
        Some(_) => {}
        None => {
            sections.insert(name.to_string(), text);
        }
    }
}

/// Extracts structure from a parsed JSON or YAML tree.
fn extract_tree<E: std::fmt::Display>(parsed: Result<Value, E>, label: &str) -> Extracted {
    let mut extracted = Extracted::default();
    let value = match parsed {
        Ok(value) => value,
        Err(err) => {
            extracted.issues.push(format!("invalid {label}: {err}"));
            return extracted;
        }
    };
    collect_tree_references(&value, &mut extracted.references);
    if let Value::Object(fields) = &value {
        seed_variables(fields, &mut extracted);
        if let Some(Value::Object(sections)) = fields.get("sections") {
            for (name, section) in sections {
                let text = match section {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                extracted.sections.insert(name.clone(), text);
            }
        }
        extracted.details.description = fields.get("description").and_then(scalar_text);
        extracted.details.version = fields.get("version").and_then(scalar_text);
        extracted.details.author = fields.get("author").and_then(scalar_text);
        if let Some(Value::Array(tags)) = fields.get("tags") {
            extracted.details.tags = tags.iter().filter_map(scalar_text).collect();
        }
    }
    extracted
}

/// Collects string leaves that look like references.
fn collect_tree_references(value: &Value, references: &mut BTreeSet<String>) {
    match value {
        Value::String(text) if text.contains("mdc:") || text.contains("http") => {
            references.insert(strip_mdc(text.trim()));
        }
        Value::Array(items) => {
            for item in items {
                collect_tree_references(item, references);
            }
        }
        Value::Object(fields) => {
            for item in fields.values() {
                collect_tree_references(item, references);
            }
        }
        _ => {}
    }
}

/// Plain text: one section, URLs only.
fn extract_text(text: &str) -> Extracted {
    let mut extracted = Extracted::default();
    extracted.sections.insert(DEFAULT_SECTION.to_string(), text.to_string());
    if let Some(regex) = URL.as_ref() {
        extracted.references.extend(regex.find_iter(text).map(|found| found.as_str().to_string()));
    }
    extracted
}

// ============================================================================
// SECTION: Tests
// ============================================================================
