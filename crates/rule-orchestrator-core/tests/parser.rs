// crates/rule-orchestrator-core/tests/parser.rs
// ============================================================================
// Module: Rule Parser Tests
// Description: Format detection, section splitting, and extraction.
// ============================================================================
//! ## Overview
//! Exercises every extractor plus the size, encoding, and root checks of
//! file parsing.

#![allow(dead_code, reason = "Common module may have unused helpers.")]
#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::fs;
use std::path::Path;

use rule_orchestrator_core::FileStats;
use rule_orchestrator_core::InheritanceKind;
use rule_orchestrator_core::ParseError;
use rule_orchestrator_core::RuleCategory;
use rule_orchestrator_core::RuleContent;
use rule_orchestrator_core::RuleFormat;
use rule_orchestrator_core::RuleParser;
use rule_orchestrator_core::RulePath;
use rule_orchestrator_core::hashing::content_checksum;
use rule_orchestrator_core::split_front_matter;
use serde_json::json;
use tempfile::TempDir;

fn parse(path: &str, text: &str) -> RuleContent {
    RuleParser::default().parse_str(RulePath::new(path), text, FileStats::default())
}

// ============================================================================
// SECTION: Format Detection
// ============================================================================

#[test]
fn detect_format_maps_extensions() {
    assert_eq!(RuleParser::detect_format(Path::new("a.mdc")), RuleFormat::Mdc);
    assert_eq!(RuleParser::detect_format(Path::new("a.md")), RuleFormat::Markdown);
    assert_eq!(RuleParser::detect_format(Path::new("a.MD")), RuleFormat::Markdown);
    assert_eq!(RuleParser::detect_format(Path::new("a.json")), RuleFormat::Json);
    assert_eq!(RuleParser::detect_format(Path::new("a.yaml")), RuleFormat::Yaml);
    assert_eq!(RuleParser::detect_format(Path::new("a.yml")), RuleFormat::Yaml);
    assert_eq!(RuleParser::detect_format(Path::new("a.txt")), RuleFormat::Text);
    assert_eq!(RuleParser::detect_format(Path::new("a.rs")), RuleFormat::Text);
    assert_eq!(RuleParser::detect_format(Path::new("noext")), RuleFormat::Text);
}

#[test]
fn is_rule_file_accepts_only_recognized_extensions() {
    assert!(RuleParser::is_rule_file(Path::new("rules/a.mdc")));
    assert!(RuleParser::is_rule_file(Path::new("rules/a.YML")));
    assert!(RuleParser::is_rule_file(Path::new("notes.txt")));
    assert!(!RuleParser::is_rule_file(Path::new("main.rs")));
    assert!(!RuleParser::is_rule_file(Path::new("Makefile")));
}

// ============================================================================
// SECTION: Markdown
// ============================================================================

#[test]
fn markdown_splits_sections_on_headings() {
    let doc = parse("guide.md", "intro text\n# Rules\nR1\n## Style Guide\nUse tabs\n");
    assert_eq!(doc.sections.get("content").map(String::as_str), Some("intro text"));
    assert_eq!(doc.sections.get("Rules").map(String::as_str), Some("R1"));
    assert_eq!(doc.sections.get("Style Guide").map(String::as_str), Some("Use tabs"));
    assert_eq!(doc.sections.len(), 3);
}

#[test]
fn markdown_without_leading_text_has_no_content_section() {
    let doc = parse("guide.md", "# Rules\nR2");
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections["Rules"], "R2");
}

#[test]
fn markdown_collects_links_mdc_targets_and_mentions() {
    let text = "See [base](mdc:core/base.mdc), [other](./other.md), \
                [docs](https://example.com/docs) and ask @reviewer.";
    let doc = parse("guide.mdc", text);
    assert!(doc.references.contains("core/base.mdc"));
    assert!(doc.references.contains("./other.md"));
    assert!(doc.references.contains("https://example.com/docs"));
    assert!(doc.references.contains("@reviewer"));
    assert_eq!(doc.metadata.dependencies, vec!["core/base.mdc".to_string()]);
}

#[test]
fn markdown_normalizes_placeholder_syntaxes() {
    let doc = parse("guide.md", "Hello {{ name }} at ${path} using API_KEY.");
    assert_eq!(doc.variables["name"], json!("${name}"));
    assert_eq!(doc.variables["path"], json!("${path}"));
    assert_eq!(doc.variables["API_KEY"], json!("${API_KEY}"));
    assert_eq!(doc.variables.len(), 3);
}

#[test]
fn front_matter_feeds_metadata_and_variables() {
    let text = "---\ndescription: Base rules\nversion: 2.1\nauthor: ops\ntags: [alpha, \
                beta]\ninherit: content\nvariables:\n  LEVEL: 3\n---\n# Rules\nR1\n";
    let doc = parse("base.md", text);
    assert_eq!(doc.metadata.description, "Base rules");
    assert_eq!(doc.metadata.version, "2.1");
    assert_eq!(doc.metadata.author, "ops");
    assert_eq!(doc.metadata.tags, vec!["alpha".to_string(), "beta".to_string()]);
    assert_eq!(doc.variables["LEVEL"], json!(3));
    assert_eq!(doc.inherit_directive(), Some(InheritanceKind::Content));
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections["Rules"], "R1");
    assert!(doc.parse_issues.is_empty());
}

#[test]
fn malformed_front_matter_is_recorded_not_fatal() {
    let doc = parse("base.md", "---\nvariables: [unclosed\n---\n# Rules\nR1\n");
    assert_eq!(doc.parse_issues.len(), 1);
    assert_eq!(doc.sections["Rules"], "R1");
}

#[test]
fn defaults_apply_without_front_matter() {
    let doc = parse("plain.md", "# Rules\nR1");
    assert_eq!(doc.metadata.version, "1.0");
    assert_eq!(doc.metadata.author, "system");
    assert!(doc.metadata.tags.is_empty());
}

#[test]
fn split_front_matter_requires_closing_fence() {
    assert_eq!(split_front_matter("---\na: 1\n---\nbody"), Some(("a: 1\n", "body")));
    assert_eq!(split_front_matter("---\na: 1\nbody"), None);
    assert_eq!(split_front_matter("# Title\n---\n"), None);
}

// ============================================================================
// SECTION: Structured Formats
// ============================================================================

#[test]
fn json_seeds_variables_sections_and_references() {
    let text = r#"{
        "inherit": "full",
        "variables": { "x": 1 },
        "sections": { "Rules": "R1" },
        "links": ["mdc:core/a.mdc", "https://example.com", "plain"]
    }"#;
    let doc = parse("team/config.json", text);
    assert_eq!(doc.format(), RuleFormat::Json);
    assert_eq!(doc.variables["x"], json!(1));
    assert_eq!(doc.inherit_directive(), Some(InheritanceKind::Full));
    assert_eq!(doc.sections["Rules"], "R1");
    assert!(doc.references.contains("core/a.mdc"));
    assert!(doc.references.contains("https://example.com"));
    assert_eq!(doc.references.len(), 2);
}

#[test]
fn yaml_seeds_variables_and_sections() {
    let text = "variables:\n  mode: strict\nsections:\n  Rules: R1\nsee: mdc:shared/b.mdc\n";
    let doc = parse("team/config.yaml", text);
    assert_eq!(doc.variables["mode"], json!("strict"));
    assert_eq!(doc.sections["Rules"], "R1");
    assert!(doc.references.contains("shared/b.mdc"));
}

#[test]
fn malformed_json_yields_empty_structure_and_issue() {
    let doc = parse("broken.json", "{ not json");
    assert!(doc.sections.is_empty());
    assert!(doc.variables.is_empty());
    assert_eq!(doc.parse_issues.len(), 1);
    assert!(doc.parse_issues[0].starts_with("invalid json"));
}

#[test]
fn text_is_one_section_with_url_references() {
    let text = "Read https://example.com/a and [x](b.md) @someone";
    let doc = parse("notes.txt", text);
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections["content"], text);
    assert_eq!(doc.references.len(), 1);
    assert!(doc.references.contains("https://example.com/a"));
}

// ============================================================================
// SECTION: Dependencies and Classification
// ============================================================================

#[test]
fn dependency_directives_are_collected_sorted() {
    let text = "@import \"shared/style.md\"\ninclude: team/base.md\ndepends_on: [a.md, \"b.md\"]\n";
    let doc = parse("notes.txt", text);
    assert_eq!(
        doc.metadata.dependencies,
        vec![
            "a.md".to_string(),
            "b.md".to_string(),
            "shared/style.md".to_string(),
            "team/base.md".to_string(),
        ]
    );
}

#[test]
fn classification_prefers_path_keywords() {
    assert_eq!(parse("core/x.md", "workflow").category(), RuleCategory::Core);
    assert_eq!(parse("agents/x.md", "").category(), RuleCategory::Agent);
    assert_eq!(parse("my_project/x.md", "").category(), RuleCategory::Project);
    assert_eq!(parse("context/x.md", "").category(), RuleCategory::Context);
    assert_eq!(parse("misc/x.md", "A critical rule").category(), RuleCategory::Core);
    assert_eq!(parse("misc/x.md", "Our review process").category(), RuleCategory::Workflow);
    assert_eq!(parse("misc/x.md", "Plain words.").category(), RuleCategory::Custom);
}

// ============================================================================
// SECTION: File Parsing
// ============================================================================

#[test]
fn parse_reads_file_relative_to_root() {
    let dir = TempDir::new().unwrap();
    common::write_rules(dir.path(), &[("team/feature.md", "# Rules\nR2")]);
    let doc = RuleParser::default().parse(dir.path(), Path::new("team/feature.md")).unwrap();
    assert_eq!(doc.path().as_str(), "team/feature.md");
    assert_eq!(doc.metadata.size, 10);
    assert_eq!(doc.metadata.checksum, content_checksum("# Rules\nR2"));
    assert_eq!(doc.raw, "# Rules\nR2");
}

#[test]
fn parse_rejects_oversized_files() {
    let dir = TempDir::new().unwrap();
    common::write_rules(dir.path(), &[("big.md", "0123456789")]);
    let err = RuleParser::new(4).parse(dir.path(), Path::new("big.md")).unwrap_err();
    assert!(matches!(err, ParseError::TooLarge { actual: 10, limit: 4, .. }));
    assert_eq!(err.code(), "too_large");
}

#[test]
fn parse_rejects_invalid_utf8() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();
    let err = RuleParser::default().parse(dir.path(), Path::new("bad.md")).unwrap_err();
    assert_eq!(err.code(), "invalid_utf8");
}

#[test]
fn parse_reports_missing_files_and_foreign_paths() {
    let dir = TempDir::new().unwrap();
    let err = RuleParser::default().parse(dir.path(), Path::new("missing.md")).unwrap_err();
    assert_eq!(err.code(), "io");

    let other = TempDir::new().unwrap();
    common::write_rules(other.path(), &[("x.md", "x")]);
    let err = RuleParser::default().parse(dir.path(), &other.path().join("x.md")).unwrap_err();
    assert_eq!(err.code(), "outside_root");
}
