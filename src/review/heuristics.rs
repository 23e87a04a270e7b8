//! Deterministic fallback review rules.
//!
//! When the remote reviewer is unreachable the service still answers with
//! something useful: a fixed set of line-oriented checks that never fail and
//! never call out of process. The rules are deliberately simple string scans,
//! tuned for the JavaScript/TypeScript snippets this service mostly sees.
//!
//! Each rule runs only for the review styles it serves, and each active rule
//! scans the whole snippet before the next one starts, so results arrive
//! grouped by rule. Every produced [`Suggestion`] carries a range, a unified
//! diff and a confidence below the remote reviewer's typical output, so
//! callers can tell heuristic results apart by `metrics.model`.

use crate::review::model::{ReviewStyle, Severity, Suggestion, SuggestionFix, SuggestionRange};

/// Engine identifier reported in `metrics.model` for heuristic results.
pub const HEURISTIC_MODEL: &str = "reviewd-heuristic-v1";

/// Markers whose presence (case-insensitive) means the snippet already has
/// some form of test.
const TEST_MARKERS: [&str; 5] = ["test(", "it(", "describe(", "expect(", "assert("];

/// Scaffold proposed when no test marker is found.
const SCAFFOLD_LINES: [&str; 5] = [
    "describe('module', () => {",
    "  it('should do something meaningful', () => {",
    "    // TODO: add assertions matching the new behaviour",
    "  });",
    "});",
];

/// The deterministic rule engine.
///
/// Total over its input: any string, including the empty one, yields a
/// suggestion list without error.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Run the rules that apply to `style` over the snippet.
    ///
    /// - loose equality: `bug` and `detail`
    /// - debug logging: `bug`, `refactor` and `detail`
    /// - bare TODOs: `detail` and `refactor`
    /// - test scaffold: `test` only
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewd::review::heuristics::HeuristicAnalyzer;
    /// use reviewd::review::model::ReviewStyle;
    ///
    /// let found = HeuristicAnalyzer::new().analyze("if (a == b) {}", ReviewStyle::Bug);
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(found[0].title, "Strengthen equality operator");
    /// ```
    pub fn analyze(&self, code: &str, style: ReviewStyle) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        if matches!(style, ReviewStyle::Bug | ReviewStyle::Detail) {
            suggestions.extend(find_loose_equality(code));
        }
        if matches!(
            style,
            ReviewStyle::Bug | ReviewStyle::Refactor | ReviewStyle::Detail
        ) {
            suggestions.extend(find_debug_prints(code));
        }
        if matches!(style, ReviewStyle::Detail | ReviewStyle::Refactor) {
            suggestions.extend(find_bare_todos(code));
        }
        if matches!(style, ReviewStyle::Test) {
            suggestions.extend(propose_test_scaffold(code));
        }

        suggestions
    }
}

/// Flag `==` on lines that use no strict operator at all.
///
/// A line containing `===` or `!==` anywhere is left alone, so already
/// strict comparisons never produce noise.
fn find_loose_equality(code: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    for (idx, line) in code.lines().enumerate() {
        if line.contains("===") || line.contains("!==") {
            continue;
        }
        let Some(pos) = line.find("==") else {
            continue;
        };
        let line_no = idx + 1;
        let col = col_at(line, pos);
        let updated = line.replacen("==", "===", 1);

        suggestions.push(
            Suggestion::new(
                "Strengthen equality operator",
                "`==` coerces operand types and can equate values of different types. \
                 Prefer the strict `===` comparison.",
                Severity::Major,
            )
            .with_tags(["bug", "best-practice"])
            .with_range(span(line_no as u32, col, col + 2))
            .with_fix(SuggestionFix::new(line_diff(line_no, line, &updated)))
            .with_fix_snippet(updated.trim())
            .with_confidence(0.7),
        );
    }
    suggestions
}

/// Flag `console.log` calls and propose a guarded placeholder instead.
fn find_debug_prints(code: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    for (idx, line) in code.lines().enumerate() {
        let Some(pos) = line.find("console.log") else {
            continue;
        };
        let line_no = idx + 1;
        let col = col_at(line, pos);
        let indent = line.chars().take_while(|c| *c == ' ').count();
        let updated = format!("{}// TODO: apply a logging guard if needed", " ".repeat(indent));

        suggestions.push(
            Suggestion::new(
                "Clean up debug logging",
                "console.log output tends to ship with the build. Remove it or \
                 gate it behind an environment check.",
                Severity::Minor,
            )
            .with_tags(["cleanup", "refactor"])
            .with_range(span(line_no as u32, col, col + "console.log".len() as u32))
            .with_fix(SuggestionFix::new(line_diff(line_no, line, &updated)))
            .with_fix_snippet(updated.trim())
            .with_confidence(0.6),
        );
    }
    suggestions
}

/// Flag `TODO` markers that carry no description.
///
/// The colon is the signal: a line with any `:` is treated as described.
fn find_bare_todos(code: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    for (idx, line) in code.lines().enumerate() {
        if line.contains(':') {
            continue;
        }
        let Some(pos) = line.find("TODO") else {
            continue;
        };
        let line_no = idx + 1;
        let col = col_at(line, pos);
        let updated = line.replace("TODO", "TODO: describe the follow-up work");

        suggestions.push(
            Suggestion::new(
                "Describe the TODO",
                "A bare TODO gives the next reader nothing to act on. State the \
                 concrete follow-up work.",
                Severity::Minor,
            )
            .with_tags(["documentation", "detail"])
            .with_range(span(line_no as u32, col, col + 4))
            .with_fix(SuggestionFix::new(line_diff(line_no, line, &updated)))
            .with_fix_snippet(updated.trim())
            .with_confidence(0.5),
        );
    }
    suggestions
}

/// Propose a test scaffold when the snippet shows no sign of tests.
fn propose_test_scaffold(code: &str) -> Vec<Suggestion> {
    let lowered = code.to_lowercase();
    if TEST_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Vec::new();
    }

    let total_lines = code.matches('\n').count() as u32 + 1;
    let scaffold = SCAFFOLD_LINES.join("\n");

    vec![
        Suggestion::new(
            "Add a test scaffold",
            "No test markers were found in the snippet. Start with a scaffold so \
             the main path gets covered.",
            Severity::Major,
        )
        .with_tags(["test", "quality"])
        .with_range(span(total_lines, 1, 1))
        .with_fix(SuggestionFix::new(append_diff(total_lines, &SCAFFOLD_LINES)))
        .with_fix_snippet(scaffold)
        .with_confidence(0.4),
    ]
}

/// 1-indexed character column of a byte offset within a line.
fn col_at(line: &str, byte_pos: usize) -> u32 {
    line[..byte_pos].chars().count() as u32 + 1
}

fn span(line: u32, start_col: u32, end_col: u32) -> SuggestionRange {
    SuggestionRange::new(line, start_col, line, end_col)
}

/// Single-line replacement diff.
fn line_diff(line_no: usize, original: &str, updated: &str) -> String {
    format!("--- original\n+++ updated\n@@ -{line_no} +{line_no} @@\n-{original}\n+{updated}")
}

/// Pure-addition diff appending `lines` after the last line of the snippet.
fn append_diff(after_line: u32, lines: &[&str]) -> String {
    let mut diff = format!(
        "--- original\n+++ updated\n@@ +{},{} @@",
        after_line + 1,
        lines.len()
    );
    for line in lines {
        diff.push('\n');
        diff.push('+');
        diff.push_str(line);
    }
    diff
}
