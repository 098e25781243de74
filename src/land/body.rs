//! Squash-commit body cleanup
//!
//! PR descriptions carry review-only noise: template comments, an empty
//! `# Summary` skeleton and the stack footer listing sibling PRs. None of it
//! belongs in trunk history.

use regex::Regex;
use std::sync::LazyLock;

static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// `[//]: # (comment)`, `[]: # "comment"` and friends
static MARKDOWN_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\[[\w/]*\]:\s*#\s*[("'].*[)"']?\s*$"#).expect("valid regex")
});

/// Stack footer entry: `* ... #123`
static PR_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*.*#\d+").expect("valid regex"));

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

static TRAILING_BR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\s*<br\s*/?>)+\s*$").expect("valid regex"));

static EMPTY_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^#\s*Summary\s*(\n|\s|<br\s*/?>)*$").expect("valid regex")
});

static ONLY_HEADERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^((#+\s*\w+\s*)|(\w+\s*\n\s*[-=]+\s*)|\s)*$").expect("valid regex")
});

/// Clean a PR description for use as the squash-commit body
///
/// Returns an empty string when nothing but template remains. Passes repeat
/// until the body stops changing: removing a comment can splice a new one.
pub fn cleanup_body(body: &str) -> String {
    let mut current = clean_once(body);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Every step only removes text, so repeated passes reach a fixed point
fn clean_once(body: &str) -> String {
    if body.is_empty() {
        return String::new();
    }

    let body = body.replace("\r\n", "\n");
    let body = HTML_COMMENT.replace_all(&body, "");
    let body = MARKDOWN_COMMENT.replace_all(&body, "");
    let body = strip_stack_footer(&body);
    let body = BLANK_RUN.replace_all(&body, "\n\n");
    let body = TRAILING_BR.replace_all(&body, "");

    let trimmed = body.trim();
    if EMPTY_TEMPLATE.is_match(trimmed) || ONLY_HEADERS.is_match(trimmed) {
        return String::new();
    }
    trimmed.to_string()
}

fn strip_stack_footer(body: &str) -> String {
    let lines: Vec<&str> = body.split('\n').collect();
    match footer_start(&lines) {
        Some(start) => lines[..start].join("\n"),
        None => body.to_string(),
    }
}

/// First line of the footer: the blank run before a `---` that is directly
/// preceded by a blank line and followed somewhere by a PR reference
fn footer_start(lines: &[&str]) -> Option<usize> {
    (0..lines.len()).find_map(|i| {
        let separator = lines[i].trim() == "---"
            && i > 0
            && lines[i - 1].trim().is_empty()
            && lines[i + 1..]
                .iter()
                .any(|l| PR_REFERENCE.is_match(l.trim()));
        separator.then(|| {
            lines[..i]
                .iter()
                .rposition(|l| !l.trim().is_empty())
                .map_or(0, |j| j + 1)
        })
    })
}
