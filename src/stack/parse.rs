//! `git log` output parsing

use super::{Commit, Trailers};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static COMMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^commit ([0-9a-f]{40})$").expect("valid regex"));
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Author: (.*) <(.*)>$").expect("valid regex"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Date:\s+(.*)$").expect("valid regex"));
static TRAILER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z0-9-]+): (.*)$").expect("valid regex"));

/// Parse `git log` output into commits, in the order git printed them
/// (newest first)
pub fn parse_log(output: &str) -> Result<Vec<Commit>> {
    let mut commits = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();

    for line in output.lines() {
        if COMMIT_RE.is_match(line) && !chunk.is_empty() {
            commits.push(parse_commit(&chunk)?);
            chunk.clear();
        }
        if chunk.is_empty() && line.trim().is_empty() {
            continue;
        }
        chunk.push(line);
    }
    if !chunk.is_empty() {
        commits.push(parse_commit(&chunk)?);
    }
    Ok(commits)
}

fn parse_commit(lines: &[&str]) -> Result<Commit> {
    let mut hash = None;
    let mut author = None;
    let mut date = None;

    let header_end = lines
        .iter()
        .position(|l| l.trim().is_empty())
        .unwrap_or(lines.len());

    for line in &lines[..header_end] {
        if let Some(caps) = COMMIT_RE.captures(line) {
            hash = Some(caps[1].to_string());
        } else if let Some(caps) = AUTHOR_RE.captures(line) {
            author = Some((caps[1].to_string(), caps[2].to_string()));
        } else if let Some(caps) = DATE_RE.captures(line) {
            date = parse_date(caps[1].trim());
        }
    }

    // Message lines are indented by four spaces
    let mut message: Vec<&str> = lines[header_end.min(lines.len())..]
        .iter()
        .map(|l| l.strip_prefix("    ").unwrap_or(l).trim_end())
        .skip_while(|l| l.is_empty())
        .collect();
    while message.last().is_some_and(|l| l.is_empty()) {
        message.pop();
    }

    let (Some(hash), Some((author_name, author_email))) = (hash, author) else {
        return Err(Error::Validation(format!(
            "failed to parse commit from log:\n{}",
            lines.join("\n")
        )));
    };
    let Some((title, rest)) = message.split_first() else {
        return Err(Error::Validation(format!("commit {hash} has no title")));
    };

    // Trailers: trailing run of `Key: value` lines, never the title itself
    let trailer_start = rest
        .iter()
        .rposition(|l| !TRAILER_RE.is_match(l))
        .map_or(0, |i| i + 1);
    let mut trailers = Trailers::default();
    for line in rest[trailer_start..].iter().rev() {
        if let Some(caps) = TRAILER_RE.captures(line) {
            trailers.insert_if_absent(&caps[1], caps[2].trim());
        }
    }

    let body = rest[..trailer_start]
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    Ok(Commit {
        hash,
        author_name,
        author_email,
        date,
        title: title.trim().to_string(),
        body,
        trailers,
        pr_number: 0,
        skip: false,
    })
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%a %b %e %H:%M:%S %Y %z", "%Y-%m-%d %H:%M:%S %z"] {
        if let Ok(date) = DateTime::parse_from_str(raw, format) {
            return Some(date.with_timezone(&Utc));
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    debug!(raw, "unrecognized commit date");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "
commit 2e4d93e3728b7d3baa6ed3d8d56d9e4fbd73422d
Author: Alice M <alice@example.com>
Date:   2025-11-30T18:30:16-03:00

    fix: correct typo in documentation

commit 1a3f1e297fec2af1cae6fa5f8d0955e2dfa4b0dc
Author: Oliver N <oliver@example.com>
Date:   2025-12-31T09:19:11+07:00

    [draft] this is an example commit message

    Summary
    ---

    this is an example commit message

    Remote-Ref: oliver/13453619
    Tags: example, testing
";

    #[test]
    fn test_parse_log_splits_commits() {
        let commits = parse_log(LOG).unwrap();
        assert_eq!(commits.len(), 2);

        let first = &commits[0];
        assert_eq!(first.hash, "2e4d93e3728b7d3baa6ed3d8d56d9e4fbd73422d");
        assert_eq!(first.author_email, "alice@example.com");
        assert_eq!(first.title, "fix: correct typo in documentation");
        assert!(first.body.is_empty());
        assert!(first.trailers.is_empty());
        assert!(first.date.is_some());
    }

    #[test]
    fn test_parse_log_reads_body_and_trailers() {
        let commits = parse_log(LOG).unwrap();
        let second = &commits[1];
        assert_eq!(second.title, "[draft] this is an example commit message");
        assert_eq!(second.body, "Summary\n---\n\nthis is an example commit message");
        assert_eq!(second.remote_ref(), Some("oliver/13453619"));
        assert_eq!(second.trailers.get("TAGS"), Some("example, testing"));
        assert_eq!(second.trailers.len(), 2);
    }

    #[test]
    fn test_parse_empty_log() {
        assert!(parse_log("").unwrap().is_empty());
        assert!(parse_log("  \n \n").unwrap().is_empty());
    }

    #[test]
    fn test_missing_author_is_validation_error() {
        let log = "commit 2e4d93e3728b7d3baa6ed3d8d56d9e4fbd73422d\n\n    title\n";
        assert!(matches!(parse_log(log), Err(Error::Validation(_))));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-01-01T12:34:56+00:00").is_some());
        assert!(parse_date("2024-01-01 12:34:56 +0000").is_some());
        assert!(parse_date("yesterday").is_none());
    }
}
