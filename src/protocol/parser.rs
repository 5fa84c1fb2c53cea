//! Block extraction and field decoding.

use super::types::{DecodedArtifact, DecodedIssue, DecodedOutput};
use super::{ARTIFACT_END, ARTIFACT_START, ISSUE_END, ISSUE_START, unescape_markers};
use crate::model::{ArtifactType, IssueType, Severity};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

// Single-line labeled fields. The value is trimmed by the caller.
static TYPE_FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*Type:(.*)$").unwrap());

static NAME_FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*Name:(.*)$").unwrap());

static DESCRIPTION_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*Description:(.*)$").unwrap());

static SEVERITY_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*Severity:(.*)$").unwrap());

static TITLE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*Title:(.*)$").unwrap());

static CONTENT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*Content:").unwrap());

/// Labels that terminate a multi-line issue description.
const ISSUE_LABELS: [&str; 3] = ["Type:", "Severity:", "Title:"];

/// Decode every artifact and issue block in `text`.
pub fn decode(text: &str) -> DecodedOutput {
    DecodedOutput {
        artifacts: decode_artifacts(text),
        issues: decode_issues(text),
    }
}

/// Decode artifact blocks, dropping any without a known type or a content section.
pub fn decode_artifacts(text: &str) -> Vec<DecodedArtifact> {
    extract_blocks(text, ARTIFACT_START, ARTIFACT_END)
        .into_iter()
        .filter_map(parse_artifact_block)
        .collect()
}

/// Decode issue blocks, dropping any without a type or title.
pub fn decode_issues(text: &str) -> Vec<DecodedIssue> {
    extract_blocks(text, ISSUE_START, ISSUE_END)
        .into_iter()
        .filter_map(parse_issue_block)
        .collect()
}

/// Slice out the bodies between start and end markers.
///
/// When a start marker is followed by another start marker before any end
/// marker, the earlier one is unterminated and the later one wins. A start
/// marker with no end marker after it is ignored.
fn extract_blocks<'a>(text: &'a str, start: &str, end: &str) -> Vec<&'a str> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(start) {
        let mut body_start = cursor + rel + start.len();
        let Some(end_rel) = text[body_start..].find(end) else {
            debug!(marker = start, "Unterminated block at end of output");
            break;
        };
        let body_end = body_start + end_rel;

        if let Some(inner) = text[body_start..body_end].rfind(start) {
            debug!(marker = start, "Start marker superseded by a later one");
            body_start += inner + start.len();
        }

        blocks.push(&text[body_start..body_end]);
        cursor = body_end + end.len();
    }

    blocks
}

fn field<'a>(re: &Regex, haystack: &'a str) -> Option<&'a str> {
    re.captures(haystack)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|v| !v.is_empty())
}

fn parse_artifact_block(block: &str) -> Option<DecodedArtifact> {
    let Some(content_label) = CONTENT_LABEL.find(block) else {
        debug!("Dropping artifact block without a Content: section");
        return None;
    };
    let header = &block[..content_label.start()];
    let content = block[content_label.end()..].trim();

    let Some(raw_type) = field(&TYPE_FIELD, header) else {
        debug!("Dropping artifact block without a Type: field");
        return None;
    };
    let Some(artifact_type) = ArtifactType::from_label(raw_type) else {
        debug!(artifact_type = raw_type, "Dropping artifact block with unknown type");
        return None;
    };

    let mut artifact = DecodedArtifact::new(artifact_type, unescape_markers(content));
    if let Some(name) = field(&NAME_FIELD, header) {
        artifact.name = unescape_markers(name);
    }
    if let Some(description) = field(&DESCRIPTION_FIELD, header) {
        artifact.description = unescape_markers(description);
    }
    Some(artifact)
}

fn parse_issue_block(block: &str) -> Option<DecodedIssue> {
    let Some(raw_type) = field(&TYPE_FIELD, block) else {
        debug!("Dropping issue block without a Type: field");
        return None;
    };
    let Some(title) = field(&TITLE_FIELD, block) else {
        debug!("Dropping issue block without a Title: field");
        return None;
    };

    let severity = field(&SEVERITY_FIELD, block)
        .map(Severity::from_label)
        .unwrap_or_default();

    Some(
        DecodedIssue::new(IssueType::from_label(raw_type), severity, unescape_markers(title))
            .with_description(unescape_markers(&issue_description(block))),
    )
}

/// The issue description may span lines; it runs until the next label or the
/// end of the block.
fn issue_description(block: &str) -> String {
    let mut lines = block.lines();
    let mut collected = Vec::new();

    for line in lines.by_ref() {
        if let Some(rest) = line.trim_start().strip_prefix("Description:") {
            collected.push(rest);
            break;
        }
    }
    if collected.is_empty() {
        return String::new();
    }

    for line in lines {
        let trimmed = line.trim_start();
        if ISSUE_LABELS.iter().any(|label| trimmed.starts_with(label)) {
            break;
        }
        collected.push(line);
    }

    collected.join("\n").trim().to_string()
}
