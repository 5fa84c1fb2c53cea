//! Artifact body summarization.
//!
//! Long artifact bodies are replaced by a compact digest: the document name
//! and version, the headings it contains, a bounded list of key lines, any
//! lines carrying measurable figures, and the original line count.

use crate::model::Artifact;
use crate::util::truncate_chars;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum characters kept per key point or metric line.
pub const KEY_POINT_MAX_CHARS: usize = 120;

// List items: "- x", "* x", "+ x", "1. x"
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+\S").unwrap());

// Requirement-style identifiers: FR-1, US-12, NFR-3, AC-2
static DOMAIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]\s*)?(?:\*\*)?[A-Z]{1,4}-\d+\b").unwrap());

// Markdown ATX headings: one to six '#' then whitespace.
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,6}\s+(\S.*)$").unwrap());

static BOLD_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\*\*[^*]+\*\*").unwrap());

// Numbers with duration, percentage, throughput or size units.
static METRIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:\.\d+)?\s*(?:%|(?:ms|s|sec|min|h|rps|qps|req/s|tps|KB|MB|GB)\b)").unwrap()
});

/// Limits applied when building a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    pub max_key_points: usize,
    pub max_metrics: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            max_key_points: 15,
            max_metrics: 10,
        }
    }
}

/// Structured digest of a long artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub name: String,
    pub version: u32,
    pub headings: Vec<String>,
    pub key_points: Vec<String>,
    pub metrics: Vec<String>,
    pub total_lines: usize,
}

impl ArtifactSummary {
    pub fn from_artifact(artifact: &Artifact, limits: SummaryLimits) -> Self {
        let mut summary = Self {
            name: artifact.name.clone(),
            version: artifact.version,
            headings: Vec::new(),
            key_points: Vec::new(),
            metrics: Vec::new(),
            total_lines: 0,
        };

        for line in artifact.content.lines() {
            summary.total_lines += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(caps) = HEADING.captures(trimmed) {
                summary.headings.push(caps[1].trim_end().to_string());
                continue;
            }

            if METRIC.is_match(trimmed) {
                if summary.metrics.len() < limits.max_metrics {
                    summary
                        .metrics
                        .push(truncate_chars(trimmed, KEY_POINT_MAX_CHARS));
                }
                continue;
            }

            if is_key_line(line) && summary.key_points.len() < limits.max_key_points {
                summary
                    .key_points
                    .push(truncate_chars(trimmed, KEY_POINT_MAX_CHARS));
            }
        }

        summary
    }

    /// Render the digest as the text placed in a payload.
    pub fn render(&self) -> String {
        let mut text = format!("[Summary] {} (v{})\n", self.name, self.version);

        if !self.headings.is_empty() {
            text.push_str(&format!("Sections: {}\n", self.headings.join(", ")));
        }

        if !self.key_points.is_empty() {
            text.push_str("Key points:\n");
            for point in &self.key_points {
                text.push_str(&format!("  {}\n", point));
            }
        }

        if !self.metrics.is_empty() {
            text.push_str("Metrics:\n");
            for metric in &self.metrics {
                text.push_str(&format!("  {}\n", metric));
            }
        }

        text.push_str(&format!("({} lines total)", self.total_lines));
        text
    }
}

fn is_key_line(line: &str) -> bool {
    LIST_ITEM.is_match(line) || DOMAIN_ID.is_match(line) || BOLD_LINE.is_match(line)
}

/// Return the body verbatim when it is within `threshold` lines, otherwise
/// its rendered summary.
pub fn condense(artifact: &Artifact, threshold: usize, limits: SummaryLimits) -> String {
    if artifact.line_count() <= threshold {
        artifact.content.clone()
    } else {
        ArtifactSummary::from_artifact(artifact, limits).render()
    }
}
