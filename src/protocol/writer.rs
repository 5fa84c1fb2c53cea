//! Encoding records into marker blocks.

use super::types::{DecodedArtifact, DecodedIssue};
use super::{ARTIFACT_END, ARTIFACT_START, ISSUE_END, ISSUE_START, escape_markers};

/// Labeled fields are single-line; fold any embedded line breaks.
fn single_line(value: &str) -> String {
    escape_markers(&value.lines().map(str::trim).collect::<Vec<_>>().join(" "))
}

/// A blank name is written as the type's display name, which is also what
/// decoding assigns when the name is missing.
pub fn encode_artifact(artifact: &DecodedArtifact) -> String {
    let name = if artifact.name.trim().is_empty() {
        artifact.artifact_type.display_name().to_string()
    } else {
        single_line(&artifact.name)
    };
    format!(
        "{ARTIFACT_START}\nType: {}\nName: {}\nDescription: {}\nContent:\n{}\n{ARTIFACT_END}\n",
        artifact.artifact_type,
        name,
        single_line(&artifact.description),
        escape_markers(artifact.content.trim()),
    )
}

pub fn encode_issue(issue: &DecodedIssue) -> String {
    format!(
        "{ISSUE_START}\nType: {}\nSeverity: {}\nTitle: {}\nDescription: {}\n{ISSUE_END}\n",
        issue.issue_type,
        issue.severity,
        single_line(&issue.title),
        escape_markers(issue.description.trim()),
    )
}
