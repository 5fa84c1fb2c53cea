//! Marker protocol codec.
//!
//! Workers embed structured records inside free-form text using delimiter
//! blocks:
//!
//! ```text
//! ---ARTIFACT_START---
//! Type: architecture_doc
//! Name: Service Architecture
//! Description: Component overview
//! Content:
//! ...body...
//! ---ARTIFACT_END---
//!
//! ---ISSUE_START---
//! Type: security_vulnerability
//! Severity: high
//! Title: Token logged in plaintext
//! Description: ...
//! ---ISSUE_END---
//! ```
//!
//! Text that would read as a marker inside a field or body is escaped on
//! encode (`---ARTIFACT_END---` becomes `---\ARTIFACT_END---`) and restored
//! on decode, so any content survives a round trip.
//!
//! Decoding never fails. Blocks that cannot be typed are dropped with a
//! debug event, and prose around the blocks is ignored.
//!
//! ```
//! use stagecraft::model::ArtifactType;
//! use stagecraft::protocol::{DecodedArtifact, decode, encode_artifact};
//!
//! let artifact = DecodedArtifact::new(ArtifactType::TaskList, "- [ ] wire the router");
//! let text = format!("Here you go:\n{}", encode_artifact(&artifact));
//! let decoded = decode(&text);
//! assert_eq!(decoded.artifacts, vec![artifact]);
//! assert!(decoded.issues.is_empty());
//! ```

use regex::Regex;
use std::sync::LazyLock;

mod parser;
mod types;
mod writer;

pub use parser::{decode, decode_artifacts, decode_issues};
pub use types::{DecodedArtifact, DecodedIssue, DecodedOutput};
pub use writer::{encode_artifact, encode_issue};

pub const ARTIFACT_START: &str = "---ARTIFACT_START---";
pub const ARTIFACT_END: &str = "---ARTIFACT_END---";
pub const ISSUE_START: &str = "---ISSUE_START---";
pub const ISSUE_END: &str = "---ISSUE_END---";

// A marker prefix with any number of escape backslashes after the dashes.
static MARKER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"---(\\*)(ARTIFACT_|ISSUE_)").unwrap());

static ESCAPED_MARKER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"---\\(\\*)(ARTIFACT_|ISSUE_)").unwrap());

/// Add one backslash to every marker prefix so none can close a block.
pub(crate) fn escape_markers(text: &str) -> String {
    MARKER_PREFIX.replace_all(text, r"---\${1}${2}").into_owned()
}

/// Inverse of [`escape_markers`].
pub(crate) fn unescape_markers(text: &str) -> String {
    ESCAPED_MARKER_PREFIX
        .replace_all(text, "---${1}${2}")
        .into_owned()
}
