//! Role-scoped filtering of markdown reference documents.
//!
//! Documents are split on level-two (`## `) headings. A role with an
//! allowlist sees only the sections whose heading mentions one of its
//! entries; a role without one sees the whole document.

use crate::role::AgentRole;

/// A `##` section: its heading text and everything under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub heading: &'a str,
    pub text: &'a str,
}

/// Split a markdown document into `##` sections, dropping any preamble.
pub fn split_sections(doc: &str) -> Vec<Section<'_>> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in doc.split_inclusive('\n') {
        if line.starts_with("## ") {
            starts.push(offset);
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(doc.len());
            let text = &doc[start..end];
            let heading = text
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches('#')
                .trim();
            Section { heading, text }
        })
        .collect()
}

/// Overview sections each role needs. `None` means the full document.
pub fn overview_allowlist(role: AgentRole) -> Option<&'static [&'static str]> {
    use AgentRole::*;
    let list: &'static [&'static str] = match role {
        ProductManager | BusinessAnalyst => &["overview"],
        EngineeringManager => &["overview", "tech stack", "directory structure"],
        SystemArchitect => return None,
        ApiDesigner => &["entry points", "dependencies"],
        DatabaseEngineer | PerformanceEngineer => &["tech stack", "dependencies"],
        UiDesigner => &["overview", "tech stack"],
        SeniorDeveloper | JuniorDeveloper => {
            &["tech stack", "entry points", "directory structure", "build"]
        }
        CodeReviewer => &["tech stack", "directory structure"],
        QaEngineer => &["testing", "build"],
        TestAutomationEngineer => &["testing", "build", "directory structure"],
        SecurityEngineer => &["dependencies", "security"],
        ComplianceOfficer => &["security"],
        DocumentationWriter => &["overview", "entry points"],
        DevopsEngineer => &["build", "deployment", "dependencies"],
        SreEngineer => &["deployment"],
    };
    Some(list)
}

/// Style-profile sections each role needs. `None` means the full document.
pub fn profile_allowlist(role: AgentRole) -> Option<&'static [&'static str]> {
    use AgentRole::*;
    let list: &'static [&'static str] = match role {
        SystemArchitect | EngineeringManager | PerformanceEngineer => return None,
        ProductManager | BusinessAnalyst | UiDesigner => &[],
        SeniorDeveloper | JuniorDeveloper => &["naming", "formatting", "error handling", "samples"],
        CodeReviewer => &["naming", "formatting", "error handling", "logging"],
        QaEngineer | TestAutomationEngineer => &["testing", "samples"],
        SecurityEngineer | ComplianceOfficer => &["security", "logging"],
        DocumentationWriter => &["documentation"],
        DevopsEngineer | SreEngineer => &["logging"],
        ApiDesigner => &["naming", "error handling", "documentation"],
        DatabaseEngineer => &["naming"],
    };
    Some(list)
}

/// Apply an allowlist to a document.
///
/// Returns `None` when the document is blank or nothing matched, so the
/// caller can omit the section entirely.
pub fn filter_document(doc: &str, allowlist: Option<&[&str]>) -> Option<String> {
    if doc.trim().is_empty() {
        return None;
    }
    let Some(allowlist) = allowlist else {
        return Some(doc.trim().to_string());
    };

    let kept: Vec<&str> = split_sections(doc)
        .into_iter()
        .filter(|s| {
            let heading = s.heading.to_lowercase();
            allowlist.iter().any(|wanted| heading.contains(wanted))
        })
        .map(|s| s.text.trim_end())
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("\n\n"))
    }
}
