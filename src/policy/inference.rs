use crate::stage::Stage;
use std::collections::HashSet;

/// Terms that mark a feature as having no user interface.
const BACKEND_ONLY_TERMS: &[&str] = &[
    "backend only",
    "backend-only",
    "api only",
    "api-only",
    "headless",
    "no ui",
    "no frontend",
    "cli tool",
    "command line",
    "batch job",
    "cron job",
    "daemon",
    "microservice",
    "data pipeline",
    "etl",
];

/// Terms for work that is never shipped to an environment.
const NOT_DEPLOYED_TERMS: &[&str] = &[
    "internal tool",
    "prototype",
    "proof of concept",
    "poc",
    "spike",
    "experiment",
    "throwaway",
    "local only",
    "mockup",
];

/// Terms for work that does not need user-facing documentation.
const UNDOCUMENTED_TERMS: &[&str] = &[
    "internal tool",
    "prototype",
    "proof of concept",
    "poc",
    "spike",
    "throwaway",
];

/// Lowercase and pad with spaces so whole-word terms match at the edges.
fn normalize(description: &str) -> String {
    let cleaned: String = description
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    format!(" {} ", words.join(" "))
}

fn mentions_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack.contains(&format!(" {} ", term)))
}

/// Stages a feature description suggests can be skipped.
///
/// Purely additive: the result is unioned with explicit skips, and mandatory
/// stages are still protected by the policy.
pub fn infer_skips(description: &str) -> HashSet<Stage> {
    let text = normalize(description);
    let mut skips = HashSet::new();

    if mentions_any(&text, BACKEND_ONLY_TERMS) {
        skips.insert(Stage::UiUxDesign);
    }
    if mentions_any(&text, NOT_DEPLOYED_TERMS) {
        skips.insert(Stage::Deployment);
    }
    if mentions_any(&text, UNDOCUMENTED_TERMS) {
        skips.insert(Stage::Documentation);
    }
    skips
}
