//! Token accounting for payloads.

use crate::util::estimate_tokens;
use serde::{Deserialize, Serialize};

/// Cost of one payload component, as sent versus unfiltered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCost {
    pub name: String,
    pub optimized_tokens: u64,
    pub unfiltered_tokens: u64,
}

/// Per-component token estimate for one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextReport {
    pub components: Vec<ComponentCost>,
}

impl ContextReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a component given the text actually sent and the text that
    /// would have been sent without filtering.
    pub fn record(&mut self, name: &str, optimized: &str, unfiltered: &str) {
        self.components.push(ComponentCost {
            name: name.to_string(),
            optimized_tokens: estimate_tokens(optimized),
            unfiltered_tokens: estimate_tokens(unfiltered),
        });
    }

    pub fn optimized_tokens(&self) -> u64 {
        self.components.iter().map(|c| c.optimized_tokens).sum()
    }

    pub fn unfiltered_tokens(&self) -> u64 {
        self.components.iter().map(|c| c.unfiltered_tokens).sum()
    }

    /// Tokens saved; zero if filtering somehow grew the payload.
    pub fn savings(&self) -> u64 {
        self.unfiltered_tokens().saturating_sub(self.optimized_tokens())
    }

    pub fn savings_pct(&self) -> f64 {
        let unfiltered = self.unfiltered_tokens();
        if unfiltered == 0 {
            return 0.0;
        }
        self.savings() as f64 / unfiltered as f64 * 100.0
    }

    /// One-line status for logging.
    pub fn status(&self) -> String {
        format!(
            "{} -> {} tokens ({:.1}% saved)",
            self.unfiltered_tokens(),
            self.optimized_tokens(),
            self.savings_pct()
        )
    }
}
