//! Keyword-based triage.

use aho_corasick::AhoCorasick;
use roadwatch_common::{AppError, AppResult, config::TriageConfig};
use roadwatch_db::entities::accident_report::ReportPriority;

/// Maps a description to a priority tier.
///
/// Critical keywords are checked first and win over high keywords.
/// Matching is a case-insensitive substring search.
#[derive(Debug, Clone)]
pub struct PriorityClassifier {
    critical: AhoCorasick,
    high: AhoCorasick,
}

impl PriorityClassifier {
    /// Build a classifier from two keyword tiers.
    pub fn new<S: AsRef<str>>(critical: &[S], high: &[S]) -> AppResult<Self> {
        Ok(Self {
            critical: build_matcher(critical)?,
            high: build_matcher(high)?,
        })
    }

    /// Build a classifier from the triage configuration.
    pub fn from_config(config: &TriageConfig) -> AppResult<Self> {
        Self::new(&config.critical_keywords, &config.high_keywords)
    }

    /// Classify a description.
    #[must_use]
    pub fn classify(&self, description: &str) -> ReportPriority {
        let text = description.to_lowercase();

        if self.critical.is_match(&text) {
            ReportPriority::Critical
        } else if self.high.is_match(&text) {
            ReportPriority::High
        } else {
            ReportPriority::Medium
        }
    }
}

fn build_matcher<S: AsRef<str>>(keywords: &[S]) -> AppResult<AhoCorasick> {
    // Blank keywords would match every description.
    let patterns: Vec<String> = keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    AhoCorasick::new(&patterns)
        .map_err(|e| AppError::Config(format!("Invalid triage keywords: {e}")))
}
