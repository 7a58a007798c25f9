//! Fuzzy matching of raw company names to canonical identities.
//!
//! Scoring is deterministic and monotone: an exact (normalized) match is
//! always 100; when one name contains the other the score never drops below
//! the shorter/longer length ratio; everything else falls back to
//! Jaro-Winkler similarity. Candidates are ranked descending with a stable
//! sort, so master-list order breaks ties.

use serde::{Deserialize, Serialize};

use crate::model::{FuzzyCandidate, FuzzyMatchStatus, SlotRow};

/// Thresholds for the three-tier match decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// Score at or above which a match is auto-accepted
    pub auto_accept_threshold: f64,
    /// Score at or above which a match is surfaced for manual review
    pub min_match_score: f64,
    /// Maximum candidates returned per run
    pub max_candidates: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            auto_accept_threshold: 90.0,
            min_match_score: 60.0,
            max_candidates: 5,
        }
    }
}

/// Outcome of matching one raw name against the master list.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub status: FuzzyMatchStatus,
    /// Best-scoring candidate, if any cleared the minimum
    pub best: Option<FuzzyCandidate>,
    /// Up to `max_candidates` candidates, ranked descending by score
    pub candidates: Vec<FuzzyCandidate>,
}

/// Matcher over a fixed threshold configuration.
#[derive(Debug, Clone, Default)]
pub struct FuzzyMatcher {
    config: FuzzyConfig,
}

impl FuzzyMatcher {
    pub fn new(config: FuzzyConfig) -> Self {
        Self { config }
    }

    /// Score one raw string against one canonical name, in 0.0..=100.0.
    ///
    /// # Properties
    /// - identical normalized strings score exactly 100
    /// - containment scores at least `100 * shorter_len / longer_len`
    /// - deterministic: same inputs always produce the same score
    pub fn score(&self, raw: &str, canonical: &str) -> f64 {
        let a = normalize(raw);
        let b = normalize(canonical);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a == b {
            return 100.0;
        }

        let similarity = strsim::jaro_winkler(&a, &b) * 100.0;

        // Containment guarantees a proportional floor: "acme corp" inside
        // "acme corporation" can never score below the length ratio.
        let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
        if longer.contains(shorter.as_str()) {
            let ratio = shorter.len() as f64 / longer.len() as f64 * 100.0;
            return similarity.max(ratio).min(99.9);
        }

        similarity.min(99.9)
    }

    /// Match a raw name against the company master list.
    pub fn match_name(&self, raw: &str, master: &[String]) -> MatchResult {
        let mut candidates: Vec<FuzzyCandidate> = master
            .iter()
            .map(|name| FuzzyCandidate {
                name: name.clone(),
                score: self.score(raw, name),
            })
            .collect();

        // Stable sort: ties keep master-list order
        candidates.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(self.config.max_candidates);
        candidates.retain(|c| c.score > 0.0);

        let best = candidates.first().cloned();
        let status = match &best {
            Some(c) if c.score >= self.config.auto_accept_threshold => FuzzyMatchStatus::Matched,
            Some(c) if c.score >= self.config.min_match_score => FuzzyMatchStatus::ManualReview,
            _ => FuzzyMatchStatus::Unmatched,
        };

        MatchResult {
            status,
            best,
            candidates,
        }
    }

    /// Run the matcher for a row and record the outcome on it.
    ///
    /// `company_name` is written only on an auto-accepted match; review and
    /// unmatched outcomes leave the row's identity untouched.
    pub fn apply_to_row(&self, row: &mut SlotRow, master: &[String]) -> FuzzyMatchStatus {
        let result = self.match_name(row.raw_company_input(), master);
        let matched_name = result.best.as_ref().map(|c| c.name.clone());
        let score = result.best.as_ref().map(|c| c.score);

        match result.status {
            FuzzyMatchStatus::Matched => {
                tracing::info!(
                    row_id = %row.id(),
                    company = matched_name.as_deref().unwrap_or(""),
                    score = score.unwrap_or(0.0),
                    "fuzzy match auto-accepted"
                );
            }
            other => {
                tracing::warn!(
                    row_id = %row.id(),
                    raw = row.raw_company_input(),
                    status = ?other,
                    score = score.unwrap_or(0.0),
                    "fuzzy match needs upstream resolution"
                );
            }
        }

        row.apply_match(result.status, score, result.candidates, matched_name);
        result.status
    }
}

/// Normalize a company name for comparison: lowercase, strip punctuation,
/// collapse runs of whitespace.
fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_space = true;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}
