//! Failure classification and retry backoff.
//!
//! Provider errors are classified by substring heuristics into temporary
//! (retry with backoff) vs permanent (terminal for that row/agent) vs
//! unknown (retry conservatively up to `max_retries`). Gate refusals never
//! reach this module — they are capacity decisions, not failures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agents::AgentKind;
use crate::model::SlotRowId;

/// How an error was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Capacity or transport trouble; retry with backoff
    Temporary,
    /// The data problem will not go away; terminal
    Permanent,
    /// Unrecognized; retried conservatively up to max_retries
    Unknown,
}

const TEMPORARY_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "rate limit",
    "too many requests",
    "429",
    "connection",
    "network",
    "try again",
    "temporarily",
    "502",
    "503",
    "504",
    "server error",
    "overloaded",
];

const PERMANENT_MARKERS: &[&str] = &[
    "not found",
    "invalid",
    "deleted",
    "blocked",
    "does not exist",
    "unauthorized",
    "forbidden",
    "no longer available",
];

/// Classify an error message by substring heuristics.
///
/// Temporary markers win over permanent ones: "invalid response, try again"
/// should be retried, not buried.
pub fn classify(error: &str) -> FailureClass {
    let lower = error.to_lowercase();
    if TEMPORARY_MARKERS.iter().any(|m| lower.contains(m)) {
        return FailureClass::Temporary;
    }
    if PERMANENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return FailureClass::Permanent;
    }
    FailureClass::Unknown
}

/// Backoff and retry-cap configuration.
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Attempts after which a row/agent pair is permanently blocked
    pub max_retries: u32,
    /// Base delay for the first retry
    pub base_delay: Duration,
    /// Multiplier per additional attempt (typically 2.0)
    pub multiplier: f64,
    /// Backoff cap
    pub max_delay: Duration,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl FailureConfig {
    /// Backoff before the next retry: `min(base * multiplier^(attempts-1), max)`.
    pub fn backoff_for(&self, attempt_count: u32) -> Duration {
        let exponent = attempt_count.saturating_sub(1);
        let delay = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Accumulated failure state for one (row, agent) pair.
#[derive(Debug, Clone, Serialize)]
pub struct FailureSnapshot {
    pub attempt_count: u32,
    pub classification: FailureClass,
    pub last_error: String,
    pub next_retry_at: DateTime<Utc>,
    pub blocked: bool,
}

/// Verdict returned to the dispatcher after recording a failure.
#[derive(Debug, Clone, Serialize)]
pub struct FailureDecision {
    pub classification: FailureClass,
    pub attempt_count: u32,
    pub next_retry_at: DateTime<Utc>,
    /// The row/agent pair is now terminal
    pub permanent: bool,
}

type FailKey = (SlotRowId, AgentKind);

/// Tracks failures per (row, agent) pair and computes retry eligibility.
#[derive(Debug)]
pub struct FailManager {
    config: FailureConfig,
    records: Mutex<HashMap<FailKey, FailureSnapshot>>,
}

impl FailManager {
    pub fn new(config: FailureConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FailureConfig {
        &self.config
    }

    /// Record a failure and compute the retry verdict.
    ///
    /// A pair becomes permanently blocked immediately on a `Permanent`
    /// classification, or once `attempt_count >= max_retries` regardless of
    /// classification.
    pub fn record_failure(
        &self,
        row_id: SlotRowId,
        agent: AgentKind,
        error: &str,
    ) -> FailureDecision {
        let classification = classify(error);
        let mut records = self.records.lock().expect("fail manager lock poisoned");
        let entry = records.entry((row_id, agent)).or_insert(FailureSnapshot {
            attempt_count: 0,
            classification,
            last_error: String::new(),
            next_retry_at: Utc::now(),
            blocked: false,
        });

        entry.attempt_count = entry.attempt_count.saturating_add(1);
        entry.classification = classification;
        entry.last_error = error.to_string();

        let backoff = self.config.backoff_for(entry.attempt_count);
        entry.next_retry_at = Utc::now()
            + chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::hours(1));

        entry.blocked = classification == FailureClass::Permanent
            || entry.attempt_count >= self.config.max_retries;

        if entry.blocked {
            tracing::warn!(
                row_id = %row_id,
                agent = %agent,
                attempts = entry.attempt_count,
                class = ?classification,
                error,
                "row/agent pair permanently blocked"
            );
        } else {
            tracing::info!(
                row_id = %row_id,
                agent = %agent,
                attempts = entry.attempt_count,
                class = ?classification,
                retry_at = %entry.next_retry_at,
                "failure recorded, retry scheduled"
            );
        }

        FailureDecision {
            classification,
            attempt_count: entry.attempt_count,
            next_retry_at: entry.next_retry_at,
            permanent: entry.blocked,
        }
    }

    /// Whether the pair is permanently blocked.
    pub fn is_blocked(&self, row_id: SlotRowId, agent: AgentKind) -> bool {
        let records = self.records.lock().expect("fail manager lock poisoned");
        records
            .get(&(row_id, agent))
            .map(|r| r.blocked)
            .unwrap_or(false)
    }

    /// Whether the pair may be retried right now (not blocked, backoff
    /// elapsed). Pairs with no failure history are always eligible.
    pub fn can_retry(&self, row_id: SlotRowId, agent: AgentKind, now: DateTime<Utc>) -> bool {
        let records = self.records.lock().expect("fail manager lock poisoned");
        match records.get(&(row_id, agent)) {
            None => true,
            Some(record) => !record.blocked && now >= record.next_retry_at,
        }
    }

    /// Forget a pair's failure history (manual operator recovery).
    pub fn clear(&self, row_id: SlotRowId, agent: AgentKind) {
        let mut records = self.records.lock().expect("fail manager lock poisoned");
        records.remove(&(row_id, agent));
    }

    pub fn snapshot(&self, row_id: SlotRowId, agent: AgentKind) -> Option<FailureSnapshot> {
        let records = self.records.lock().expect("fail manager lock poisoned");
        records.get(&(row_id, agent)).cloned()
    }
}

impl Default for FailManager {
    fn default() -> Self {
        Self::new(FailureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_heuristics() {
        assert_eq!(classify("rate limit exceeded"), FailureClass::Temporary);
        assert_eq!(classify("Connection reset by peer"), FailureClass::Temporary);
        assert_eq!(classify("HTTP 503 service unavailable"), FailureClass::Temporary);
        assert_eq!(classify("profile not found"), FailureClass::Permanent);
        assert_eq!(classify("invalid domain"), FailureClass::Permanent);
        assert_eq!(classify("account deleted"), FailureClass::Permanent);
        assert_eq!(classify("something odd happened"), FailureClass::Unknown);
        // Temporary markers win over permanent ones
        assert_eq!(classify("invalid response, try again"), FailureClass::Temporary);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let config = FailureConfig {
            max_retries: 10,
            base_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_delay: Duration::from_secs(120),
        };
        assert_eq!(config.backoff_for(1), Duration::from_secs(30));
        assert_eq!(config.backoff_for(2), Duration::from_secs(60));
        assert_eq!(config.backoff_for(3), Duration::from_secs(120));
        // Capped
        assert_eq!(config.backoff_for(6), Duration::from_secs(120));
    }

    #[test]
    fn temporary_failures_block_only_after_max_retries() {
        let manager = FailManager::new(FailureConfig {
            max_retries: 3,
            ..FailureConfig::default()
        });
        let row_id = SlotRowId::new();

        let first = manager.record_failure(row_id, AgentKind::LinkedinFinder, "rate limit exceeded");
        assert_eq!(first.classification, FailureClass::Temporary);
        assert!(!first.permanent);
        assert!(first.next_retry_at > Utc::now());

        manager.record_failure(row_id, AgentKind::LinkedinFinder, "rate limit exceeded");
        let third = manager.record_failure(row_id, AgentKind::LinkedinFinder, "rate limit exceeded");
        assert!(third.permanent);
        assert!(manager.is_blocked(row_id, AgentKind::LinkedinFinder));
    }

    #[test]
    fn permanent_failure_blocks_on_first_occurrence() {
        let manager = FailManager::default();
        let row_id = SlotRowId::new();

        let decision = manager.record_failure(row_id, AgentKind::LinkedinFinder, "profile not found");
        assert_eq!(decision.classification, FailureClass::Permanent);
        assert!(decision.permanent);
        assert!(manager.is_blocked(row_id, AgentKind::LinkedinFinder));
    }

    #[test]
    fn backoff_gates_retry_eligibility() {
        let manager = FailManager::default();
        let row_id = SlotRowId::new();
        assert!(manager.can_retry(row_id, AgentKind::Pattern, Utc::now()));

        manager.record_failure(row_id, AgentKind::Pattern, "timeout");
        assert!(!manager.can_retry(row_id, AgentKind::Pattern, Utc::now()));
        // Eligible again once the backoff has elapsed
        let later = Utc::now() + chrono::Duration::hours(2);
        assert!(manager.can_retry(row_id, AgentKind::Pattern, later));
    }

    #[test]
    fn clear_forgets_history() {
        let manager = FailManager::default();
        let row_id = SlotRowId::new();
        manager.record_failure(row_id, AgentKind::Pattern, "profile not found");
        assert!(manager.is_blocked(row_id, AgentKind::Pattern));

        manager.clear(row_id, AgentKind::Pattern);
        assert!(!manager.is_blocked(row_id, AgentKind::Pattern));
        assert!(manager.snapshot(row_id, AgentKind::Pattern).is_none());
    }
}
