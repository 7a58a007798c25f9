//! Movement hash: a deterministic fingerprint of who holds which role.
//!
//! SHA-256 over normalized, key-sorted `key:value` pairs of
//! identity+title+company (plus an optional as-of date). Comparing the
//! fingerprint across enrichment runs detects executive movement without
//! storing the underlying fields. Pure local computation, no provider.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::guards::CostGuard;

use super::{AgentKind, AgentMeta, AgentOutcome, AgentPayload, AgentTask, EnrichmentAgent};

/// Compute the fingerprint over key/value pairs.
///
/// # Properties
/// - key order of the input does not matter (pairs are sorted by key)
/// - values are trimmed and lowercased before hashing
/// - any changed value changes the output
pub fn compute_movement_hash(pairs: &[(&str, &str)]) -> String {
    let mut normalized: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
        .collect();
    normalized.sort();

    let joined = normalized
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("|");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether the fingerprint changed since the previous run.
pub fn detect_movement(previous_hash: &str, current_hash: &str) -> bool {
    !previous_hash.eq_ignore_ascii_case(current_hash)
}

#[derive(Debug, Default)]
pub struct MovementHashAgent {
    /// Optional as-of date stamped into the fingerprint, `YYYY-MM-DD`
    as_of: Option<String>,
}

impl MovementHashAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_as_of(mut self, date: impl Into<String>) -> Self {
        self.as_of = Some(date.into());
        self
    }
}

#[async_trait]
impl EnrichmentAgent for MovementHashAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::MovementHash
    }

    fn meta(&self) -> AgentMeta {
        AgentMeta {
            kind: AgentKind::MovementHash,
            cost_cents: 0,
            layer: 6,
            depends_on: Some(AgentKind::TitleCompany),
        }
    }

    async fn run(&self, task: &AgentTask, _guard: Option<&CostGuard>) -> AgentOutcome {
        let (Some(title), Some(person)) = (task.current_title.as_deref(), task.person_name.as_deref())
        else {
            return AgentOutcome::failure("title or person missing, cannot fingerprint yet");
        };
        let company = task
            .current_company
            .as_deref()
            .unwrap_or(task.company_name.as_str());

        let mut pairs = vec![
            ("person", person),
            ("company", company),
            ("title", title),
        ];
        if let Some(date) = self.as_of.as_deref() {
            pairs.push(("as_of", date));
        }

        let hash = compute_movement_hash(&pairs);
        let moved = task
            .previous_hash
            .as_deref()
            .map(|prev| detect_movement(prev, &hash));

        if moved == Some(true) {
            tracing::info!(row_id = %task.row_id, "movement detected: fingerprint changed since last run");
        }

        AgentOutcome::success(AgentPayload::Hash { hash, moved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_does_not_matter() {
        let a = compute_movement_hash(&[
            ("person", "Jane Smith"),
            ("company", "Acme Corporation"),
            ("title", "CEO"),
        ]);
        let b = compute_movement_hash(&[
            ("title", "CEO"),
            ("person", "Jane Smith"),
            ("company", "Acme Corporation"),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn value_changes_change_the_hash() {
        let before = compute_movement_hash(&[
            ("person", "Jane Smith"),
            ("company", "Acme Corporation"),
            ("title", "CEO"),
        ]);
        let after = compute_movement_hash(&[
            ("person", "Jane Smith"),
            ("company", "Acme Corporation"),
            ("title", "Chairman"),
        ]);
        assert_ne!(before, after);
        assert!(detect_movement(&before, &after));
        assert!(!detect_movement(&before, &before));
    }

    #[test]
    fn whitespace_and_case_are_normalized() {
        let a = compute_movement_hash(&[("person", "  Jane Smith "), ("title", "CEO")]);
        let b = compute_movement_hash(&[("person", "jane smith"), ("title", "ceo")]);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn agent_flags_movement_against_previous_hash() {
        let agent = MovementHashAgent::new();
        let mut task = AgentTask {
            company_name: "Acme Corporation".to_string(),
            person_name: Some("Jane Smith".to_string()),
            current_title: Some("CEO".to_string()),
            current_company: Some("Acme Corporation".to_string()),
            ..AgentTask::default()
        };

        let first = agent.run(&task, None).await;
        let hash = match first.payload {
            Some(AgentPayload::Hash { hash, moved }) => {
                assert_eq!(moved, None);
                hash
            }
            other => panic!("unexpected payload: {other:?}"),
        };

        // Same inputs, previous hash present: no movement
        task.previous_hash = Some(hash.clone());
        let second = agent.run(&task, None).await;
        match second.payload {
            Some(AgentPayload::Hash { moved, .. }) => assert_eq!(moved, Some(false)),
            other => panic!("unexpected payload: {other:?}"),
        }

        // Title change: movement
        task.current_title = Some("Chairman".to_string());
        let third = agent.run(&task, None).await;
        match third.payload {
            Some(AgentPayload::Hash { moved, .. }) => assert_eq!(moved, Some(true)),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn agent_fails_before_title_is_known() {
        let agent = MovementHashAgent::new();
        let task = AgentTask {
            company_name: "Acme Corporation".to_string(),
            person_name: Some("Jane Smith".to_string()),
            ..AgentTask::default()
        };
        let outcome = agent.run(&task, None).await;
        assert!(!outcome.success);
    }
}
