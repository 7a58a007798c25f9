//! Batch processing: bounded concurrency over independent rows.
//!
//! No ordering is guaranteed across rows; each row runs its own five-state
//! sequence. Rows of the same company share a read-view snapshot taken at
//! batch start, and placeholder creation is serialized per company inside
//! the checker. Each future exclusively owns its row, which satisfies the
//! one hard mutual-exclusion requirement: no two passes on the same row.

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::model::SlotRow;

use super::dispatcher::{DispatchResult, DispatchStatus, Dispatcher};

/// Inbound unit of work: a row plus the movement hash stored for it on the
/// previous enrichment run.
#[derive(Debug, Clone)]
pub struct RowTask {
    pub row: SlotRow,
    pub previous_hash: Option<String>,
}

impl RowTask {
    pub fn new(row: SlotRow) -> Self {
        Self {
            row,
            previous_hash: None,
        }
    }

    pub fn with_previous_hash(mut self, hash: impl Into<String>) -> Self {
        self.previous_hash = Some(hash.into());
        self
    }
}

/// Per-status counts and total spend for one batch pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub completed: usize,
    pub routed: usize,
    pub throttled: usize,
    pub killed: usize,
    pub cost_exceeded: usize,
    pub no_action: usize,
    pub rows_created: usize,
    pub total_cost_cents: u64,
}

impl BatchReport {
    fn record(&mut self, result: &DispatchResult) {
        self.total += 1;
        self.total_cost_cents += result.cost_cents;
        self.rows_created += result.rows_created.len();
        match result.status {
            DispatchStatus::Completed => self.completed += 1,
            DispatchStatus::Routed => self.routed += 1,
            DispatchStatus::Throttled => self.throttled += 1,
            DispatchStatus::Killed => self.killed += 1,
            DispatchStatus::CostExceeded => self.cost_exceeded += 1,
            DispatchStatus::NoAction => self.no_action += 1,
        }
    }
}

/// Everything a batch pass produced: mutated rows with their results (in
/// input order), newly seeded placeholders, and the aggregate report.
#[derive(Debug)]
pub struct BatchOutput {
    pub rows: Vec<(SlotRow, DispatchResult)>,
    pub created: Vec<SlotRow>,
    pub report: BatchReport,
}

impl Dispatcher {
    /// Run one dispatch pass over a batch of rows with bounded concurrency.
    pub async fn dispatch_batch(&self, tasks: Vec<RowTask>) -> BatchOutput {
        let concurrency = self.config().batch_concurrency.max(1);
        // Read-view shared by all rows in this batch
        let snapshot: Vec<SlotRow> = tasks.iter().map(|t| t.row.clone()).collect();

        let mut indexed: Vec<(usize, SlotRow, DispatchResult)> =
            stream::iter(tasks.into_iter().enumerate())
                .map(|(index, task)| {
                    let snapshot = &snapshot;
                    async move {
                        let mut row = task.row;
                        let result = self
                            .dispatch_row(&mut row, snapshot, task.previous_hash)
                            .await;
                        (index, row, result)
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        indexed.sort_by_key(|(index, _, _)| *index);

        let mut report = BatchReport::default();
        let mut created = Vec::new();
        let rows = indexed
            .into_iter()
            .map(|(_, row, mut result)| {
                report.record(&result);
                // Placeholders are surfaced once, on the batch output, so a
                // caller persisting per-row results cannot double-insert
                created.extend(std::mem::take(&mut result.rows_created));
                (row, result)
            })
            .collect();

        tracing::info!(
            total = report.total,
            completed = report.completed,
            routed = report.routed,
            throttled = report.throttled,
            killed = report.killed,
            cost_exceeded = report.cost_exceeded,
            no_action = report.no_action,
            created = report.rows_created,
            spend_cents = report.total_cost_cents,
            "batch pass finished"
        );

        BatchOutput {
            rows,
            created,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::agents::{
        AgentRegistry, EmailGeneratorAgent, LinkedinFinderAgent, LinkedinFinderConfig,
        MovementHashAgent, PatternAgent, PublicScanAgent, TitleCompanyAgent, TitleCompanyConfig,
    };
    use crate::config::DispatcherConfig;
    use crate::guards::{AgentThrottleRegistry, CostGuard, FailManager, KillSwitchManager};
    use crate::model::SlotType;
    use crate::providers::{
        AccessibilityResponse, EmailFinderProvider, EmailFinderResponse, PatternProvider,
        PatternResponse, PersonQuery, PersonSearchProvider, PersonSearchResponse, ProfileProvider,
        ProfileResponse, ProviderError, VerificationProvider, VerificationResponse,
        VerificationStatus,
    };

    /// One happy-path stub standing in for every provider contract.
    struct StubProviders;

    #[async_trait]
    impl ProfileProvider for StubProviders {
        async fn resolve_profile(
            &self,
            query: &PersonQuery,
        ) -> Result<ProfileResponse, ProviderError> {
            if query.linkedin_url.is_some() {
                // Title/company lookup starting from a known URL
                return Ok(ProfileResponse {
                    linkedin_url: query.linkedin_url.clone(),
                    title: Some("Chief Executive Officer".to_string()),
                    company: Some("Acme Corporation".to_string()),
                });
            }
            Ok(ProfileResponse {
                linkedin_url: Some("https://linkedin.com/in/jane-smith".to_string()),
                title: None,
                company: None,
            })
        }

        async fn check_accessibility(
            &self,
            _url: &str,
        ) -> Result<AccessibilityResponse, ProviderError> {
            Ok(AccessibilityResponse { public: true })
        }
    }

    #[async_trait]
    impl PersonSearchProvider for StubProviders {
        async fn search_person(
            &self,
            _query: &PersonQuery,
        ) -> Result<PersonSearchResponse, ProviderError> {
            Ok(PersonSearchResponse::default())
        }
    }

    #[async_trait]
    impl PatternProvider for StubProviders {
        async fn domain_pattern(&self, _domain: &str) -> Result<PatternResponse, ProviderError> {
            Ok(PatternResponse {
                pattern: Some("{first}.{last}".to_string()),
            })
        }
    }

    #[async_trait]
    impl EmailFinderProvider for StubProviders {
        async fn find_email(
            &self,
            _full_name: &str,
            _domain: &str,
        ) -> Result<EmailFinderResponse, ProviderError> {
            Ok(EmailFinderResponse {
                email: Some("jane.smith@acme.com".to_string()),
            })
        }
    }

    #[async_trait]
    impl VerificationProvider for StubProviders {
        async fn verify(&self, _email: &str) -> Result<VerificationResponse, ProviderError> {
            Ok(VerificationResponse {
                status: VerificationStatus::Verified,
            })
        }
    }

    fn full_dispatcher() -> Dispatcher {
        let providers = Arc::new(StubProviders);
        let mut registry = AgentRegistry::new(
            Arc::new(KillSwitchManager::new()),
            Arc::new(AgentThrottleRegistry::with_defaults()),
        );
        registry.register(Arc::new(LinkedinFinderAgent::new(
            providers.clone(),
            Some(providers.clone()),
            LinkedinFinderConfig::default(),
        )));
        registry.register(Arc::new(PublicScanAgent::new(providers.clone())));
        registry.register(Arc::new(PatternAgent::new(providers.clone())));
        registry.register(Arc::new(EmailGeneratorAgent::new(
            Some(providers.clone()),
            Some(providers.clone()),
        )));
        registry.register(Arc::new(TitleCompanyAgent::new(
            providers.clone(),
            Some(providers.clone()),
            TitleCompanyConfig::default(),
        )));
        registry.register(Arc::new(MovementHashAgent::new()));

        let config = DispatcherConfig::default();
        let failure = config.failure.clone();
        Dispatcher::new(
            config,
            vec!["Acme Corporation".to_string(), "Other Inc".to_string()],
            registry,
            Arc::new(CostGuard::new(10_000)),
            Arc::new(FailManager::new(failure)),
        )
    }

    #[tokio::test]
    async fn row_reaches_completion_over_successive_passes() {
        let dispatcher = full_dispatcher();
        let mut task = RowTask::new(
            SlotRow::new(Uuid::new_v4(), "Acme Corporation", SlotType::Ceo, 500)
                .with_person_name("Jane Smith")
                .with_domain("acme.com"),
        );

        // One agent per pass: linkedin, public, pattern, email,
        // title/company, hash+completion
        for pass in 0..6 {
            let output = dispatcher.dispatch_batch(vec![task.clone()]).await;
            let (row, result) = output.rows.into_iter().next().unwrap();
            assert_ne!(
                result.status,
                DispatchStatus::NoAction,
                "pass {pass} stalled: {:?}",
                result.error
            );
            task = RowTask::new(row);
        }

        let row = task.row;
        assert!(row.slot_complete());
        assert_eq!(row.linkedin_url(), Some("https://linkedin.com/in/jane-smith"));
        assert_eq!(row.public_accessible(), Some(true));
        assert_eq!(row.email_pattern(), Some("{first}.{last}"));
        assert_eq!(row.email(), Some("jane.smith@acme.com"));
        assert_eq!(row.email_verified(), Some(true));
        assert_eq!(row.current_title(), Some("Chief Executive Officer"));
        assert!(row.movement_hash().is_some());
        // Ordering property: title/company were resolved only after the URL
        assert!(row.linkedin_url().is_some());
    }

    #[tokio::test]
    async fn batch_report_aggregates_statuses() {
        let dispatcher = full_dispatcher();

        let active = RowTask::new(
            SlotRow::new(Uuid::new_v4(), "Acme Corporation", SlotType::Ceo, 500)
                .with_person_name("Jane Smith")
                .with_domain("acme.com"),
        );
        let mut done = SlotRow::placeholder(Uuid::new_v4(), "Other Inc", None, SlotType::Ceo, 500);
        done.set_linkedin_url("https://linkedin.com/in/someone");
        done.set_public_accessible(true);
        done.set_email_pattern("{f}{last}");
        done.set_email("s@other.com", true);
        done.set_title_company("CEO", "Other Inc");
        done.set_movement_hash("feedface");
        done.mark_complete().unwrap();

        let output = dispatcher
            .dispatch_batch(vec![active, RowTask::new(done)])
            .await;

        assert_eq!(output.report.total, 2);
        assert_eq!(output.report.routed, 1);
        assert_eq!(output.report.no_action, 1);
        assert!(output.report.total_cost_cents > 0);
        // Input order is preserved
        assert_eq!(output.rows[0].1.status, DispatchStatus::Routed);
        assert_eq!(output.rows[1].1.status, DispatchStatus::NoAction);
    }

    #[tokio::test]
    async fn rows_only_needing_a_hash_complete_in_one_pass() {
        let dispatcher = full_dispatcher();
        let mut rows = Vec::new();
        for i in 0..4 {
            let mut row = SlotRow::placeholder(
                Uuid::new_v4(),
                "Acme Corporation",
                Some("acme.com".to_string()),
                SlotType::Ceo,
                500,
            )
            .with_person_name(format!("Person {i}"));
            row.set_linkedin_url(format!("https://linkedin.com/in/person-{i}"));
            row.set_public_accessible(true);
            row.set_email_pattern("{first}.{last}");
            row.set_email(format!("person.{i}@acme.com"), true);
            row.set_title_company("CEO", "Acme Corporation");
            rows.push(RowTask::new(row));
        }

        let output = dispatcher.dispatch_batch(rows).await;
        assert_eq!(output.report.completed, 4);
        assert!(output.rows.iter().all(|(row, _)| row.slot_complete()));
    }
}
