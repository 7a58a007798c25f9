//! LinkedIn discovery: resolve a person's profile URL.
//!
//! Primary: profile-resolve provider. Fallback: person search, allowed only
//! when enabled, the cost guard has headroom for it, and the primary came
//! back without a URL.

use std::sync::Arc;

use async_trait::async_trait;

use crate::guards::CostGuard;
use crate::providers::{PersonQuery, PersonSearchProvider, ProfileProvider};

use super::{AgentKind, AgentMeta, AgentOutcome, AgentPayload, AgentTask, EnrichmentAgent};

/// Cost knobs for the finder's two paths.
#[derive(Debug, Clone, Copy)]
pub struct LinkedinFinderConfig {
    /// Nominal cost of one primary resolve, in cents
    pub primary_cost_cents: u64,
    /// Cost of one fallback person search, in cents
    pub fallback_cost_cents: u64,
}

impl Default for LinkedinFinderConfig {
    fn default() -> Self {
        Self {
            primary_cost_cents: 3,
            fallback_cost_cents: 8,
        }
    }
}

pub struct LinkedinFinderAgent {
    primary: Arc<dyn ProfileProvider>,
    fallback: Option<Arc<dyn PersonSearchProvider>>,
    config: LinkedinFinderConfig,
}

impl LinkedinFinderAgent {
    pub fn new(
        primary: Arc<dyn ProfileProvider>,
        fallback: Option<Arc<dyn PersonSearchProvider>>,
        config: LinkedinFinderConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            config,
        }
    }

    fn query(task: &AgentTask) -> PersonQuery {
        PersonQuery {
            person_name: task.person_name.clone(),
            company_name: Some(task.company_name.clone()),
            domain: task.domain.clone(),
            linkedin_url: None,
        }
    }

    /// Whether the fallback may run for this task right now.
    ///
    /// Gate order: feature switch, slot headroom, then an atomic charge
    /// against the global guard at the call site.
    fn fallback_allowed(&self, task: &AgentTask, guard: Option<&CostGuard>) -> bool {
        if !task.cost_policy.fallback_enabled || self.fallback.is_none() {
            return false;
        }
        if let Some(budget) = task.cost_policy.fallback_slot_budget_cents {
            if self.config.fallback_cost_cents > budget {
                return false;
            }
        }
        guard
            .map(|g| g.can_spend(self.config.fallback_cost_cents))
            .unwrap_or(true)
    }
}

#[async_trait]
impl EnrichmentAgent for LinkedinFinderAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::LinkedinFinder
    }

    fn meta(&self) -> AgentMeta {
        AgentMeta {
            kind: AgentKind::LinkedinFinder,
            cost_cents: self.config.primary_cost_cents,
            layer: 1,
            depends_on: None,
        }
    }

    async fn run(&self, task: &AgentTask, guard: Option<&CostGuard>) -> AgentOutcome {
        let query = Self::query(task);

        match self.primary.resolve_profile(&query).await {
            Ok(resp) => {
                if let Some(url) = resp.linkedin_url.filter(|u| !u.is_empty()) {
                    return AgentOutcome::success(AgentPayload::Linkedin {
                        url,
                        via_fallback: false,
                    });
                }
            }
            Err(err) => {
                // A hard primary error is not the "primary returned no URL"
                // condition; it goes to the fail manager as-is.
                return AgentOutcome::failure(err.to_string());
            }
        }

        // Primary answered but had no URL
        if self.fallback_allowed(task, guard) {
            let fallback = self.fallback.as_ref().expect("gated on fallback presence");
            // Charge atomically right before the suspending call
            if let Some(g) = guard {
                if g.try_charge(self.config.fallback_cost_cents).is_err() {
                    return AgentOutcome::failure(
                        "no linkedin profile found; fallback skipped, global budget exhausted",
                    );
                }
            }
            let slot_cost = if task.cost_policy.fallback_slot_budget_cents.is_some() {
                self.config.fallback_cost_cents
            } else {
                0
            };
            tracing::info!(row_id = %task.row_id, "primary returned no url, trying person search");
            match fallback.search_person(&query).await {
                Ok(resp) => match resp.linkedin_url {
                    Some(url) if !url.is_empty() => {
                        return AgentOutcome::success(AgentPayload::Linkedin {
                            url,
                            via_fallback: true,
                        })
                        .with_extra_cost(self.config.fallback_cost_cents, slot_cost);
                    }
                    _ => {
                        return AgentOutcome::failure("no linkedin profile found")
                            .with_extra_cost(self.config.fallback_cost_cents, slot_cost);
                    }
                },
                Err(err) => {
                    return AgentOutcome::failure(err.to_string())
                        .with_extra_cost(self.config.fallback_cost_cents, slot_cost);
                }
            }
        }

        AgentOutcome::failure("no linkedin profile found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        AccessibilityResponse, PersonSearchResponse, ProfileResponse, ProviderError,
    };
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EmptyProfile;

    #[async_trait]
    impl ProfileProvider for EmptyProfile {
        async fn resolve_profile(
            &self,
            _query: &PersonQuery,
        ) -> Result<ProfileResponse, ProviderError> {
            Ok(ProfileResponse::default())
        }

        async fn check_accessibility(
            &self,
            _url: &str,
        ) -> Result<AccessibilityResponse, ProviderError> {
            Ok(AccessibilityResponse { public: true })
        }
    }

    struct CountingSearch {
        calls: AtomicU32,
    }

    #[async_trait]
    impl PersonSearchProvider for CountingSearch {
        async fn search_person(
            &self,
            _query: &PersonQuery,
        ) -> Result<PersonSearchResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PersonSearchResponse {
                linkedin_url: Some("https://linkedin.com/in/jane-smith".to_string()),
                title: None,
                company: None,
            })
        }
    }

    fn task(fallback_enabled: bool) -> AgentTask {
        AgentTask {
            company_name: "Acme Corporation".to_string(),
            person_name: Some("Jane Smith".to_string()),
            cost_policy: super::super::CostPolicy {
                fallback_enabled,
                fallback_slot_budget_cents: Some(100),
            },
            ..AgentTask::default()
        }
    }

    #[tokio::test]
    async fn fallback_runs_when_primary_is_empty() {
        let search = Arc::new(CountingSearch {
            calls: AtomicU32::new(0),
        });
        let agent = LinkedinFinderAgent::new(
            Arc::new(EmptyProfile),
            Some(search.clone()),
            LinkedinFinderConfig::default(),
        );
        let guard = CostGuard::new(1000);

        let outcome = agent.run(&task(true), Some(&guard)).await;
        assert!(outcome.success);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.cost_cents, 8);
        assert_eq!(outcome.slot_cost_cents, 8);
        // The agent charged the guard itself
        assert_eq!(guard.spent_cents(), 8);
        match outcome.payload {
            Some(AgentPayload::Linkedin { via_fallback, .. }) => assert!(via_fallback),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_skipped_when_disabled() {
        let search = Arc::new(CountingSearch {
            calls: AtomicU32::new(0),
        });
        let agent = LinkedinFinderAgent::new(
            Arc::new(EmptyProfile),
            Some(search.clone()),
            LinkedinFinderConfig::default(),
        );
        let guard = CostGuard::new(1000);

        let outcome = agent.run(&task(false), Some(&guard)).await;
        assert!(!outcome.success);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
        assert_eq!(guard.spent_cents(), 0);
    }

    #[tokio::test]
    async fn fallback_skipped_without_guard_headroom() {
        let search = Arc::new(CountingSearch {
            calls: AtomicU32::new(0),
        });
        let agent = LinkedinFinderAgent::new(
            Arc::new(EmptyProfile),
            Some(search.clone()),
            LinkedinFinderConfig::default(),
        );
        // Guard too small for the 8-cent fallback
        let guard = CostGuard::new(5);

        let outcome = agent.run(&task(true), Some(&guard)).await;
        assert!(!outcome.success);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_skipped_without_slot_budget() {
        let search = Arc::new(CountingSearch {
            calls: AtomicU32::new(0),
        });
        let agent = LinkedinFinderAgent::new(
            Arc::new(EmptyProfile),
            Some(search.clone()),
            LinkedinFinderConfig::default(),
        );
        let guard = CostGuard::new(1000);

        let mut t = task(true);
        t.cost_policy.fallback_slot_budget_cents = Some(2);
        let outcome = agent.run(&t, Some(&guard)).await;
        assert!(!outcome.success);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }
}
