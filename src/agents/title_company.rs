//! Current title/company lookup.
//!
//! Primary: profile provider, which wants a resolved LinkedIn URL. The
//! person-search fallback covers two cases: no URL on the row yet, or a
//! primary response with no title/company in it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::guards::CostGuard;
use crate::providers::{PersonQuery, PersonSearchProvider, ProfileProvider};

use super::{AgentKind, AgentMeta, AgentOutcome, AgentPayload, AgentTask, EnrichmentAgent};

#[derive(Debug, Clone, Copy)]
pub struct TitleCompanyConfig {
    pub primary_cost_cents: u64,
    pub fallback_cost_cents: u64,
}

impl Default for TitleCompanyConfig {
    fn default() -> Self {
        Self {
            primary_cost_cents: 3,
            fallback_cost_cents: 8,
        }
    }
}

pub struct TitleCompanyAgent {
    profile: Arc<dyn ProfileProvider>,
    search: Option<Arc<dyn PersonSearchProvider>>,
    config: TitleCompanyConfig,
}

impl TitleCompanyAgent {
    pub fn new(
        profile: Arc<dyn ProfileProvider>,
        search: Option<Arc<dyn PersonSearchProvider>>,
        config: TitleCompanyConfig,
    ) -> Self {
        Self {
            profile,
            search,
            config,
        }
    }

    fn payload_from(
        title: Option<String>,
        company: Option<String>,
        task: &AgentTask,
    ) -> Option<AgentPayload> {
        let title = title.filter(|t| !t.is_empty())?;
        // Providers sometimes omit the employer; the matched company
        // identity is the best available stand-in.
        let company = company
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| task.company_name.clone());
        Some(AgentPayload::TitleCompany { title, company })
    }

    fn fallback_allowed(&self, task: &AgentTask, guard: Option<&CostGuard>) -> bool {
        if self.search.is_none() || !task.cost_policy.fallback_enabled {
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

    async fn run_fallback(&self, task: &AgentTask, guard: Option<&CostGuard>) -> AgentOutcome {
        let search = self.search.as_ref().expect("gated on fallback presence");
        if let Some(g) = guard {
            if g.try_charge(self.config.fallback_cost_cents).is_err() {
                return AgentOutcome::failure("title/company lookup skipped: budget exhausted");
            }
        }
        let slot_cost = if task.cost_policy.fallback_slot_budget_cents.is_some() {
            self.config.fallback_cost_cents
        } else {
            0
        };
        let query = PersonQuery {
            person_name: task.person_name.clone(),
            company_name: Some(task.company_name.clone()),
            domain: task.domain.clone(),
            linkedin_url: task.linkedin_url.clone(),
        };
        match search.search_person(&query).await {
            Ok(resp) => match Self::payload_from(resp.title, resp.company, task) {
                Some(payload) => AgentOutcome::success(payload)
                    .with_extra_cost(self.config.fallback_cost_cents, slot_cost),
                None => AgentOutcome::failure("no current title found for person")
                    .with_extra_cost(self.config.fallback_cost_cents, slot_cost),
            },
            Err(err) => AgentOutcome::failure(err.to_string())
                .with_extra_cost(self.config.fallback_cost_cents, slot_cost),
        }
    }
}

#[async_trait]
impl EnrichmentAgent for TitleCompanyAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::TitleCompany
    }

    fn meta(&self) -> AgentMeta {
        AgentMeta {
            kind: AgentKind::TitleCompany,
            cost_cents: self.config.primary_cost_cents,
            layer: 5,
            depends_on: Some(AgentKind::LinkedinFinder),
        }
    }

    async fn run(&self, task: &AgentTask, guard: Option<&CostGuard>) -> AgentOutcome {
        // Without a URL the profile provider has nothing to resolve from;
        // go straight to the fallback if it is allowed.
        let Some(url) = task.linkedin_url.clone() else {
            if self.fallback_allowed(task, guard) {
                return self.run_fallback(task, guard).await;
            }
            return AgentOutcome::failure("no linkedin url on row for profile lookup");
        };

        let query = PersonQuery {
            person_name: task.person_name.clone(),
            company_name: Some(task.company_name.clone()),
            domain: task.domain.clone(),
            linkedin_url: Some(url),
        };

        match self.profile.resolve_profile(&query).await {
            Ok(resp) => {
                if let Some(payload) = Self::payload_from(resp.title, resp.company, task) {
                    return AgentOutcome::success(payload);
                }
                if self.fallback_allowed(task, guard) {
                    tracing::info!(row_id = %task.row_id, "profile had no title/company, trying person search");
                    return self.run_fallback(task, guard).await;
                }
                AgentOutcome::failure("profile returned no title/company")
            }
            Err(err) => AgentOutcome::failure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::CostPolicy;
    use crate::providers::{
        AccessibilityResponse, PersonSearchResponse, ProfileResponse, ProviderError,
    };

    struct FixedProfile {
        title: Option<&'static str>,
        company: Option<&'static str>,
    }

    #[async_trait]
    impl ProfileProvider for FixedProfile {
        async fn resolve_profile(
            &self,
            _query: &PersonQuery,
        ) -> Result<ProfileResponse, ProviderError> {
            Ok(ProfileResponse {
                linkedin_url: None,
                title: self.title.map(str::to_string),
                company: self.company.map(str::to_string),
            })
        }

        async fn check_accessibility(
            &self,
            _url: &str,
        ) -> Result<AccessibilityResponse, ProviderError> {
            Ok(AccessibilityResponse { public: true })
        }
    }

    struct FixedSearch;

    #[async_trait]
    impl PersonSearchProvider for FixedSearch {
        async fn search_person(
            &self,
            _query: &PersonQuery,
        ) -> Result<PersonSearchResponse, ProviderError> {
            Ok(PersonSearchResponse {
                linkedin_url: None,
                title: Some("Chief Executive Officer".to_string()),
                company: Some("Acme Corporation".to_string()),
            })
        }
    }

    fn task(url: Option<&str>) -> AgentTask {
        AgentTask {
            company_name: "Acme Corporation".to_string(),
            person_name: Some("Jane Smith".to_string()),
            linkedin_url: url.map(str::to_string),
            cost_policy: CostPolicy {
                fallback_enabled: true,
                fallback_slot_budget_cents: Some(100),
            },
            ..AgentTask::default()
        }
    }

    #[tokio::test]
    async fn primary_resolves_title_and_company() {
        let agent = TitleCompanyAgent::new(
            Arc::new(FixedProfile {
                title: Some("CEO"),
                company: Some("Acme Corporation"),
            }),
            None,
            TitleCompanyConfig::default(),
        );
        let outcome = agent
            .run(&task(Some("https://linkedin.com/in/jane-smith")), None)
            .await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn company_falls_back_to_matched_identity() {
        let agent = TitleCompanyAgent::new(
            Arc::new(FixedProfile {
                title: Some("CEO"),
                company: None,
            }),
            None,
            TitleCompanyConfig::default(),
        );
        let outcome = agent
            .run(&task(Some("https://linkedin.com/in/jane-smith")), None)
            .await;
        match outcome.payload {
            Some(AgentPayload::TitleCompany { company, .. }) => {
                assert_eq!(company, "Acme Corporation")
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_used_when_no_url() {
        let agent = TitleCompanyAgent::new(
            Arc::new(FixedProfile {
                title: None,
                company: None,
            }),
            Some(Arc::new(FixedSearch)),
            TitleCompanyConfig::default(),
        );
        let guard = CostGuard::new(1000);
        let outcome = agent.run(&task(None), Some(&guard)).await;
        assert!(outcome.success);
        assert_eq!(outcome.cost_cents, 8);
        assert_eq!(guard.spent_cents(), 8);
    }

    #[tokio::test]
    async fn fallback_used_when_primary_is_empty() {
        let agent = TitleCompanyAgent::new(
            Arc::new(FixedProfile {
                title: None,
                company: None,
            }),
            Some(Arc::new(FixedSearch)),
            TitleCompanyConfig::default(),
        );
        let outcome = agent
            .run(&task(Some("https://linkedin.com/in/jane-smith")), None)
            .await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn no_url_and_no_fallback_fails() {
        let agent = TitleCompanyAgent::new(
            Arc::new(FixedProfile {
                title: Some("CEO"),
                company: None,
            }),
            None,
            TitleCompanyConfig::default(),
        );
        let outcome = agent.run(&task(None), None).await;
        assert!(!outcome.success);
    }
}
