//! Public-accessibility scan for a known LinkedIn URL.
//!
//! No provider of its own: it delegates to the profile provider's
//! accessibility check, so it rides whatever credentials and transport the
//! LinkedIn finder already uses.

use std::sync::Arc;

use async_trait::async_trait;

use crate::guards::CostGuard;
use crate::providers::ProfileProvider;

use super::{AgentKind, AgentMeta, AgentOutcome, AgentPayload, AgentTask, EnrichmentAgent};

pub struct PublicScanAgent {
    profile: Arc<dyn ProfileProvider>,
    cost_cents: u64,
}

impl PublicScanAgent {
    pub fn new(profile: Arc<dyn ProfileProvider>) -> Self {
        Self {
            profile,
            cost_cents: 1,
        }
    }

    pub fn with_cost(mut self, cost_cents: u64) -> Self {
        self.cost_cents = cost_cents;
        self
    }
}

#[async_trait]
impl EnrichmentAgent for PublicScanAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::PublicScanner
    }

    fn meta(&self) -> AgentMeta {
        AgentMeta {
            kind: AgentKind::PublicScanner,
            cost_cents: self.cost_cents,
            layer: 2,
            depends_on: Some(AgentKind::LinkedinFinder),
        }
    }

    async fn run(&self, task: &AgentTask, _guard: Option<&CostGuard>) -> AgentOutcome {
        let Some(url) = task.linkedin_url.as_deref() else {
            return AgentOutcome::failure("no linkedin url on row to scan");
        };

        match self.profile.check_accessibility(url).await {
            Ok(resp) => AgentOutcome::success(AgentPayload::PublicFlag {
                accessible: resp.public,
            }),
            Err(err) => AgentOutcome::failure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        AccessibilityResponse, PersonQuery, ProfileResponse, ProviderError,
    };

    struct FixedAccess(bool);

    #[async_trait]
    impl ProfileProvider for FixedAccess {
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
            Ok(AccessibilityResponse { public: self.0 })
        }
    }

    #[tokio::test]
    async fn sets_flag_from_accessibility_check() {
        let agent = PublicScanAgent::new(Arc::new(FixedAccess(false)));
        let task = AgentTask {
            linkedin_url: Some("https://linkedin.com/in/jane-smith".to_string()),
            ..AgentTask::default()
        };
        let outcome = agent.run(&task, None).await;
        assert!(outcome.success);
        match outcome.payload {
            Some(AgentPayload::PublicFlag { accessible }) => assert!(!accessible),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fails_without_a_url() {
        let agent = PublicScanAgent::new(Arc::new(FixedAccess(true)));
        let outcome = agent.run(&AgentTask::default(), None).await;
        assert!(!outcome.success);
    }
}
