//! Email-pattern discovery for a company domain.

use std::sync::Arc;

use async_trait::async_trait;

use crate::guards::CostGuard;
use crate::providers::PatternProvider;

use super::{AgentKind, AgentMeta, AgentOutcome, AgentPayload, AgentTask, EnrichmentAgent};

pub struct PatternAgent {
    provider: Arc<dyn PatternProvider>,
    cost_cents: u64,
}

impl PatternAgent {
    pub fn new(provider: Arc<dyn PatternProvider>) -> Self {
        Self {
            provider,
            cost_cents: 2,
        }
    }

    pub fn with_cost(mut self, cost_cents: u64) -> Self {
        self.cost_cents = cost_cents;
        self
    }
}

/// Canonicalize a raw domain or URL: strip scheme and `www.`, lowercase.
pub(crate) fn normalize_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let host = if trimmed.contains("://") {
        url::Url::parse(trimmed)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))?
    } else {
        trimmed
            .split('/')
            .next()
            .unwrap_or(trimmed)
            .to_string()
    };
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.contains('.') {
        Some(host)
    } else {
        None
    }
}

#[async_trait]
impl EnrichmentAgent for PatternAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Pattern
    }

    fn meta(&self) -> AgentMeta {
        AgentMeta {
            kind: AgentKind::Pattern,
            cost_cents: self.cost_cents,
            layer: 3,
            depends_on: None,
        }
    }

    async fn run(&self, task: &AgentTask, _guard: Option<&CostGuard>) -> AgentOutcome {
        let Some(domain) = task.domain.as_deref().and_then(normalize_domain) else {
            return AgentOutcome::failure("no usable domain on row for pattern lookup");
        };

        match self.provider.domain_pattern(&domain).await {
            Ok(resp) => match resp.pattern {
                Some(pattern) if !pattern.is_empty() => {
                    AgentOutcome::success(AgentPayload::Pattern { pattern })
                }
                _ => AgentOutcome::failure(format!("email pattern not found for {domain}")),
            },
            Err(err) => AgentOutcome::failure(err.to_string()),
        }
    }
}
