//! Email generation and verification.
//!
//! Generation prefers a known domain pattern; with no pattern it falls back
//! to a name+domain finder provider. Verification is always attempted when
//! a verifier is configured, but never fails the slot: a failed or
//! unavailable verification keeps the email with `verified=false` plus a
//! warning. With no verifier at all, the verdict is `Unknown`.

use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::guards::CostGuard;
use crate::providers::{EmailFinderProvider, VerificationProvider, VerificationStatus};

use super::pattern::normalize_domain;
use super::{AgentKind, AgentMeta, AgentOutcome, AgentPayload, AgentTask, EnrichmentAgent};

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9._%+-]*@[a-z0-9.-]+\.[a-z]{2,}$").unwrap())
}

pub struct EmailGeneratorAgent {
    finder: Option<Arc<dyn EmailFinderProvider>>,
    verifier: Option<Arc<dyn VerificationProvider>>,
    cost_cents: u64,
}

impl EmailGeneratorAgent {
    pub fn new(
        finder: Option<Arc<dyn EmailFinderProvider>>,
        verifier: Option<Arc<dyn VerificationProvider>>,
    ) -> Self {
        Self {
            finder,
            verifier,
            cost_cents: 5,
        }
    }

    pub fn with_cost(mut self, cost_cents: u64) -> Self {
        self.cost_cents = cost_cents;
        self
    }

    /// Render a pattern template like `{first}.{last}` for a person.
    ///
    /// Supported tokens: `{first}`, `{last}`, `{f}`, `{l}`. Returns `None`
    /// if the name cannot be split or the result is not a valid address.
    pub(crate) fn apply_pattern(pattern: &str, person_name: &str, domain: &str) -> Option<String> {
        let (first, last) = split_name(person_name)?;
        let local = pattern
            .replace("{first}", &first)
            .replace("{last}", &last)
            .replace("{f}", &first.chars().next()?.to_string())
            .replace("{l}", &last.chars().next()?.to_string());
        let email = format!("{local}@{domain}");
        if email_regex().is_match(&email) {
            Some(email)
        } else {
            None
        }
    }
}

/// Split a full name into lowercased (first, last) tokens.
fn split_name(full_name: &str) -> Option<(String, String)> {
    let tokens: Vec<String> = full_name
        .split_whitespace()
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() < 2 {
        return None;
    }
    Some((tokens[0].clone(), tokens[tokens.len() - 1].clone()))
}

#[async_trait]
impl EnrichmentAgent for EmailGeneratorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::EmailGenerator
    }

    fn meta(&self) -> AgentMeta {
        AgentMeta {
            kind: AgentKind::EmailGenerator,
            cost_cents: self.cost_cents,
            layer: 4,
            depends_on: Some(AgentKind::Pattern),
        }
    }

    async fn run(&self, task: &AgentTask, _guard: Option<&CostGuard>) -> AgentOutcome {
        let domain = task.domain.as_deref().and_then(normalize_domain);

        // Candidate address: already on the row (re-verification pass),
        // else rendered from the pattern, else the finder provider.
        let candidate = if let Some(existing) = task.email.clone() {
            Some(existing)
        } else if let (Some(pattern), Some(person), Some(domain)) = (
            task.email_pattern.as_deref(),
            task.person_name.as_deref(),
            domain.as_deref(),
        ) {
            Self::apply_pattern(pattern, person, domain)
        } else {
            None
        };

        let candidate = match candidate {
            Some(email) => email,
            None => {
                let (Some(finder), Some(person), Some(domain)) =
                    (self.finder.as_ref(), task.person_name.as_deref(), domain.as_deref())
                else {
                    return AgentOutcome::failure(
                        "no pattern, finder provider or domain available to generate email",
                    );
                };
                match finder.find_email(person, domain).await {
                    Ok(resp) => match resp.email {
                        Some(email) if !email.is_empty() => email,
                        _ => {
                            return AgentOutcome::failure(format!(
                                "email not found for {person} at {domain}"
                            ));
                        }
                    },
                    Err(err) => return AgentOutcome::failure(err.to_string()),
                }
            }
        };

        // Verification degrades gracefully: the candidate is kept whatever
        // the verdict.
        match self.verifier.as_ref() {
            Some(verifier) => match verifier.verify(&candidate).await {
                Ok(resp) => {
                    let verified = resp.status == VerificationStatus::Verified;
                    let outcome = AgentOutcome::success(AgentPayload::Email {
                        email: candidate,
                        verified,
                        status: resp.status,
                    });
                    if verified {
                        outcome
                    } else {
                        outcome.with_warning("email kept but did not verify")
                    }
                }
                Err(err) => {
                    tracing::warn!(row_id = %task.row_id, error = %err, "verification call failed, keeping email unverified");
                    AgentOutcome::success(AgentPayload::Email {
                        email: candidate,
                        verified: false,
                        status: VerificationStatus::Unknown,
                    })
                    .with_warning(format!("verification unavailable: {err}"))
                }
            },
            None => AgentOutcome::success(AgentPayload::Email {
                email: candidate,
                verified: false,
                status: VerificationStatus::Unknown,
            })
            .with_warning("no verification provider configured"),
        }
    }
}
