//! The orchestration loop: one pass over one slot row.
//!
//! # State Machine
//! ```text
//! (1) Fuzzy Match Check
//!  -> (2) Company-Level Slot Check     (may seed sibling placeholders)
//!  -> (3) Slot Checklist Routing       (kill -> throttle -> cost gates)
//!  -> (4) Failure Handling             (classification + backoff)
//!  -> (5) Completion Check             (the only terminal success)
//! ```
//!
//! A pass is idempotent: complete or permanently-failed rows are no-ops.
//! Gate refusals abort the pass without recording failure — they are
//! capacity decisions, and the row is simply retried on a later pass.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::agents::{AgentKind, AgentOutcome, AgentRegistry, AgentTask, CostPolicy, GateRefusal};
use crate::checklist;
use crate::config::DispatcherConfig;
use crate::guards::{CostGuard, FailManager};
use crate::matching::FuzzyMatcher;
use crate::model::SlotRow;

use super::company_checker::CompanyChecker;

/// What one dispatch pass did with a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// An agent was invoked (it may still have failed — see `error`)
    Routed,
    /// A throttle window refused the agent; retry later, no fault
    Throttled,
    /// A kill switch refused the agent; retry after revival, no fault
    Killed,
    /// The row reached completion this pass
    Completed,
    /// Nothing to do: terminal row, match failure, or backoff wait
    NoAction,
    /// A cost ceiling (slot or global) refused the spend
    CostExceeded,
}

/// Structured result of one dispatch pass, enough for the caller to
/// persist state and decide whether to re-enqueue the row.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub status: DispatchStatus,
    /// Agent invoked (or refused at a gate) this pass
    pub agent: Option<AgentKind>,
    /// Total provider spend incurred this pass, in cents
    pub cost_cents: u64,
    pub error: Option<String>,
    pub warning: Option<String>,
    /// Placeholder rows seeded by the company-level slot check
    pub rows_created: Vec<SlotRow>,
}

impl DispatchResult {
    fn new(status: DispatchStatus) -> Self {
        Self {
            status,
            agent: None,
            cost_cents: 0,
            error: None,
            warning: None,
            rows_created: Vec::new(),
        }
    }

    fn with_agent(mut self, agent: AgentKind) -> Self {
        self.agent = Some(agent);
        self
    }

    fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    fn with_rows_created(mut self, rows: Vec<SlotRow>) -> Self {
        self.rows_created = rows;
        self
    }
}

/// The enrichment dispatcher. All shared gating state is injected at
/// construction and threaded through calls — nothing global.
pub struct Dispatcher {
    config: DispatcherConfig,
    matcher: FuzzyMatcher,
    master_list: Vec<String>,
    registry: AgentRegistry,
    company_checker: CompanyChecker,
    cost_guard: Arc<CostGuard>,
    fail_manager: Arc<FailManager>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        master_list: Vec<String>,
        registry: AgentRegistry,
        cost_guard: Arc<CostGuard>,
        fail_manager: Arc<FailManager>,
    ) -> Self {
        let matcher = FuzzyMatcher::new(config.fuzzy.clone());
        let company_checker = CompanyChecker::new(
            config.mandatory_slots.clone(),
            config.default_slot_limit_cents,
        );
        Self {
            config,
            matcher,
            master_list,
            registry,
            company_checker,
            cost_guard,
            fail_manager,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn cost_guard(&self) -> &Arc<CostGuard> {
        &self.cost_guard
    }

    pub fn fail_manager(&self) -> &Arc<FailManager> {
        &self.fail_manager
    }

    /// Run one pass of the five-state sequence for one row.
    ///
    /// `siblings` is the read-view of all rows known to the caller (used by
    /// the company-level check); `previous_hash` is the movement hash from
    /// the prior enrichment run, if the caller stored one.
    pub async fn dispatch_row(
        &self,
        row: &mut SlotRow,
        siblings: &[SlotRow],
        previous_hash: Option<String>,
    ) -> DispatchResult {
        // Idempotence: terminal rows are no-ops
        if row.slot_complete() || row.permanently_failed() {
            return DispatchResult::new(DispatchStatus::NoAction);
        }

        // ── State 1: fuzzy match check ──────────────────────────────────
        if !row.is_matched() {
            if row.fuzzy_match_status() == crate::model::FuzzyMatchStatus::Pending {
                self.matcher.apply_to_row(row, &self.master_list);
            }
            if !row.is_matched() {
                return DispatchResult::new(DispatchStatus::NoAction).with_error(format!(
                    "company '{}' not matched ({:?}); needs upstream resolution",
                    row.raw_company_input(),
                    row.fuzzy_match_status()
                ));
            }
        }

        // ── State 2: company-level slot check ───────────────────────────
        let rows_created = self.company_checker.check_and_seed(row, siblings).await;

        // ── State 3: checklist routing ──────────────────────────────────
        let check = checklist::evaluate(row);
        let Some(item) = check.next_missing() else {
            return self.complete(row).with_rows_created(rows_created);
        };
        let kind = AgentKind::from(item);

        let Some(agent) = self.registry.get(kind) else {
            return DispatchResult::new(DispatchStatus::NoAction)
                .with_agent(kind)
                .with_error(format!("no agent registered for {kind}"))
                .with_rows_created(rows_created);
        };

        // Backoff from earlier failures gates before any capacity check
        if !self.fail_manager.can_retry(row.id(), kind, Utc::now()) {
            return DispatchResult::new(DispatchStatus::NoAction)
                .with_agent(kind)
                .with_error("in retry backoff window")
                .with_rows_created(rows_created);
        }

        // Gate order: kill switch, then throttle, then cost
        match self.registry.check_gate(kind) {
            Err(GateRefusal::Killed(record)) => {
                return DispatchResult::new(DispatchStatus::Killed)
                    .with_agent(kind)
                    .with_error(format!("killed by {}: {}", record.operator, record.reason))
                    .with_rows_created(rows_created);
            }
            Err(GateRefusal::Throttled) => {
                return DispatchResult::new(DispatchStatus::Throttled)
                    .with_agent(kind)
                    .with_rows_created(rows_created);
            }
            Ok(()) => {}
        }

        let meta = agent.meta();
        if meta.cost_cents > 0 {
            // Per-slot ceiling first, then the global guard, committed
            // atomically with this dispatch decision
            if !row.can_afford(meta.cost_cents) {
                return DispatchResult::new(DispatchStatus::CostExceeded)
                    .with_agent(kind)
                    .with_error(format!(
                        "slot budget exhausted: {} cents left, {} needed",
                        row.cost_headroom(),
                        meta.cost_cents
                    ))
                    .with_rows_created(rows_created);
            }
            if let Err(err) = self.cost_guard.try_charge(meta.cost_cents) {
                return DispatchResult::new(DispatchStatus::CostExceeded)
                    .with_agent(kind)
                    .with_error(err.to_string())
                    .with_rows_created(rows_created);
            }
        }

        let fallback_budget = if self.config.fallback_counts_against_slot_limit {
            Some(row.cost_headroom().saturating_sub(meta.cost_cents))
        } else {
            None
        };
        let task = AgentTask::from_row(
            row,
            previous_hash,
            CostPolicy {
                fallback_enabled: self.config.fallback_enabled,
                fallback_slot_budget_cents: fallback_budget,
            },
        );

        tracing::debug!(row_id = %row.id(), agent = %kind, "routing row to agent");

        // Throttle accounting immediately before the suspending call
        self.registry.record_call(kind);

        let outcome = match tokio::time::timeout(
            self.config.provider_timeout,
            agent.run(&task, Some(&self.cost_guard)),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => AgentOutcome::failure("provider call timed out"),
        };

        let total_cost = meta.cost_cents.saturating_add(outcome.cost_cents);
        let slot_spend = meta.cost_cents.saturating_add(outcome.slot_cost_cents);
        if slot_spend > 0 {
            if let Err(err) = row.record_spend(slot_spend) {
                tracing::warn!(row_id = %row.id(), error = %err, "slot spend exceeded pre-checked headroom");
            }
        }

        // ── State 4: failure handling ───────────────────────────────────
        if !outcome.success {
            let error = outcome
                .error
                .unwrap_or_else(|| "agent failed without detail".to_string());
            row.record_failure(error.clone());
            let decision = self.fail_manager.record_failure(row.id(), kind, &error);
            if decision.permanent {
                row.mark_permanently_failed(error.clone());
            }
            return DispatchResult {
                status: DispatchStatus::Routed,
                agent: Some(kind),
                cost_cents: total_cost,
                error: Some(error),
                warning: outcome.warning,
                rows_created,
            };
        }

        if let Some(payload) = &outcome.payload {
            payload.apply(row);
        }
        // Success wipes the pair's failure history, mirroring cooldown reset
        self.fail_manager.clear(row.id(), kind);

        // ── State 5: completion check ───────────────────────────────────
        let check = checklist::evaluate(row);
        let mut result = if check.ready_for_completion {
            self.complete(row)
        } else {
            DispatchResult::new(DispatchStatus::Routed)
        };
        result.agent = Some(kind);
        result.cost_cents = total_cost;
        result.warning = outcome.warning;
        result.rows_created = rows_created;
        result
    }

    fn complete(&self, row: &mut SlotRow) -> DispatchResult {
        match row.mark_complete() {
            Ok(()) => {
                tracing::info!(row_id = %row.id(), slot = %row.slot_type(), "slot complete");
                DispatchResult::new(DispatchStatus::Completed)
            }
            Err(err) => DispatchResult::new(DispatchStatus::NoAction).with_error(err.to_string()),
        }
    }
}
