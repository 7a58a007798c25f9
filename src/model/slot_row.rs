//! Core SlotRow type: one (company, slot) enrichment work item.
//!
//! # Invariants
//! - `slot_cost_accumulated <= slot_cost_limit` (enforced pre-spend, at all times)
//! - `company_name` is set only when the fuzzy match auto-accepted
//! - `permanently_failed == true` is terminal; no further routing occurs
//! - `slot_complete == true` requires `Matched` and not permanently failed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a slot row.
///
/// # Properties
/// - Globally unique within an execution context
/// - Immutable once created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRowId(Uuid);

impl SlotRowId {
    /// Create a new unique row ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SlotRowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SlotRowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Executive role a row enriches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Ceo,
    Cfo,
    Hr,
    Benefits,
}

impl std::fmt::Display for SlotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ceo => write!(f, "ceo"),
            Self::Cfo => write!(f, "cfo"),
            Self::Hr => write!(f, "hr"),
            Self::Benefits => write!(f, "benefits"),
        }
    }
}

/// Outcome tier of a fuzzy company-name match.
///
/// # State Machine
/// ```text
/// Pending -> Matched
///        \-> ManualReview
///        \-> Unmatched
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyMatchStatus {
    /// Not yet matched against the company master list
    Pending,
    /// Auto-accepted; canonical identity resolved
    Matched,
    /// Score in the review band; an operator must confirm
    ManualReview,
    /// No candidate cleared the minimum score
    Unmatched,
}

/// One ranked candidate from a fuzzy match run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyCandidate {
    pub name: String,
    /// Similarity score in 0.0..=100.0
    pub score: f64,
}

/// One (company, slot_type) work item moving through the pipeline.
///
/// All fields are private; mutation goes through methods that uphold the
/// invariants. External storage owns persistence — the core never deletes
/// rows, it only drives them to `slot_complete` or `permanently_failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRow {
    // Identity
    id: SlotRowId,
    company_id: Uuid,
    company_name: Option<String>,
    raw_company_input: String,
    domain: Option<String>,
    slot_type: SlotType,
    person_name: Option<String>,

    // Matching
    fuzzy_match_status: FuzzyMatchStatus,
    fuzzy_match_score: Option<f64>,
    fuzzy_match_candidates: Vec<FuzzyCandidate>,

    // Enrichment fields, each null until an agent fills it
    linkedin_url: Option<String>,
    public_accessible: Option<bool>,
    email_pattern: Option<String>,
    email: Option<String>,
    email_verified: Option<bool>,
    current_title: Option<String>,
    current_company: Option<String>,
    movement_hash: Option<String>,

    // Failure state
    failure_count: u32,
    last_failure_reason: Option<String>,
    permanently_failed: bool,

    // Cost state (cents)
    slot_cost_accumulated: u64,
    slot_cost_limit: u64,

    // Completion
    slot_complete: bool,
    last_updated: DateTime<Utc>,
}

impl SlotRow {
    /// Create a fresh row awaiting fuzzy matching.
    ///
    /// # Postconditions
    /// - `fuzzy_match_status == Pending`
    /// - every enrichment field is `None`
    pub fn new(
        company_id: Uuid,
        raw_company_input: impl Into<String>,
        slot_type: SlotType,
        slot_cost_limit: u64,
    ) -> Self {
        Self {
            id: SlotRowId::new(),
            company_id,
            company_name: None,
            raw_company_input: raw_company_input.into(),
            domain: None,
            slot_type,
            person_name: None,
            fuzzy_match_status: FuzzyMatchStatus::Pending,
            fuzzy_match_score: None,
            fuzzy_match_candidates: Vec::new(),
            linkedin_url: None,
            public_accessible: None,
            email_pattern: None,
            email: None,
            email_verified: None,
            current_title: None,
            current_company: None,
            movement_hash: None,
            failure_count: 0,
            last_failure_reason: None,
            permanently_failed: false,
            slot_cost_accumulated: 0,
            slot_cost_limit,
            slot_complete: false,
            last_updated: Utc::now(),
        }
    }

    /// Create a placeholder row for a missing sibling slot.
    ///
    /// Placeholders inherit the already-resolved company identity, so they
    /// are born `Matched` and skip straight to checklist routing.
    pub fn placeholder(
        company_id: Uuid,
        company_name: impl Into<String>,
        domain: Option<String>,
        slot_type: SlotType,
        slot_cost_limit: u64,
    ) -> Self {
        let company_name = company_name.into();
        let mut row = Self::new(company_id, company_name.clone(), slot_type, slot_cost_limit);
        row.company_name = Some(company_name);
        row.domain = domain;
        row.fuzzy_match_status = FuzzyMatchStatus::Matched;
        row.fuzzy_match_score = Some(100.0);
        row
    }

    pub fn with_person_name(mut self, person_name: impl Into<String>) -> Self {
        self.person_name = Some(person_name.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    // Getters

    pub fn id(&self) -> SlotRowId {
        self.id
    }

    pub fn company_id(&self) -> Uuid {
        self.company_id
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    pub fn raw_company_input(&self) -> &str {
        &self.raw_company_input
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn slot_type(&self) -> SlotType {
        self.slot_type
    }

    pub fn person_name(&self) -> Option<&str> {
        self.person_name.as_deref()
    }

    pub fn fuzzy_match_status(&self) -> FuzzyMatchStatus {
        self.fuzzy_match_status
    }

    pub fn fuzzy_match_score(&self) -> Option<f64> {
        self.fuzzy_match_score
    }

    pub fn fuzzy_match_candidates(&self) -> &[FuzzyCandidate] {
        &self.fuzzy_match_candidates
    }

    pub fn is_matched(&self) -> bool {
        self.fuzzy_match_status == FuzzyMatchStatus::Matched
    }

    pub fn linkedin_url(&self) -> Option<&str> {
        self.linkedin_url.as_deref()
    }

    pub fn public_accessible(&self) -> Option<bool> {
        self.public_accessible
    }

    pub fn email_pattern(&self) -> Option<&str> {
        self.email_pattern.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn email_verified(&self) -> Option<bool> {
        self.email_verified
    }

    pub fn current_title(&self) -> Option<&str> {
        self.current_title.as_deref()
    }

    pub fn current_company(&self) -> Option<&str> {
        self.current_company.as_deref()
    }

    pub fn movement_hash(&self) -> Option<&str> {
        self.movement_hash.as_deref()
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn last_failure_reason(&self) -> Option<&str> {
        self.last_failure_reason.as_deref()
    }

    pub fn permanently_failed(&self) -> bool {
        self.permanently_failed
    }

    pub fn slot_cost_accumulated(&self) -> u64 {
        self.slot_cost_accumulated
    }

    pub fn slot_cost_limit(&self) -> u64 {
        self.slot_cost_limit
    }

    pub fn slot_complete(&self) -> bool {
        self.slot_complete
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Whether this row is in a terminal state (no further dispatch).
    pub fn is_terminal(&self) -> bool {
        self.slot_complete || self.permanently_failed
    }

    // Matching

    /// Record the outcome of a fuzzy match run.
    ///
    /// `matched_name` is applied to `company_name` if and only if `status`
    /// is `Matched` — review and unmatched outcomes leave the identity
    /// untouched so upstream resolution can intervene.
    pub fn apply_match(
        &mut self,
        status: FuzzyMatchStatus,
        score: Option<f64>,
        candidates: Vec<FuzzyCandidate>,
        matched_name: Option<String>,
    ) {
        self.fuzzy_match_status = status;
        self.fuzzy_match_score = score;
        self.fuzzy_match_candidates = candidates;
        if status == FuzzyMatchStatus::Matched {
            self.company_name = matched_name;
        }
        self.touch();
    }

    // Enrichment mutators — each owns exactly the fields its agent fills

    pub fn set_linkedin_url(&mut self, url: impl Into<String>) {
        self.linkedin_url = Some(url.into());
        self.touch();
    }

    pub fn set_public_accessible(&mut self, accessible: bool) {
        self.public_accessible = Some(accessible);
        self.touch();
    }

    pub fn set_email_pattern(&mut self, pattern: impl Into<String>) {
        self.email_pattern = Some(pattern.into());
        self.touch();
    }

    /// Store an email with its verification verdict. An unverified or
    /// invalid email is kept, never rolled back.
    pub fn set_email(&mut self, email: impl Into<String>, verified: bool) {
        self.email = Some(email.into());
        self.email_verified = Some(verified);
        self.touch();
    }

    pub fn set_title_company(&mut self, title: impl Into<String>, company: impl Into<String>) {
        self.current_title = Some(title.into());
        self.current_company = Some(company.into());
        self.touch();
    }

    pub fn set_movement_hash(&mut self, hash: impl Into<String>) {
        self.movement_hash = Some(hash.into());
        self.touch();
    }

    // Cost accounting

    /// Remaining spend headroom for this row, in cents.
    pub fn cost_headroom(&self) -> u64 {
        self.slot_cost_limit.saturating_sub(self.slot_cost_accumulated)
    }

    /// Check whether a spend fits inside the per-slot ceiling.
    pub fn can_afford(&self, amount: u64) -> bool {
        amount <= self.cost_headroom()
    }

    /// Record spend against the per-slot ceiling.
    ///
    /// # Errors
    /// Returns `Err` if the spend would push the accumulator past the
    /// limit; callers gate with `can_afford` before dispatching.
    pub fn record_spend(&mut self, amount: u64) -> Result<(), RowError> {
        let new_total = self.slot_cost_accumulated.saturating_add(amount);
        if new_total > self.slot_cost_limit {
            return Err(RowError::SpendExceedsLimit {
                requested: amount,
                available: self.cost_headroom(),
            });
        }
        self.slot_cost_accumulated = new_total;
        self.touch();
        Ok(())
    }

    // Failure state

    /// Record a (non-gate) failure against this row.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_reason = Some(reason.into());
        self.touch();
    }

    /// Mark the row terminally failed. Irreversible from the core's view.
    pub fn mark_permanently_failed(&mut self, reason: impl Into<String>) {
        self.permanently_failed = true;
        self.last_failure_reason = Some(reason.into());
        self.touch();
    }

    // Completion

    /// Mark the row complete.
    ///
    /// # Preconditions
    /// - `fuzzy_match_status == Matched`
    /// - `!permanently_failed`
    ///
    /// The checklist-clear half of the completion invariant is the
    /// dispatcher's responsibility; it only calls this after re-evaluating.
    pub fn mark_complete(&mut self) -> Result<(), RowError> {
        if !self.is_matched() {
            return Err(RowError::NotMatched);
        }
        if self.permanently_failed {
            return Err(RowError::PermanentlyFailed);
        }
        self.slot_complete = true;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Errors raised by invalid row mutations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RowError {
    #[error("spend of {requested} cents exceeds slot headroom of {available} cents")]
    SpendExceedsLimit { requested: u64, available: u64 },

    #[error("row cannot complete before its company is matched")]
    NotMatched,

    #[error("row is permanently failed")]
    PermanentlyFailed,
}
