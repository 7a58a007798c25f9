//! Enrichment agents: one per missing checklist piece.
//!
//! # Agent Types
//! - **LinkedinFinderAgent**: profile resolve, person-search fallback
//! - **PublicScanAgent**: accessibility flag via the profile provider
//! - **PatternAgent**: domain email-pattern lookup
//! - **EmailGeneratorAgent**: pattern/finder generation plus verification
//! - **TitleCompanyAgent**: profile lookup, person-search fallback
//! - **MovementHashAgent**: local fingerprint, no provider
//!
//! # Invariants
//! - `run()` never panics and never returns `Err`; every failure surfaces
//!   as a structured `AgentOutcome` for the fail manager
//! - an agent mutates (via its payload) only the fields it owns

mod email;
mod linkedin;
mod movement;
mod pattern;
mod public_scan;
mod registry;
mod title_company;

pub use email::EmailGeneratorAgent;
pub use linkedin::{LinkedinFinderAgent, LinkedinFinderConfig};
pub use movement::{compute_movement_hash, detect_movement, MovementHashAgent};
pub use pattern::PatternAgent;
pub use public_scan::PublicScanAgent;
pub use registry::{AgentRegistry, GateRefusal};
pub use title_company::{TitleCompanyAgent, TitleCompanyConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::checklist::ChecklistItem;
use crate::guards::CostGuard;
use crate::model::{SlotRow, SlotRowId, SlotType};
use crate::providers::VerificationStatus;

/// The closed set of agent types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    LinkedinFinder,
    PublicScanner,
    Pattern,
    EmailGenerator,
    TitleCompany,
    MovementHash,
}

impl AgentKind {
    /// All kinds, in checklist routing order.
    pub const ALL: [AgentKind; 6] = [
        AgentKind::LinkedinFinder,
        AgentKind::PublicScanner,
        AgentKind::Pattern,
        AgentKind::EmailGenerator,
        AgentKind::TitleCompany,
        AgentKind::MovementHash,
    ];
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LinkedinFinder => write!(f, "linkedin_finder"),
            Self::PublicScanner => write!(f, "public_scanner"),
            Self::Pattern => write!(f, "pattern"),
            Self::EmailGenerator => write!(f, "email_generator"),
            Self::TitleCompany => write!(f, "title_company"),
            Self::MovementHash => write!(f, "movement_hash"),
        }
    }
}

impl From<ChecklistItem> for AgentKind {
    fn from(item: ChecklistItem) -> Self {
        match item {
            ChecklistItem::Linkedin => Self::LinkedinFinder,
            ChecklistItem::PublicFlag => Self::PublicScanner,
            ChecklistItem::Pattern => Self::Pattern,
            ChecklistItem::Email => Self::EmailGenerator,
            ChecklistItem::TitleCompany => Self::TitleCompany,
            ChecklistItem::Hash => Self::MovementHash,
        }
    }
}

/// Static routing metadata for one agent.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AgentMeta {
    pub kind: AgentKind,
    /// Nominal provider cost of one run, in cents; 0 = unpaid agent
    pub cost_cents: u64,
    /// Position in the checklist routing order (1-based)
    pub layer: u8,
    /// Agent whose output this one consumes, if any
    pub depends_on: Option<AgentKind>,
}

/// Spend rules the dispatcher hands an agent for its fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostPolicy {
    /// Whether the fallback provider may be used at all
    pub fallback_enabled: bool,
    /// Remaining slot headroom available to the fallback; `None` means
    /// fallback spend does not count against the per-slot ceiling
    pub fallback_slot_budget_cents: Option<u64>,
}

/// Identity-bearing work order handed to an agent.
#[derive(Debug, Clone, Default)]
pub struct AgentTask {
    pub row_id: SlotRowId,
    pub company_name: String,
    pub slot_type: Option<SlotType>,
    pub person_name: Option<String>,
    pub domain: Option<String>,
    pub linkedin_url: Option<String>,
    pub email_pattern: Option<String>,
    pub email: Option<String>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    /// Movement hash from the previous enrichment run, if any
    pub previous_hash: Option<String>,
    pub cost_policy: CostPolicy,
}

impl AgentTask {
    /// Build a task from a matched row's known fields.
    pub fn from_row(row: &SlotRow, previous_hash: Option<String>, cost_policy: CostPolicy) -> Self {
        Self {
            row_id: row.id(),
            company_name: row.company_name().unwrap_or_default().to_string(),
            slot_type: Some(row.slot_type()),
            person_name: row.person_name().map(str::to_string),
            domain: row.domain().map(str::to_string),
            linkedin_url: row.linkedin_url().map(str::to_string),
            email_pattern: row.email_pattern().map(str::to_string),
            email: row.email().map(str::to_string),
            current_title: row.current_title().map(str::to_string),
            current_company: row.current_company().map(str::to_string),
            previous_hash,
            cost_policy,
        }
    }
}

/// Field data a successful agent run produced. Each variant maps onto the
/// row fields that agent owns.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentPayload {
    Linkedin {
        url: String,
        via_fallback: bool,
    },
    PublicFlag {
        accessible: bool,
    },
    Pattern {
        pattern: String,
    },
    Email {
        email: String,
        verified: bool,
        status: VerificationStatus,
    },
    TitleCompany {
        title: String,
        company: String,
    },
    Hash {
        hash: String,
        /// Whether the fingerprint changed vs the previous run; `None`
        /// when there was no previous hash to compare
        moved: Option<bool>,
    },
}

impl AgentPayload {
    /// Write the payload onto the row, touching only the owned fields.
    pub fn apply(&self, row: &mut SlotRow) {
        match self {
            Self::Linkedin { url, .. } => row.set_linkedin_url(url.clone()),
            Self::PublicFlag { accessible } => row.set_public_accessible(*accessible),
            Self::Pattern { pattern } => row.set_email_pattern(pattern.clone()),
            Self::Email {
                email, verified, ..
            } => row.set_email(email.clone(), *verified),
            Self::TitleCompany { title, company } => {
                row.set_title_company(title.clone(), company.clone())
            }
            Self::Hash { hash, .. } => row.set_movement_hash(hash.clone()),
        }
    }
}

/// Success/failure envelope returned by every agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub success: bool,
    pub payload: Option<AgentPayload>,
    pub error: Option<String>,
    pub warning: Option<String>,
    /// Extra spend the agent charged against the global guard itself
    /// (fallback paths); the dispatcher accounts for the nominal cost
    pub cost_cents: u64,
    /// Portion of that extra spend counting against the slot ceiling
    pub slot_cost_cents: u64,
}

impl AgentOutcome {
    pub fn success(payload: AgentPayload) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
            warning: None,
            cost_cents: 0,
            slot_cost_cents: 0,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
            warning: None,
            cost_cents: 0,
            slot_cost_cents: 0,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn with_extra_cost(mut self, cost_cents: u64, slot_cost_cents: u64) -> Self {
        self.cost_cents = cost_cents;
        self.slot_cost_cents = slot_cost_cents;
        self
    }
}

/// Uniform interface over the six agent types.
///
/// # Invariants
/// - `run()` never panics; provider trouble comes back as a failed outcome
/// - a `None` cost guard disables the fallback headroom gate, not the
///   fallback itself
#[async_trait]
pub trait EnrichmentAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Routing metadata: nominal cost, layer, dependency.
    fn meta(&self) -> AgentMeta;

    /// Execute one enrichment attempt for one row.
    async fn run(&self, task: &AgentTask, guard: Option<&CostGuard>) -> AgentOutcome;
}
