//! Checklist evaluation: which enrichment pieces a row is still missing.
//!
//! Pure functions over `SlotRow`; no I/O, no shared state. The priority
//! order of `next_missing` is fixed because it encodes a dependency chain:
//! email generation wants a known pattern, and title/company lookup wants a
//! resolved LinkedIn URL, so agents are never invoked out of order.

use serde::Serialize;

use crate::model::SlotRow;

/// The enrichment pieces a row can be missing, in routing priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistItem {
    Linkedin,
    PublicFlag,
    Pattern,
    Email,
    TitleCompany,
    Hash,
}

/// Routing priority: linkedin → public_flag → pattern → email →
/// title_company → hash.
pub const PRIORITY: [ChecklistItem; 6] = [
    ChecklistItem::Linkedin,
    ChecklistItem::PublicFlag,
    ChecklistItem::Pattern,
    ChecklistItem::Email,
    ChecklistItem::TitleCompany,
    ChecklistItem::Hash,
];

/// Missing/present status of every checklist item for one row.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChecklistResult {
    pub missing_linkedin: bool,
    pub missing_public_flag: bool,
    pub missing_pattern: bool,
    /// Email absent, or present without a verification verdict
    pub missing_email: bool,
    /// Title and company travel as a pair
    pub missing_title_company: bool,
    pub missing_hash: bool,
    /// No items missing AND matched AND not permanently failed
    pub ready_for_completion: bool,
}

impl ChecklistResult {
    /// Whether every checklist item is present.
    pub fn is_clear(&self) -> bool {
        !self.missing_linkedin
            && !self.missing_public_flag
            && !self.missing_pattern
            && !self.missing_email
            && !self.missing_title_company
            && !self.missing_hash
    }

    /// Number of missing items.
    pub fn missing_count(&self) -> usize {
        [
            self.missing_linkedin,
            self.missing_public_flag,
            self.missing_pattern,
            self.missing_email,
            self.missing_title_company,
            self.missing_hash,
        ]
        .iter()
        .filter(|&&m| m)
        .count()
    }

    fn is_missing(&self, item: ChecklistItem) -> bool {
        match item {
            ChecklistItem::Linkedin => self.missing_linkedin,
            ChecklistItem::PublicFlag => self.missing_public_flag,
            ChecklistItem::Pattern => self.missing_pattern,
            ChecklistItem::Email => self.missing_email,
            ChecklistItem::TitleCompany => self.missing_title_company,
            ChecklistItem::Hash => self.missing_hash,
        }
    }

    /// The next item to route, by fixed priority. `None` when clear.
    pub fn next_missing(&self) -> Option<ChecklistItem> {
        PRIORITY.iter().copied().find(|&item| self.is_missing(item))
    }
}

/// Evaluate the checklist for one row.
pub fn evaluate(row: &SlotRow) -> ChecklistResult {
    let missing_linkedin = row.linkedin_url().is_none();
    let missing_public_flag = row.public_accessible().is_none();
    let missing_pattern = row.email_pattern().is_none();
    let missing_email = row.email().is_none() || row.email_verified().is_none();
    let missing_title_company = row.current_title().is_none() || row.current_company().is_none();
    let missing_hash = row.movement_hash().is_none();

    let clear = !missing_linkedin
        && !missing_public_flag
        && !missing_pattern
        && !missing_email
        && !missing_title_company
        && !missing_hash;

    ChecklistResult {
        missing_linkedin,
        missing_public_flag,
        missing_pattern,
        missing_email,
        missing_title_company,
        missing_hash,
        ready_for_completion: clear && row.is_matched() && !row.permanently_failed(),
    }
}
