//! Derived company-level view across all slot rows for one company.
//!
//! Recomputed on demand from the caller's row set; never stored by the core.

use serde::Serialize;
use uuid::Uuid;

use super::{SlotRow, SlotType};

/// Aggregate of one company's rows, grouped by progress.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyState {
    pub company_id: Uuid,
    /// Mandatory slot types with no row at all
    pub missing_slots: Vec<SlotType>,
    /// Slot types with at least one completed row
    pub filled_slots: Vec<SlotType>,
    /// Slot types with rows still being enriched
    pub in_progress_slots: Vec<SlotType>,
    /// Slot types where every row is permanently failed
    pub failed_slots: Vec<SlotType>,
    /// Every mandatory slot has a completed row
    pub is_fully_staffed: bool,
}

impl CompanyState {
    /// Compute the state for one company from its full row set.
    ///
    /// Rows belonging to other companies are ignored, so callers can pass
    /// an unfiltered batch slice.
    pub fn compute(company_id: Uuid, rows: &[SlotRow], mandatory: &[SlotType]) -> Self {
        let company_rows: Vec<&SlotRow> = rows
            .iter()
            .filter(|r| r.company_id() == company_id)
            .collect();

        let mut missing_slots = Vec::new();
        let mut filled_slots = Vec::new();
        let mut in_progress_slots = Vec::new();
        let mut failed_slots = Vec::new();

        for &slot in mandatory {
            let slot_rows: Vec<&&SlotRow> = company_rows
                .iter()
                .filter(|r| r.slot_type() == slot)
                .collect();
            if slot_rows.is_empty() {
                missing_slots.push(slot);
            } else if slot_rows.iter().any(|r| r.slot_complete()) {
                filled_slots.push(slot);
            } else if slot_rows.iter().all(|r| r.permanently_failed()) {
                failed_slots.push(slot);
            } else {
                in_progress_slots.push(slot);
            }
        }

        let is_fully_staffed = !mandatory.is_empty()
            && missing_slots.is_empty()
            && in_progress_slots.is_empty()
            && failed_slots.is_empty();

        Self {
            company_id,
            missing_slots,
            filled_slots,
            in_progress_slots,
            failed_slots,
            is_fully_staffed,
        }
    }

    /// Whether every mandatory slot is represented and permanently failed —
    /// the "stop creating placeholders" condition for the company checker.
    pub fn all_mandatory_failed(&self) -> bool {
        self.missing_slots.is_empty()
            && self.filled_slots.is_empty()
            && self.in_progress_slots.is_empty()
            && !self.failed_slots.is_empty()
    }
}
