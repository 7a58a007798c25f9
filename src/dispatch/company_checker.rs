//! Company-level slot check: decide whether missing executive slots need
//! placeholder rows, and create them exactly once.
//!
//! Creation is a trigger step, not enrichment: placeholders are born
//! `Matched` (they inherit the resolved company identity) and seed the next
//! dispatcher pass. The check-then-create window is serialized per company
//! so concurrent passes over sibling rows cannot double-seed a slot.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::model::{CompanyState, SlotRow, SlotType};

pub struct CompanyChecker {
    mandatory: Vec<SlotType>,
    default_slot_limit_cents: u64,
    /// One lock per company around check-and-seed
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    /// Slots this checker already seeded, so a second pass before the
    /// caller persists the placeholders cannot recreate them
    seeded: StdMutex<HashSet<(Uuid, SlotType)>>,
}

impl CompanyChecker {
    pub fn new(mandatory: Vec<SlotType>, default_slot_limit_cents: u64) -> Self {
        Self {
            mandatory,
            default_slot_limit_cents,
            locks: Mutex::new(HashMap::new()),
            seeded: StdMutex::new(HashSet::new()),
        }
    }

    pub fn mandatory(&self) -> &[SlotType] {
        &self.mandatory
    }

    async fn company_lock(&self, company_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(company_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Check one company's slot coverage and emit placeholder rows for any
    /// mandatory slot with no row yet.
    ///
    /// Skips entirely when the company is fully staffed or every mandatory
    /// slot is permanently failed.
    pub async fn check_and_seed(&self, anchor: &SlotRow, all_rows: &[SlotRow]) -> Vec<SlotRow> {
        let company_id = anchor.company_id();
        let Some(company_name) = anchor.company_name().map(str::to_string) else {
            // Only matched rows reach this step; nothing to inherit otherwise.
            return Vec::new();
        };

        let lock = self.company_lock(company_id).await;
        let _guard = lock.lock().await;

        let state = CompanyState::compute(company_id, all_rows, &self.mandatory);
        if state.is_fully_staffed || state.all_mandatory_failed() {
            return Vec::new();
        }

        let mut created = Vec::new();
        {
            let mut seeded = self.seeded.lock().expect("seed set lock poisoned");
            for &slot in &state.missing_slots {
                // The anchor row covers its own slot even before persistence
                if slot == anchor.slot_type() {
                    continue;
                }
                if !seeded.insert((company_id, slot)) {
                    continue;
                }
                created.push(SlotRow::placeholder(
                    company_id,
                    company_name.clone(),
                    anchor.domain().map(str::to_string),
                    slot,
                    self.default_slot_limit_cents,
                ));
            }
        }

        if !created.is_empty() {
            tracing::info!(
                company_id = %company_id,
                company = %company_name,
                count = created.len(),
                "seeded placeholder rows for missing mandatory slots"
            );
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(company_id: Uuid) -> SlotRow {
        SlotRow::placeholder(company_id, "Acme Corporation", None, SlotType::Ceo, 100)
    }

    #[tokio::test]
    async fn seeds_missing_mandatory_slots() {
        let checker = CompanyChecker::new(vec![SlotType::Ceo, SlotType::Cfo], 100);
        let company_id = Uuid::new_v4();
        let row = anchor(company_id);

        let created = checker.check_and_seed(&row, std::slice::from_ref(&row)).await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].slot_type(), SlotType::Cfo);
        assert!(created[0].is_matched());
        assert_eq!(created[0].company_name(), Some("Acme Corporation"));
    }

    #[tokio::test]
    async fn never_seeds_the_same_slot_twice() {
        let checker = CompanyChecker::new(vec![SlotType::Ceo, SlotType::Cfo], 100);
        let company_id = Uuid::new_v4();
        let row = anchor(company_id);

        let first = checker.check_and_seed(&row, std::slice::from_ref(&row)).await;
        assert_eq!(first.len(), 1);
        // Second pass before the placeholder is persisted: no duplicates
        let second = checker.check_and_seed(&row, std::slice::from_ref(&row)).await;
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn skips_fully_staffed_company() {
        let checker = CompanyChecker::new(vec![SlotType::Ceo], 100);
        let company_id = Uuid::new_v4();
        let mut row = anchor(company_id);
        row.mark_complete().unwrap();

        let created = checker.check_and_seed(&row, std::slice::from_ref(&row)).await;
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn skips_when_all_mandatory_slots_failed() {
        let checker = CompanyChecker::new(vec![SlotType::Ceo], 100);
        let company_id = Uuid::new_v4();
        let mut row = anchor(company_id);
        row.mark_permanently_failed("profile not found");

        let created = checker.check_and_seed(&row, std::slice::from_ref(&row)).await;
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn concurrent_passes_seed_exactly_once() {
        let checker = Arc::new(CompanyChecker::new(vec![SlotType::Ceo, SlotType::Cfo], 100));
        let company_id = Uuid::new_v4();
        let row = Arc::new(anchor(company_id));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let checker = Arc::clone(&checker);
            let row = Arc::clone(&row);
            handles.push(tokio::spawn(async move {
                let anchor: &SlotRow = &row;
                checker
                    .check_and_seed(anchor, std::slice::from_ref(anchor))
                    .await
            }));
        }

        let mut total_created = 0;
        for handle in handles {
            total_created += handle.await.unwrap().len();
        }
        assert_eq!(total_created, 1);
    }
}
