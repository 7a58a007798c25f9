//! Global spend ceiling enforcement.
//!
//! # Invariants
//! - `spent_cents <= ceiling_cents` at all times (enforced pre-spend)
//!
//! The per-row `slot_cost_limit` is a separate, independent ceiling owned by
//! `SlotRow`; the dispatcher checks it before this global one.

use std::sync::Mutex;

use serde::Serialize;

/// Process-wide spend tracker with a hard ceiling.
#[derive(Debug)]
pub struct CostGuard {
    ceiling_cents: u64,
    spent: Mutex<u64>,
}

/// Serializable view of the guard for operator dashboards.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CostSnapshot {
    pub ceiling_cents: u64,
    pub spent_cents: u64,
    pub remaining_cents: u64,
}

impl CostGuard {
    pub fn new(ceiling_cents: u64) -> Self {
        Self {
            ceiling_cents,
            spent: Mutex::new(0),
        }
    }

    /// A guard that never refuses (for tests and unmetered runs).
    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    pub fn ceiling_cents(&self) -> u64 {
        self.ceiling_cents
    }

    pub fn spent_cents(&self) -> u64 {
        *self.spent.lock().expect("cost guard lock poisoned")
    }

    pub fn remaining_cents(&self) -> u64 {
        self.ceiling_cents.saturating_sub(self.spent_cents())
    }

    /// Whether a spend would fit under the ceiling right now.
    ///
    /// Advisory only under concurrency — use `try_charge` to check and
    /// commit atomically for a single dispatch decision.
    pub fn can_spend(&self, amount: u64) -> bool {
        let spent = self.spent.lock().expect("cost guard lock poisoned");
        spent.saturating_add(amount) <= self.ceiling_cents
    }

    /// Atomically check and commit a spend.
    ///
    /// # Postcondition
    /// On `Ok`, `spent_cents` increased by `amount` and is still within the
    /// ceiling. On `Err`, nothing changed.
    pub fn try_charge(&self, amount: u64) -> Result<(), CostError> {
        let mut spent = self.spent.lock().expect("cost guard lock poisoned");
        let new_total = spent.saturating_add(amount);
        if new_total > self.ceiling_cents {
            return Err(CostError::CeilingExceeded {
                requested: amount,
                remaining: self.ceiling_cents.saturating_sub(*spent),
            });
        }
        *spent = new_total;
        Ok(())
    }

    pub fn snapshot(&self) -> CostSnapshot {
        let spent = self.spent_cents();
        CostSnapshot {
            ceiling_cents: self.ceiling_cents,
            spent_cents: spent,
            remaining_cents: self.ceiling_cents.saturating_sub(spent),
        }
    }
}

/// Errors from spend enforcement.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CostError {
    #[error("charge of {requested} cents exceeds remaining global budget of {remaining} cents")]
    CeilingExceeded { requested: u64, remaining: u64 },
}
