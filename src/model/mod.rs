//! Domain model: slot rows and derived company state.

mod company;
mod slot_row;

pub use company::CompanyState;
pub use slot_row::{
    FuzzyCandidate, FuzzyMatchStatus, RowError, SlotRow, SlotRowId, SlotType,
};
