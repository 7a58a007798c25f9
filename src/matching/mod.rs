//! Company-name resolution against the canonical master list.

mod fuzzy;

pub use fuzzy::{FuzzyConfig, FuzzyMatcher, MatchResult};
