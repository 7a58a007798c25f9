//! # slotfill
//!
//! Enrichment dispatcher for executive contact records.
//!
//! Sparse (company, slot) records come in; complete, verified contact
//! profiles come out. The dispatcher matches raw company input to a
//! canonical identity, works out which pieces a slot row is still missing,
//! routes each piece to its provider-backed agent, and enforces throttling,
//! kill switches, cost ceilings and failure classification along the way.
//!
//! ## Pipeline
//!
//! ```text
//! raw input -> FuzzyMatcher -> CompanyChecker -> Checklist
//!       -> Dispatcher routes missing piece -> agent calls provider(s)
//!       -> SlotRow updated -> Checklist re-evaluated -> complete or loop
//! ```
//!
//! ## Modules
//! - `model`: `SlotRow` and derived `CompanyState`
//! - `matching`: fuzzy company-name resolution
//! - `checklist`: missing-piece evaluation and routing priority
//! - `guards`: throttle, kill switch, cost guard, fail manager
//! - `agents`: the six enrichment agents and their registry
//! - `providers`: the narrow provider traits and HTTP transport
//! - `dispatch`: the five-state pass and batch runner
//!
//! The crate is a library with no transport of its own; external
//! orchestration feeds it rows and persists what comes back.

pub mod agents;
pub mod checklist;
pub mod config;
pub mod dispatch;
pub mod guards;
pub mod matching;
pub mod model;
pub mod providers;

pub use agents::{AgentKind, AgentOutcome, AgentRegistry, EnrichmentAgent};
pub use config::DispatcherConfig;
pub use dispatch::{BatchOutput, DispatchResult, DispatchStatus, Dispatcher, RowTask};
pub use guards::{CostGuard, FailManager, KillSwitchManager};
pub use matching::FuzzyMatcher;
pub use model::{CompanyState, SlotRow, SlotType};

/// Initialize tracing for binaries and integration harnesses embedding the
/// dispatcher: env-filtered, defaulting to `slotfill=debug`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotfill=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
