//! Shared gating state: throttles, kill switches, cost ceilings and
//! failure classification.
//!
//! All four are process-wide shared mutable state; every mutation is atomic
//! with respect to concurrent row processing (single mutex per structure).
//! Gate checks are synchronous and in-memory so the dispatcher can evaluate
//! them immediately before the suspending provider call.

mod cost;
mod failure;
mod kill_switch;
mod throttle;

pub use cost::{CostError, CostGuard, CostSnapshot};
pub use failure::{
    classify, FailManager, FailureClass, FailureConfig, FailureDecision, FailureSnapshot,
};
pub use kill_switch::{KillRecord, KillSwitchManager, KillSwitchSnapshot};
pub use throttle::{
    AgentThrottleRegistry, ThrottleLimits, ThrottleManager, ThrottleSnapshot,
};
