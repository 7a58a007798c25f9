//! Operator-controlled hard stops, independent of rate limits.
//!
//! Kill state is checked before throttle state: an operator stop takes
//! precedence over and short-circuits capacity accounting.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agents::AgentKind;

/// Who stopped an agent, why, and when.
#[derive(Debug, Clone, Serialize)]
pub struct KillRecord {
    pub reason: String,
    pub operator: String,
    pub killed_at: DateTime<Utc>,
}

impl KillRecord {
    fn new(reason: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            operator: operator.into(),
            killed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct KillState {
    global: Option<KillRecord>,
    agents: HashMap<AgentKind, KillRecord>,
}

/// Serializable view of the full kill-switch state.
#[derive(Debug, Clone, Serialize)]
pub struct KillSwitchSnapshot {
    pub global: Option<KillRecord>,
    pub agents: HashMap<AgentKind, KillRecord>,
}

/// Per-agent and global emergency stop.
#[derive(Debug, Default)]
pub struct KillSwitchManager {
    state: Mutex<KillState>,
}

impl KillSwitchManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop one agent kind.
    pub fn kill(&self, kind: AgentKind, reason: impl Into<String>, operator: impl Into<String>) {
        let record = KillRecord::new(reason, operator);
        tracing::warn!(
            agent = %kind,
            reason = %record.reason,
            operator = %record.operator,
            "agent kill switch engaged"
        );
        let mut state = self.state.lock().expect("kill switch lock poisoned");
        state.agents.insert(kind, record);
    }

    /// Re-enable one agent kind.
    pub fn revive(&self, kind: AgentKind) {
        let mut state = self.state.lock().expect("kill switch lock poisoned");
        if state.agents.remove(&kind).is_some() {
            tracing::info!(agent = %kind, "agent kill switch released");
        }
    }

    /// Stop every agent at once.
    pub fn kill_all(&self, reason: impl Into<String>, operator: impl Into<String>) {
        let record = KillRecord::new(reason, operator);
        tracing::warn!(
            reason = %record.reason,
            operator = %record.operator,
            "global kill switch engaged"
        );
        let mut state = self.state.lock().expect("kill switch lock poisoned");
        state.global = Some(record);
    }

    /// Release the global stop. Per-agent stops stay in place.
    pub fn revive_all(&self) {
        let mut state = self.state.lock().expect("kill switch lock poisoned");
        if state.global.take().is_some() {
            tracing::info!("global kill switch released");
        }
    }

    /// The record stopping this agent, if any (global takes precedence).
    pub fn kill_record(&self, kind: AgentKind) -> Option<KillRecord> {
        let state = self.state.lock().expect("kill switch lock poisoned");
        state
            .global
            .clone()
            .or_else(|| state.agents.get(&kind).cloned())
    }

    pub fn is_killed(&self, kind: AgentKind) -> bool {
        self.kill_record(kind).is_some()
    }

    pub fn snapshot(&self) -> KillSwitchSnapshot {
        let state = self.state.lock().expect("kill switch lock poisoned");
        KillSwitchSnapshot {
            global: state.global.clone(),
            agents: state.agents.clone(),
        }
    }
}
