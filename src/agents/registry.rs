//! Agent registry: instances, metadata, and the single "can this agent run
//! now" gate.
//!
//! Gate order is fixed: kill switch first, throttle second. An operator
//! stop must short-circuit capacity accounting, so a killed agent never
//! increments a throttle counter.

use std::collections::HashMap;
use std::sync::Arc;

use crate::guards::{AgentThrottleRegistry, KillRecord, KillSwitchManager};

use super::{AgentKind, AgentMeta, EnrichmentAgent};

/// Why the gate refused an agent.
#[derive(Debug, Clone)]
pub enum GateRefusal {
    /// Operator stop; carries the kill record
    Killed(KillRecord),
    /// A throttle window is at its ceiling
    Throttled,
}

/// Explicit map from agent kind to instance, with shared gating state.
pub struct AgentRegistry {
    agents: HashMap<AgentKind, Arc<dyn EnrichmentAgent>>,
    kill_switches: Arc<KillSwitchManager>,
    throttles: Arc<AgentThrottleRegistry>,
}

impl AgentRegistry {
    pub fn new(
        kill_switches: Arc<KillSwitchManager>,
        throttles: Arc<AgentThrottleRegistry>,
    ) -> Self {
        Self {
            agents: HashMap::new(),
            kill_switches,
            throttles,
        }
    }

    /// Register an agent instance under its own kind.
    pub fn register(&mut self, agent: Arc<dyn EnrichmentAgent>) {
        self.agents.insert(agent.kind(), agent);
    }

    pub fn get(&self, kind: AgentKind) -> Option<Arc<dyn EnrichmentAgent>> {
        self.agents.get(&kind).cloned()
    }

    pub fn meta(&self, kind: AgentKind) -> Option<AgentMeta> {
        self.agents.get(&kind).map(|a| a.meta())
    }

    /// All registered metadata, for routing-topology introspection.
    pub fn metadata(&self) -> Vec<AgentMeta> {
        let mut metas: Vec<AgentMeta> = self.agents.values().map(|a| a.meta()).collect();
        metas.sort_by_key(|m| m.layer);
        metas
    }

    pub fn kill_switches(&self) -> &Arc<KillSwitchManager> {
        &self.kill_switches
    }

    pub fn throttles(&self) -> &Arc<AgentThrottleRegistry> {
        &self.throttles
    }

    /// The combined gate: kill switch, then throttle.
    ///
    /// # Property
    /// For a killed agent this returns before any throttle state is read,
    /// so no counter can move on its behalf.
    pub fn check_gate(&self, kind: AgentKind) -> Result<(), GateRefusal> {
        if let Some(record) = self.kill_switches.kill_record(kind) {
            return Err(GateRefusal::Killed(record));
        }
        if self.throttles.is_throttled(kind) {
            return Err(GateRefusal::Throttled);
        }
        Ok(())
    }

    /// Count one call against the agent's throttle windows. Called
    /// immediately before the suspending provider call.
    pub fn record_call(&self, kind: AgentKind) {
        self.throttles.record_call(kind);
    }
}
