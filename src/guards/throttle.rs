//! Per-agent rate limiting over minute and day windows.
//!
//! Counters reset on check from elapsed wall-clock time — no background
//! timers. `is_throttled` is true when either window has reached its
//! ceiling. Identity-resolution style agents get far higher ceilings than
//! paid lookup agents.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::agents::AgentKind;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Window ceilings for one agent.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThrottleLimits {
    pub per_minute: u32,
    pub per_day: u32,
}

impl ThrottleLimits {
    pub fn new(per_minute: u32, per_day: u32) -> Self {
        Self {
            per_minute,
            per_day,
        }
    }

    /// Default ceilings for an agent kind. Local computation is effectively
    /// unthrottled; paid provider lookups are tight.
    pub fn default_for(kind: AgentKind) -> Self {
        match kind {
            AgentKind::LinkedinFinder => Self::new(30, 2_000),
            AgentKind::PublicScanner => Self::new(120, 10_000),
            AgentKind::Pattern => Self::new(60, 5_000),
            AgentKind::EmailGenerator => Self::new(30, 2_000),
            AgentKind::TitleCompany => Self::new(30, 2_000),
            AgentKind::MovementHash => Self::new(600, 100_000),
        }
    }
}

#[derive(Debug)]
struct Windows {
    minute_count: u32,
    day_count: u32,
    minute_started: Instant,
    day_started: Instant,
}

impl Windows {
    fn new(now: Instant) -> Self {
        Self {
            minute_count: 0,
            day_count: 0,
            minute_started: now,
            day_started: now,
        }
    }

    /// Reset any window whose span has elapsed since it started.
    fn roll(&mut self, now: Instant) {
        if now.duration_since(self.minute_started) >= MINUTE {
            self.minute_count = 0;
            self.minute_started = now;
        }
        if now.duration_since(self.day_started) >= DAY {
            self.day_count = 0;
            self.day_started = now;
        }
    }
}

/// Serializable view of one agent's throttle state.
#[derive(Debug, Clone, Serialize)]
pub struct ThrottleSnapshot {
    pub calls_this_minute: u32,
    pub calls_today: u32,
    pub per_minute_limit: u32,
    pub per_day_limit: u32,
    pub throttled: bool,
}

/// Sliding-window throttle for a single agent.
#[derive(Debug)]
pub struct ThrottleManager {
    limits: ThrottleLimits,
    windows: Mutex<Windows>,
}

impl ThrottleManager {
    pub fn new(limits: ThrottleLimits) -> Self {
        Self {
            limits,
            windows: Mutex::new(Windows::new(Instant::now())),
        }
    }

    pub fn limits(&self) -> ThrottleLimits {
        self.limits
    }

    /// Whether either window is at its ceiling.
    pub fn is_throttled(&self) -> bool {
        self.is_throttled_at(Instant::now())
    }

    fn is_throttled_at(&self, now: Instant) -> bool {
        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        windows.roll(now);
        windows.minute_count >= self.limits.per_minute || windows.day_count >= self.limits.per_day
    }

    /// Record one call against both windows.
    pub fn record_call(&self) {
        self.record_call_at(Instant::now());
    }

    fn record_call_at(&self, now: Instant) {
        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        windows.roll(now);
        windows.minute_count = windows.minute_count.saturating_add(1);
        windows.day_count = windows.day_count.saturating_add(1);
    }

    pub fn snapshot(&self) -> ThrottleSnapshot {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        windows.roll(now);
        ThrottleSnapshot {
            calls_this_minute: windows.minute_count,
            calls_today: windows.day_count,
            per_minute_limit: self.limits.per_minute,
            per_day_limit: self.limits.per_day,
            throttled: windows.minute_count >= self.limits.per_minute
                || windows.day_count >= self.limits.per_day,
        }
    }
}

/// One throttle per agent kind.
#[derive(Debug)]
pub struct AgentThrottleRegistry {
    managers: HashMap<AgentKind, ThrottleManager>,
}

impl AgentThrottleRegistry {
    /// Build a registry with default ceilings for every agent kind.
    pub fn with_defaults() -> Self {
        let managers = AgentKind::ALL
            .iter()
            .map(|&kind| (kind, ThrottleManager::new(ThrottleLimits::default_for(kind))))
            .collect();
        Self { managers }
    }

    /// Override the ceilings for one agent kind.
    pub fn set_limits(&mut self, kind: AgentKind, limits: ThrottleLimits) {
        self.managers.insert(kind, ThrottleManager::new(limits));
    }

    pub fn is_throttled(&self, kind: AgentKind) -> bool {
        self.managers
            .get(&kind)
            .map(|m| m.is_throttled())
            .unwrap_or(false)
    }

    pub fn record_call(&self, kind: AgentKind) {
        if let Some(manager) = self.managers.get(&kind) {
            manager.record_call();
        }
    }

    pub fn snapshot(&self) -> HashMap<AgentKind, ThrottleSnapshot> {
        self.managers
            .iter()
            .map(|(&kind, m)| (kind, m.snapshot()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn calls_today(&self, kind: AgentKind) -> u32 {
        self.managers
            .get(&kind)
            .map(|m| m.snapshot().calls_today)
            .unwrap_or(0)
    }
}

impl Default for AgentThrottleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttles_at_minute_ceiling() {
        let manager = ThrottleManager::new(ThrottleLimits::new(2, 100));
        let now = Instant::now();
        assert!(!manager.is_throttled_at(now));

        manager.record_call_at(now);
        manager.record_call_at(now);
        assert!(manager.is_throttled_at(now));
    }

    #[test]
    fn minute_window_resets_after_elapse() {
        let manager = ThrottleManager::new(ThrottleLimits::new(1, 100));
        let start = Instant::now();
        manager.record_call_at(start);
        assert!(manager.is_throttled_at(start));

        // One minute later the minute window rolls, the day window doesn't
        let later = start + Duration::from_secs(61);
        assert!(!manager.is_throttled_at(later));
        let snap = manager.snapshot();
        assert_eq!(snap.calls_today, 1);
    }

    #[test]
    fn day_ceiling_outlives_minute_resets() {
        let manager = ThrottleManager::new(ThrottleLimits::new(100, 2));
        let start = Instant::now();
        manager.record_call_at(start);
        manager.record_call_at(start + Duration::from_secs(61));
        assert!(manager.is_throttled_at(start + Duration::from_secs(122)));
    }

    #[test]
    fn registry_has_a_manager_per_kind() {
        let registry = AgentThrottleRegistry::with_defaults();
        for &kind in AgentKind::ALL.iter() {
            assert!(!registry.is_throttled(kind));
        }
    }
}
