//! Configuration management for the enrichment dispatcher.
//!
//! Configuration can be set via environment variables:
//! - `SLOTFILL_PROVIDER_TIMEOUT_SECS` - Optional. Caller-side timeout per provider call. Defaults to `30`.
//! - `SLOTFILL_BATCH_CONCURRENCY` - Optional. Rows processed concurrently per batch. Defaults to `8`.
//! - `SLOTFILL_GLOBAL_COST_CEILING_CENTS` - Optional. Global spend ceiling. Defaults to `10000`.
//! - `SLOTFILL_SLOT_COST_LIMIT_CENTS` - Optional. Default per-slot ceiling for seeded rows. Defaults to `100`.
//! - `SLOTFILL_FALLBACK_ENABLED` - Optional. Whether fallback providers may run. Defaults to `true`.
//! - `SLOTFILL_FALLBACK_COUNTS_AGAINST_SLOT` - Optional. Whether fallback spend draws from the per-slot ceiling. Defaults to `true`.
//! - `SLOTFILL_MAX_RETRIES` - Optional. Attempts before a row/agent pair is blocked. Defaults to `3`.
//! - `SLOTFILL_AUTO_ACCEPT_THRESHOLD` - Optional. Fuzzy score for auto-accept. Defaults to `90`.
//! - `SLOTFILL_MIN_MATCH_SCORE` - Optional. Fuzzy score below which a name is unmatched. Defaults to `60`.

use std::time::Duration;

use thiserror::Error;

use crate::guards::FailureConfig;
use crate::matching::FuzzyConfig;
use crate::model::SlotType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Caller-side timeout carried by every provider call
    pub provider_timeout: Duration,

    /// Bounded concurrency for batch passes
    pub batch_concurrency: usize,

    /// Slot types every company must staff (the checker seeds these)
    pub mandatory_slots: Vec<SlotType>,

    /// Per-slot spend ceiling for rows the checker creates, in cents
    pub default_slot_limit_cents: u64,

    /// Global spend ceiling, in cents
    pub global_cost_ceiling_cents: u64,

    /// Whether fallback providers may run at all
    pub fallback_enabled: bool,

    /// Whether fallback spend draws from the same per-slot ceiling as the
    /// primary provider
    pub fallback_counts_against_slot_limit: bool,

    /// Fuzzy-match thresholds
    pub fuzzy: FuzzyConfig,

    /// Failure classification and backoff
    pub failure: FailureConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            batch_concurrency: 8,
            mandatory_slots: vec![SlotType::Ceo],
            default_slot_limit_cents: 100,
            global_cost_ceiling_cents: 10_000,
            fallback_enabled: true,
            fallback_counts_against_slot_limit: true,
            fuzzy: FuzzyConfig::default(),
            failure: FailureConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(secs) = parse_env::<u64>("SLOTFILL_PROVIDER_TIMEOUT_SECS")? {
            config.provider_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_env::<usize>("SLOTFILL_BATCH_CONCURRENCY")? {
            config.batch_concurrency = n.max(1);
        }
        if let Some(cents) = parse_env::<u64>("SLOTFILL_GLOBAL_COST_CEILING_CENTS")? {
            config.global_cost_ceiling_cents = cents;
        }
        if let Some(cents) = parse_env::<u64>("SLOTFILL_SLOT_COST_LIMIT_CENTS")? {
            config.default_slot_limit_cents = cents;
        }
        if let Some(enabled) = parse_env::<bool>("SLOTFILL_FALLBACK_ENABLED")? {
            config.fallback_enabled = enabled;
        }
        if let Some(counts) = parse_env::<bool>("SLOTFILL_FALLBACK_COUNTS_AGAINST_SLOT")? {
            config.fallback_counts_against_slot_limit = counts;
        }
        if let Some(retries) = parse_env::<u32>("SLOTFILL_MAX_RETRIES")? {
            config.failure.max_retries = retries;
        }
        if let Some(threshold) = parse_env::<f64>("SLOTFILL_AUTO_ACCEPT_THRESHOLD")? {
            config.fuzzy.auto_accept_threshold = threshold;
        }
        if let Some(score) = parse_env::<f64>("SLOTFILL_MIN_MATCH_SCORE")? {
            config.fuzzy.min_match_score = score;
        }

        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(None),
    }
}
