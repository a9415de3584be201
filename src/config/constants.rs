// Project-wide constants
//
// Centralised here so quota limits and other magic values have one source
// of truth. Import via `use crate::config::constants::*;`.

/// Default automated-dispatch budget per 24-hour cycle.
pub const DEFAULT_DAILY_BUDGET: u32 = 10;

/// Default floor between consecutive dispatches.
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 60;

/// Hard floor for the configurable minimum interval. Protects rate-limited
/// external search/LLM dependencies whatever the config says.
pub const MIN_INTERVAL_FLOOR_SECS: u64 = 60;

/// Default warm-up delay before the first dispatch of a cycle.
pub const DEFAULT_WARMUP_SECS: u64 = 10;

/// Hard ceiling for the configurable warm-up delay — a freshly started
/// system must produce visible activity quickly.
pub const WARMUP_CEILING_SECS: u64 = 30;

/// How many notification lines the snapshot retains.
pub const NOTIFICATION_HISTORY_LIMIT: usize = 50;

/// Data directory name under the home directory.
pub const DATA_DIR_NAME: &str = ".aeon";

/// Default research topic when the config does not set one.
pub const DEFAULT_TOPIC: &str = "longevity interventions";

/// Default agent kind passed to the dispatcher.
pub const DEFAULT_AGENT_KIND: &str = "researcher";
