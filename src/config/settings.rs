// Configuration structs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::*;

/// Autonomy configuration: the scheduler's entire configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyConfig {
    /// Master switch. When false the scheduler is disarmed and no timer exists.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Automated dispatches allowed per 24-hour cycle. Must be positive.
    #[serde(default = "default_daily_budget")]
    pub daily_budget: u32,

    /// Floor between consecutive dispatches, seconds. Hard floor 60.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Delay before the first dispatch of a cycle, seconds. Hard ceiling 30.
    #[serde(default = "default_warmup_secs")]
    pub warmup_delay_secs: u64,

    /// Research topic dispatched to the agent
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Agent kind passed to the dispatcher
    #[serde(default = "default_agent_kind")]
    pub agent_kind: String,
}

fn default_true() -> bool {
    true
}

fn default_daily_budget() -> u32 {
    DEFAULT_DAILY_BUDGET
}

fn default_min_interval_secs() -> u64 {
    DEFAULT_MIN_INTERVAL_SECS
}

fn default_warmup_secs() -> u64 {
    DEFAULT_WARMUP_SECS
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_agent_kind() -> String {
    DEFAULT_AGENT_KIND.to_string()
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_budget: DEFAULT_DAILY_BUDGET,
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            warmup_delay_secs: DEFAULT_WARMUP_SECS,
            topic: DEFAULT_TOPIC.to_string(),
            agent_kind: DEFAULT_AGENT_KIND.to_string(),
        }
    }
}

impl AutonomyConfig {
    /// Validate configuration. Fatal at load time — a controller is never
    /// constructed, and no timer ever armed, from a degenerate config.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.daily_budget == 0 {
            anyhow::bail!("autonomy.daily_budget must be positive");
        }
        if self.min_interval_secs < MIN_INTERVAL_FLOOR_SECS {
            anyhow::bail!(
                "autonomy.min_interval_secs must be at least {} (got {})",
                MIN_INTERVAL_FLOOR_SECS,
                self.min_interval_secs
            );
        }
        if self.warmup_delay_secs > WARMUP_CEILING_SECS {
            anyhow::bail!(
                "autonomy.warmup_delay_secs must be at most {} (got {})",
                WARMUP_CEILING_SECS,
                self.warmup_delay_secs
            );
        }
        if self.topic.trim().is_empty() {
            anyhow::bail!("autonomy.topic must not be empty");
        }
        Ok(())
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn warmup_delay(&self) -> Duration {
        Duration::from_secs(self.warmup_delay_secs)
    }
}

/// Top-level config file layout (`config.toml` in the data dir).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub autonomy: AutonomyConfig,
}
