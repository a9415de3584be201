// Snapshot persistence
//
// One JSON record holds everything the subsystem needs across restarts:
// progression state, the full stage sequence, quota accounting, the autonomy
// switch, and a bounded notification history. The loader applies the
// cycle-reset rule before any scheduling decision can see a stale window —
// cold start must not skip it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::constants::NOTIFICATION_HISTORY_LIMIT;
use crate::progression::{ProgressionState, StageDefinition};
use crate::scheduling::QuotaState;

/// The persisted record. Storage-engine-agnostic in shape; stored as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub progression: ProgressionState,
    pub stages: Vec<StageDefinition>,
    pub quota: QuotaState,
    pub autonomous_mode_enabled: bool,
    /// Most recent notification lines, newest last, capped
    #[serde(default)]
    pub recent_notifications: Vec<String>,
}

impl Snapshot {
    /// Fresh snapshot: default ledger, baseline-only stage sequence.
    pub fn fresh(budget_limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            progression: ProgressionState::default(),
            stages: vec![StageDefinition::baseline()],
            quota: QuotaState::new(budget_limit, now),
            autonomous_mode_enabled: true,
            recent_notifications: Vec::new(),
        }
    }

    /// Append a notification line, dropping the oldest past the cap.
    pub fn push_notification(&mut self, line: String) {
        self.recent_notifications.push(line);
        let overflow = self
            .recent_notifications
            .len()
            .saturating_sub(NOTIFICATION_HISTORY_LIMIT);
        if overflow > 0 {
            self.recent_notifications.drain(..overflow);
        }
    }
}

/// Loads and saves the snapshot file in the data dir.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("snapshot.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or create a fresh one if none exists.
    ///
    /// An expired quota cycle is reset here, before the caller makes any
    /// scheduling decision (mirrors the scheduler's step 1).
    pub fn load_or_create(&self, budget_limit: u32, now: DateTime<Utc>) -> Result<Snapshot> {
        let mut snapshot = if self.path.exists() {
            let contents = fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read snapshot: {}", self.path.display()))?;
            let snapshot: Snapshot = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse snapshot: {}", self.path.display()))?;
            debug!(path = %self.path.display(), "Loaded snapshot");
            snapshot
        } else {
            info!("No snapshot found, starting fresh");
            Snapshot::fresh(budget_limit, now)
        };

        // Config is authoritative for the budget; quota state carries the count.
        snapshot.quota.budget_limit = budget_limit;

        if snapshot.quota.cycle_expired(now) {
            info!("Quota cycle expired while offline, resetting");
            snapshot.quota.reset_cycle(now);
        }

        Ok(snapshot)
    }

    /// Write the snapshot. Goes through a temp file + rename so a crash
    /// mid-write never leaves a truncated record.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write snapshot: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace snapshot: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Snapshot saved");
        Ok(())
    }
}
