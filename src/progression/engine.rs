// Progression engine — applies events to the ledger
//
// The engine owns the progression state and the ordered stage sequence. Event
// application is a pure synchronous transformation returning the notifications
// it produced; the only asynchronous edge is the oracle request, which the
// engine hands to the caller as a `StageRequest` guarded by the single-flight
// flag. External call failures never reach this code — the controller converts
// them to `complete_oracle(Err(..))`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ledger::{milestone_ids, ProgressionState, StageDefinition, Vectors};
use super::oracle::StageRequest;

/// Memic points per knowledge-graph node added.
const GRAPH_NODE_WEIGHT: f64 = 2.0;
/// Memic points per knowledge-graph edge added.
const GRAPH_EDGE_WEIGHT: f64 = 1.0;
/// Knowledge-graph size that unlocks the cartographer milestone.
const GRAPH_MILESTONE_NODES: u32 = 100;
/// Base memic gain for any discovered trend.
const TREND_BASE_GAIN: f64 = 10.0;
/// Trend velocity above which the viral-trend milestone unlocks.
const VIRAL_VELOCITY_THRESHOLD: f64 = 80.0;
/// Genetic points per unit of intervention sophistication.
const INTERVENTION_BASE_RATE: f64 = 25.0;

/// How an intervention was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    Incremental,
    Radical,
}

/// The closed set of events the engine can apply.
///
/// Adding a variant is a compile-time-checked change: `apply_event` matches
/// exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressionEvent {
    /// A unit of automated research work completed
    WorkCompleted { points: Vectors },
    /// The knowledge graph grew
    GraphExpanded {
        nodes_added: u32,
        edges_added: u32,
        total_nodes: u32,
    },
    /// A longevity trend was discovered
    TrendDiscovered {
        novelty: f64,
        velocity: f64,
        impact: f64,
    },
    /// The user applied an intervention
    InterventionApplied {
        sophistication: f64,
        kind: InterventionKind,
    },
    /// The long-run score component was re-estimated
    ScoreRecomputed { biological_age_estimate: f64 },
}

/// Notifications emitted by event application and oracle completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    MilestoneUnlocked {
        id: String,
        name: String,
        reward_points: u32,
    },
    StageAdvanced {
        from: String,
        to: String,
    },
    OracleInvoked {
        frontier_stage: String,
    },
    OracleFailed {
        reason: String,
    },
}

impl Notification {
    /// Human-readable one-liner, used for logs and the snapshot history.
    pub fn describe(&self) -> String {
        match self {
            Self::MilestoneUnlocked {
                name,
                reward_points,
                ..
            } => format!("Milestone unlocked: {} (+{} pts)", name, reward_points),
            Self::StageAdvanced { from, to } => format!("Stage advanced: {} -> {}", from, to),
            Self::OracleInvoked { frontier_stage } => {
                format!("Requesting stage beyond {}", frontier_stage)
            }
            Self::OracleFailed { reason } => format!("Stage request failed: {}", reason),
        }
    }
}

/// Applies events to the ledger, evaluates milestone and stage predicates,
/// and tracks the single-flight oracle guard.
pub struct ProgressionEngine {
    state: ProgressionState,
    stages: Vec<StageDefinition>,
    oracle_inflight: bool,
}

impl ProgressionEngine {
    /// Build an engine from restored state. The stage sequence must be
    /// non-empty and contain the current stage.
    pub fn new(state: ProgressionState, stages: Vec<StageDefinition>) -> Result<Self> {
        if stages.is_empty() {
            anyhow::bail!("Stage sequence must contain at least the baseline stage");
        }
        if !stages.iter().any(|s| s.name == state.current_stage) {
            anyhow::bail!(
                "Current stage '{}' is not in the stage sequence",
                state.current_stage
            );
        }
        Ok(Self {
            state,
            stages,
            oracle_inflight: false,
        })
    }

    /// Fresh engine: default ledger, baseline-only stage sequence.
    pub fn fresh() -> Self {
        Self {
            state: ProgressionState::default(),
            stages: vec![StageDefinition::baseline()],
            oracle_inflight: false,
        }
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn oracle_inflight(&self) -> bool {
        self.oracle_inflight
    }

    /// Index of the current stage in the sequence.
    fn current_index(&self) -> usize {
        self.stages
            .iter()
            .position(|s| s.name == self.state.current_stage)
            .unwrap_or(0)
    }

    /// True when the current stage is the last known one.
    pub fn at_frontier(&self) -> bool {
        self.current_index() + 1 == self.stages.len()
    }

    /// Apply one event atomically, returning emitted notifications.
    pub fn apply_event(&mut self, event: ProgressionEvent) -> Vec<Notification> {
        let mut notes = Vec::new();

        match event {
            ProgressionEvent::WorkCompleted { points } => {
                self.state.vectors.credit_genetic(points.genetic);
                self.state.vectors.credit_memic(points.memic);
                self.unlock(milestone_ids::FIRST_RESEARCH, &mut notes);
            }
            ProgressionEvent::GraphExpanded {
                nodes_added,
                edges_added,
                total_nodes,
            } => {
                let gain = f64::from(nodes_added) * GRAPH_NODE_WEIGHT
                    + f64::from(edges_added) * GRAPH_EDGE_WEIGHT;
                self.state.vectors.credit_memic(gain);
                if total_nodes >= GRAPH_MILESTONE_NODES {
                    self.unlock(milestone_ids::GRAPH_100_NODES, &mut notes);
                }
            }
            ProgressionEvent::TrendDiscovered {
                novelty,
                velocity,
                impact,
            } => {
                let gain = TREND_BASE_GAIN + 0.2 * novelty + 0.3 * velocity + 0.5 * impact;
                self.state.vectors.credit_memic(gain);
                self.unlock(milestone_ids::FIRST_TREND, &mut notes);
                if velocity > VIRAL_VELOCITY_THRESHOLD {
                    self.unlock(milestone_ids::VIRAL_TREND, &mut notes);
                }
            }
            ProgressionEvent::InterventionApplied {
                sophistication,
                kind,
            } => {
                self.state
                    .vectors
                    .credit_genetic(INTERVENTION_BASE_RATE * sophistication);
                self.unlock(milestone_ids::FIRST_INTERVENTION, &mut notes);
                if kind == InterventionKind::Radical {
                    self.unlock(milestone_ids::RADICAL_INTERVENTION, &mut notes);
                }
            }
            ProgressionEvent::ScoreRecomputed {
                biological_age_estimate,
            } => {
                self.state.longevity_score =
                    ((100.0 - biological_age_estimate) * 10.0).max(0.0);
            }
        }

        // Cognitive is derived, never incremented: recompute after every event.
        self.recompute_cognitive();

        if let Some(note) = self.try_advance_stage() {
            notes.push(note);
            if self.current_index() >= 1 {
                self.unlock(milestone_ids::STAGE_ASCENSION, &mut notes);
            }
        }

        notes
    }

    /// cognitive = round(longevity_score * (1 + ln(1 + memic)))
    fn recompute_cognitive(&mut self) {
        let memic = self.state.vectors.memic;
        self.state.vectors.cognitive =
            (self.state.longevity_score * (1.0 + (1.0 + memic).ln()))
                .round()
                .max(0.0);
    }

    /// Advance to the next stage when all its thresholds are met.
    /// One step per event application; index never decreases.
    fn try_advance_stage(&mut self) -> Option<Notification> {
        let i = self.current_index();
        let next = self.stages.get(i + 1)?;
        if !self.state.vectors.meets(&next.thresholds) {
            return None;
        }
        let from = self.state.current_stage.clone();
        let to = next.name.clone();
        info!(from = %from, to = %to, "Stage advanced");
        self.state.current_stage = to.clone();
        Some(Notification::StageAdvanced { from, to })
    }

    /// Unlock a milestone if it exists and is still locked.
    /// Re-unlocking is a no-op — the flag transitions false->true at most once.
    fn unlock(&mut self, id: &str, notes: &mut Vec<Notification>) {
        if let Some(m) = self.state.milestones.get_mut(id) {
            if !m.unlocked {
                m.unlocked = true;
                info!(milestone = %m.name, "Milestone unlocked");
                notes.push(Notification::MilestoneUnlocked {
                    id: m.id.clone(),
                    name: m.name.clone(),
                    reward_points: m.reward_points,
                });
            }
        }
    }

    /// Frontier handling: when at the last known stage and no oracle request
    /// is outstanding, set the guard and return the request to issue.
    ///
    /// While the guard is set this is a no-op, whatever events arrive.
    pub fn frontier_request(&mut self, topic: &str) -> Option<(StageRequest, Notification)> {
        if !self.at_frontier() || self.oracle_inflight {
            return None;
        }
        self.oracle_inflight = true;
        debug!(stage = %self.state.current_stage, "At frontier, issuing oracle request");

        let request = StageRequest {
            snapshot: self.state.clone(),
            known_stages: self.stages.iter().map(|s| s.name.clone()).collect(),
            topic: topic.to_string(),
            trajectory: self.trajectory_summary(),
        };
        let note = Notification::OracleInvoked {
            frontier_stage: self.state.current_stage.clone(),
        };
        Some((request, note))
    }

    /// Complete an outstanding oracle request. Clears the guard either way.
    ///
    /// On success the stage is appended at the tail and the current stage
    /// advances to it immediately — its thresholds were derived from the
    /// requesting state, so they are already satisfied.
    pub fn complete_oracle(
        &mut self,
        result: Result<StageDefinition>,
    ) -> Vec<Notification> {
        self.oracle_inflight = false;
        match result {
            Ok(stage) => {
                let from = self.state.current_stage.clone();
                let to = stage.name.clone();
                self.stages.push(stage);
                self.state.current_stage = to.clone();
                info!(from = %from, to = %to, "New stage appended and entered");

                let mut notes = vec![Notification::StageAdvanced { from, to }];
                if self.current_index() >= 1 {
                    self.unlock(milestone_ids::STAGE_ASCENSION, &mut notes);
                }
                notes
            }
            Err(e) => vec![Notification::OracleFailed {
                reason: format!("{:#}", e),
            }],
        }
    }

    /// Short trajectory description shipped as oracle context.
    fn trajectory_summary(&self) -> String {
        format!(
            "genetic={:.0} memic={:.0} cognitive={:.0}; {} of {} milestones unlocked; score={:.0}",
            self.state.vectors.genetic,
            self.state.vectors.memic,
            self.state.vectors.cognitive,
            self.state.unlocked_count(),
            self.state.milestones.len(),
            self.state.longevity_score,
        )
    }
}
