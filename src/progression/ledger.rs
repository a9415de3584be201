// Progression ledger data structures
//
// Vectors, milestones, stage definitions and the progression state record.
// All mutation goes through the engine's event application; everything here
// is plain data plus the invariant-preserving helpers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The three progression axes. Always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vectors {
    /// Biological/intervention-driven progress
    #[serde(default)]
    pub genetic: f64,
    /// Knowledge/information-driven progress
    #[serde(default)]
    pub memic: f64,
    /// Derived axis — recomputed from the longevity score and memic, never incremented
    #[serde(default)]
    pub cognitive: f64,
}

impl Vectors {
    pub fn new(genetic: f64, memic: f64, cognitive: f64) -> Self {
        Self {
            genetic: genetic.max(0.0),
            memic: memic.max(0.0),
            cognitive: cognitive.max(0.0),
        }
    }

    /// Add to the genetic axis, clamping at zero.
    pub fn credit_genetic(&mut self, delta: f64) {
        self.genetic = (self.genetic + delta).max(0.0);
    }

    /// Add to the memic axis, clamping at zero.
    pub fn credit_memic(&mut self, delta: f64) {
        self.memic = (self.memic + delta).max(0.0);
    }

    /// True when every axis meets or exceeds the given thresholds.
    ///
    /// Stage advancement requires ALL thresholds to be met — a huge surplus
    /// on one axis never compensates for a shortfall on another.
    pub fn meets(&self, thresholds: &Vectors) -> bool {
        self.genetic >= thresholds.genetic
            && self.memic >= thresholds.memic
            && self.cognitive >= thresholds.cognitive
    }
}

/// A one-way achievement flag. Once unlocked, never reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub description: String,
    pub reward_points: u32,
    pub unlocked: bool,
}

impl Milestone {
    fn new(id: &str, name: &str, description: &str, reward_points: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            reward_points,
            unlocked: false,
        }
    }
}

/// Milestone ids referenced by the engine's unlock predicates.
pub mod milestone_ids {
    pub const FIRST_RESEARCH: &str = "first_research";
    pub const GRAPH_100_NODES: &str = "graph_100_nodes";
    pub const FIRST_TREND: &str = "first_trend";
    pub const VIRAL_TREND: &str = "viral_trend";
    pub const FIRST_INTERVENTION: &str = "first_intervention";
    pub const RADICAL_INTERVENTION: &str = "radical_intervention";
    pub const STAGE_ASCENSION: &str = "stage_ascension";
}

/// The built-in milestone catalog, all locked.
pub fn default_milestones() -> HashMap<String, Milestone> {
    use milestone_ids::*;

    let catalog = [
        Milestone::new(
            FIRST_RESEARCH,
            "First Light",
            "Completed the first autonomous research run",
            50,
        ),
        Milestone::new(
            GRAPH_100_NODES,
            "Cartographer",
            "Knowledge graph grew past 100 nodes",
            100,
        ),
        Milestone::new(
            FIRST_TREND,
            "Signal Finder",
            "Discovered the first longevity trend",
            50,
        ),
        Milestone::new(
            VIRAL_TREND,
            "Zeitgeist",
            "Caught a trend while its velocity was still climbing",
            150,
        ),
        Milestone::new(
            FIRST_INTERVENTION,
            "First Step",
            "Applied the first longevity intervention",
            50,
        ),
        Milestone::new(
            RADICAL_INTERVENTION,
            "No Half Measures",
            "Applied a radical intervention",
            200,
        ),
        Milestone::new(
            STAGE_ASCENSION,
            "Ascendant",
            "Advanced beyond the baseline stage",
            250,
        ),
    ];

    catalog
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect()
}

/// A named tier in the ordered, append-only stage sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDefinition {
    pub name: String,
    pub description: String,
    /// Human-readable criteria, in presentation order
    pub criteria: Vec<String>,
    pub thresholds: Vectors,
}

impl StageDefinition {
    /// The baseline stage: first element of every stage sequence, thresholds zero.
    pub fn baseline() -> Self {
        Self {
            name: "Baseline Human".to_string(),
            description: "Unmodified starting point. Every journey begins here.".to_string(),
            criteria: vec!["Exist".to_string()],
            thresholds: Vectors::default(),
        }
    }
}

/// The progression state owned by the engine.
///
/// Created from `Default` on first run or restored from a snapshot; mutated
/// only through `ProgressionEngine::apply_event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionState {
    pub current_stage: String,
    pub vectors: Vectors,
    pub milestones: HashMap<String, Milestone>,
    /// Long-run score component, replaced wholesale by `ScoreRecomputed` events
    #[serde(default)]
    pub longevity_score: f64,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            current_stage: StageDefinition::baseline().name,
            vectors: Vectors::default(),
            milestones: default_milestones(),
            longevity_score: 0.0,
        }
    }
}

impl ProgressionState {
    /// Total reward points from unlocked milestones.
    pub fn reward_points(&self) -> u32 {
        self.milestones
            .values()
            .filter(|m| m.unlocked)
            .map(|m| m.reward_points)
            .sum()
    }

    /// Count of unlocked milestones.
    pub fn unlocked_count(&self) -> usize {
        self.milestones.values().filter(|m| m.unlocked).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_clamp_at_zero() {
        let mut v = Vectors::default();
        v.credit_genetic(-10.0);
        v.credit_memic(-5.0);
        assert_eq!(v.genetic, 0.0);
        assert_eq!(v.memic, 0.0);

        v.credit_memic(30.0);
        v.credit_memic(-100.0);
        assert_eq!(v.memic, 0.0);
    }

    #[test]
    fn test_meets_requires_all_axes() {
        let thresholds = Vectors::new(500.0, 500.0, 1000.0);
        // Massive memic surplus, genetic at zero
        let v = Vectors::new(0.0, 3000.0, 1000.0);
        assert!(!v.meets(&thresholds));

        let v = Vectors::new(500.0, 500.0, 1000.0);
        assert!(v.meets(&thresholds));
    }

    #[test]
    fn test_meets_zero_thresholds_always_met() {
        assert!(Vectors::default().meets(&Vectors::default()));
    }

    #[test]
    fn test_default_milestones_all_locked() {
        let milestones = default_milestones();
        assert_eq!(milestones.len(), 7);
        assert!(milestones.values().all(|m| !m.unlocked));
        assert!(milestones.contains_key(milestone_ids::STAGE_ASCENSION));
    }

    #[test]
    fn test_baseline_stage_thresholds_zero() {
        let baseline = StageDefinition::baseline();
        assert_eq!(baseline.thresholds, Vectors::default());
    }

    #[test]
    fn test_default_state_starts_at_baseline() {
        let state = ProgressionState::default();
        assert_eq!(state.current_stage, StageDefinition::baseline().name);
        assert_eq!(state.unlocked_count(), 0);
        assert_eq!(state.reward_points(), 0);
    }

    #[test]
    fn test_reward_points_sum_unlocked_only() {
        let mut state = ProgressionState::default();
        state
            .milestones
            .get_mut(milestone_ids::FIRST_RESEARCH)
            .unwrap()
            .unlocked = true;
        state
            .milestones
            .get_mut(milestone_ids::VIRAL_TREND)
            .unwrap()
            .unlocked = true;
        assert_eq!(state.reward_points(), 200);
        assert_eq!(state.unlocked_count(), 2);
    }

    #[test]
    fn test_progression_state_serde_roundtrip() {
        let state = ProgressionState::default();
        let json = serde_json::to_string(&state).unwrap();
        let decoded: ProgressionState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.current_stage, state.current_stage);
        assert_eq!(decoded.milestones.len(), state.milestones.len());
    }
}
