// Research dispatch — the opaque unit of automated background work
//
// The controller calls this at most once per scheduled fire; the operation is
// not assumed idempotent and may take arbitrary wall-clock time. Failures are
// reported, never transparently retried here.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progression::{ProgressionEvent, Vectors};

/// One scheduled research attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Tags log lines across the attempt
    pub attempt_id: Uuid,
    pub query: String,
    pub agent_kind: String,
}

impl DispatchRequest {
    pub fn new(query: &str, agent_kind: &str) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            query: query.to_string(),
            agent_kind: agent_kind.to_string(),
        }
    }
}

/// Knowledge-graph growth reported by a dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GraphDelta {
    pub nodes_added: u32,
    pub edges_added: u32,
    pub total_nodes: u32,
}

/// A trend surfaced by a dispatch, scored 0–100 per axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrendSignal {
    pub novelty: f64,
    pub velocity: f64,
    pub impact: f64,
}

/// What one unit of research work produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Items surfaced (articles, papers, posts)
    pub items_found: u32,
    /// Per-vector points earned by this unit of work
    pub points: Vectors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendSignal>,
    /// Updated biological-age estimate, when the work produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio_age_estimate: Option<f64>,
}

impl DispatchOutcome {
    /// Convert the outcome into progression events, work first.
    pub fn into_events(self) -> Vec<ProgressionEvent> {
        let mut events = vec![ProgressionEvent::WorkCompleted {
            points: self.points,
        }];
        if let Some(g) = self.graph {
            events.push(ProgressionEvent::GraphExpanded {
                nodes_added: g.nodes_added,
                edges_added: g.edges_added,
                total_nodes: g.total_nodes,
            });
        }
        if let Some(t) = self.trend {
            events.push(ProgressionEvent::TrendDiscovered {
                novelty: t.novelty,
                velocity: t.velocity,
                impact: t.impact,
            });
        }
        if let Some(age) = self.bio_age_estimate {
            events.push(ProgressionEvent::ScoreRecomputed {
                biological_age_estimate: age,
            });
        }
        events
    }
}

/// The `DispatchWork` collaborator contract.
#[async_trait]
pub trait ResearchDispatcher: Send + Sync {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchOutcome>;
}
