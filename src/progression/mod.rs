// Progression subsystem
//
// The ledger (vectors, milestones, stages), the event-application engine,
// and the stage oracle seam.

pub mod engine;
pub mod ledger;
pub mod oracle;

pub use engine::{InterventionKind, Notification, ProgressionEngine, ProgressionEvent};
pub use ledger::{
    default_milestones, milestone_ids, Milestone, ProgressionState, StageDefinition, Vectors,
};
pub use oracle::{StageOracle, StageOracleGateway, StageRequest};
