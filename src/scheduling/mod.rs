// Quota scheduling subsystem
//
// `quota` computes when the next automated dispatch should fire;
// `timer` owns the single cancellable timer that delivers it.

pub mod quota;
pub mod timer;

pub use quota::{cycle, next_decision, QuotaState, ScheduleDecision, CYCLE_MS};
pub use timer::{ArmedTimer, TimerFired};
