// Autonomous controller
//
// Root of the subsystem: owns the progression engine and quota state, wires
// timer fires to the research dispatcher, feeds results into the engine,
// and re-derives the schedule after every state change. At most one
// automated dispatch is in flight at any time — the timer that triggered it
// is already consumed and nothing re-arms until the result is known.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::constants::NOTIFICATION_HISTORY_LIMIT;
use crate::config::AutonomyConfig;
use crate::dispatch::{DispatchRequest, ResearchDispatcher};
use crate::persistence::{Snapshot, SnapshotStore};
use crate::progression::{ProgressionEngine, ProgressionEvent, StageOracle, StageOracleGateway};
use crate::scheduling::{next_decision, ArmedTimer, QuotaState, ScheduleDecision, TimerFired};

pub struct AutonomousController {
    autonomy: AutonomyConfig,
    engine: ProgressionEngine,
    quota: QuotaState,
    enabled: bool,
    recent: Vec<String>,
    dispatcher: Arc<dyn ResearchDispatcher>,
    oracle: StageOracleGateway,
    store: SnapshotStore,
    fire_tx: mpsc::Sender<TimerFired>,
    fire_rx: mpsc::Receiver<TimerFired>,
    timer: Option<ArmedTimer>,
    generation: u64,
}

impl AutonomousController {
    /// Construct from a loaded snapshot. Configuration errors are fatal here —
    /// a controller is never built, and no timer armed, from a bad config.
    pub fn new(
        autonomy: AutonomyConfig,
        snapshot: Snapshot,
        dispatcher: Arc<dyn ResearchDispatcher>,
        oracle: Arc<dyn StageOracle>,
        store: SnapshotStore,
    ) -> Result<Self> {
        autonomy.validate()?;

        let engine = ProgressionEngine::new(snapshot.progression, snapshot.stages)?;
        let mut quota = snapshot.quota;
        quota.budget_limit = autonomy.daily_budget;
        let enabled = snapshot.autonomous_mode_enabled && autonomy.enabled;

        let (fire_tx, fire_rx) = mpsc::channel(8);

        Ok(Self {
            autonomy,
            engine,
            quota,
            enabled,
            recent: snapshot.recent_notifications,
            dispatcher,
            oracle: StageOracleGateway::new(oracle),
            store,
            fire_tx,
            fire_rx,
            timer: None,
            generation: 0,
        })
    }

    pub fn quota(&self) -> &QuotaState {
        &self.quota
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Assemble the persisted record from current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            progression: self.engine.state().clone(),
            stages: self.engine.stages().to_vec(),
            quota: self.quota.clone(),
            autonomous_mode_enabled: self.enabled,
            recent_notifications: self.recent.clone(),
        }
    }

    /// Run until the shutdown future resolves (the binary passes Ctrl-C).
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.rearm(Utc::now());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                maybe_fire = self.fire_rx.recv() => {
                    // Sender side lives on self; recv only fails at teardown.
                    let Some(fired) = maybe_fire else { break };
                    if fired.generation != self.generation {
                        debug!(got = fired.generation, want = self.generation, "Discarding stale timer fire");
                        continue;
                    }
                    self.handle_fire(Utc::now()).await;
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.teardown();
        Ok(())
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// One scheduled fire: dispatch, account, progress, re-arm.
    ///
    /// Quota is debited only after a confirmed success; a failure leaves it
    /// untouched and still recomputes the schedule so the next attempt comes
    /// promptly rather than after a full interval.
    pub async fn handle_fire(&mut self, now: DateTime<Utc>) {
        self.disarm();

        if !self.enabled {
            return;
        }

        // The window may have rolled over while the timer slept.
        if self.quota.cycle_expired(now) {
            self.quota.reset_cycle(now);
            self.persist();
            self.rearm(now);
            return;
        }

        // A dormant timer can fire just shy of the boundary; go back to sleep.
        if self.quota.calls_made >= self.quota.budget_limit {
            self.rearm(now);
            return;
        }

        let request = DispatchRequest::new(&self.autonomy.topic, &self.autonomy.agent_kind);
        info!(
            attempt = %request.attempt_id,
            calls_made = self.quota.calls_made,
            budget = self.quota.budget_limit,
            "Dispatching research work"
        );

        match self.dispatcher.dispatch(&request).await {
            Ok(outcome) => {
                self.quota.calls_made += 1;
                info!(
                    attempt = %request.attempt_id,
                    items = outcome.items_found,
                    "Dispatch succeeded"
                );
                self.apply_events(outcome.into_events()).await;
            }
            Err(e) => {
                warn!(attempt = %request.attempt_id, "Dispatch failed: {:#}", e);
                self.push_recent(format!("Research dispatch failed: {:#}", e));
            }
        }

        self.persist();
        self.rearm(Utc::now());
    }

    /// Feed events from outside the dispatch path (e.g. a user-applied
    /// intervention). Any ledger change re-derives the schedule.
    pub async fn ingest_event(&mut self, event: ProgressionEvent) {
        self.apply_events(vec![event]).await;
        self.persist();
        self.rearm(Utc::now());
    }

    /// Apply events to the engine, then give the frontier a chance to extend
    /// the stage sequence. The single-flight guard makes re-entry a no-op.
    async fn apply_events(&mut self, events: Vec<ProgressionEvent>) {
        let mut notes = Vec::new();
        for event in events {
            notes.extend(self.engine.apply_event(event));
        }

        if let Some((request, note)) = self.engine.frontier_request(&self.autonomy.topic) {
            notes.push(note);
            let result = self.oracle.request_next_stage(&request).await;
            notes.extend(self.engine.complete_oracle(result));
        }

        for note in notes {
            let line = note.describe();
            info!("{}", line);
            self.push_recent(line);
        }
    }

    /// Cancel the outstanding timer and arm exactly one for the next decision.
    ///
    /// Every quota or ledger change routes through here — the scheduler keeps
    /// no memory of a previously computed delay.
    fn rearm(&mut self, now: DateTime<Utc>) {
        self.disarm();

        if !self.enabled {
            debug!("Autonomous mode disabled, scheduler disarmed");
            return;
        }

        let mut decision = next_decision(
            &self.quota,
            now,
            self.autonomy.min_interval(),
            self.autonomy.warmup_delay(),
        );
        if decision == ScheduleDecision::CycleExpired {
            self.quota.reset_cycle(now);
            decision = next_decision(
                &self.quota,
                now,
                self.autonomy.min_interval(),
                self.autonomy.warmup_delay(),
            );
        }

        let delay = match decision {
            ScheduleDecision::FireNow => Duration::ZERO,
            ScheduleDecision::WaitFor(d) => d,
            // Unreachable after the reset above; arm a short retry regardless.
            ScheduleDecision::CycleExpired => Duration::from_secs(1),
        };

        self.generation += 1;
        self.timer = Some(ArmedTimer::arm(delay, self.generation, self.fire_tx.clone()));
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Cancel the timer and persist. No dispatch fires after this.
    fn teardown(&mut self) {
        self.disarm();
        self.generation += 1; // any in-flight fire is now stale
        self.persist();
        info!("Controller stopped");
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            warn!("Failed to save snapshot: {:#}", e);
        }
    }

    fn push_recent(&mut self, line: String) {
        self.recent.push(line);
        let overflow = self.recent.len().saturating_sub(NOTIFICATION_HISTORY_LIMIT);
        if overflow > 0 {
            self.recent.drain(..overflow);
        }
    }
}
