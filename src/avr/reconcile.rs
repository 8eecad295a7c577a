//! Power-on reconciliation loop
//!
//! Right after the receiver powers on it rejects queries for most zone
//! attributes for a while. When the handler sees the power attribute go
//! from 0 to 1 it starts polling: every interval it re-queries every known
//! attribute until the receiver starts answering zone queries.
//!
//! ```text
//!   Idle ──power-on edge──▶ Polling ──tick, reconciled──▶ Reconciled
//!                            │    ▲
//!                            └────┘ tick, not reconciled: refresh_all
//! ```
//!
//! There is no retry limit. Each power-on edge starts a new generation, and
//! ticks from an older generation are ignored, so at most one loop is live.

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Delay between the power-on edge and the first refresh
pub const DEFAULT_POWERON_DELAY: Duration = Duration::from_secs(1);
/// Delay between successive refreshes while polling
pub const DEFAULT_POWERON_INTERVAL: Duration = Duration::from_secs(2);

/// Current phase of the reconciliation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePhase {
    /// No power-on edge seen (or the connection was torn down)
    Idle,
    /// Re-querying every interval until the receiver answers
    Polling,
    /// Receiver answered; loop stopped
    Reconciled,
}

impl std::fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcilePhase::Idle => write!(f, "idle"),
            ReconcilePhase::Polling => write!(f, "polling"),
            ReconcilePhase::Reconciled => write!(f, "reconciled"),
        }
    }
}

/// Timer settings for the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileTiming {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for ReconcileTiming {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_POWERON_DELAY,
            interval: DEFAULT_POWERON_INTERVAL,
        }
    }
}

/// A request to run a tick of `generation` after `after`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub generation: u64,
    pub after: Duration,
}

/// What a tick decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick belongs to a superseded loop or the loop is not polling
    Stale,
    /// Reconciliation confirmed, loop finished
    Done,
    /// Not yet reconciled: refresh everything and tick again
    Refresh(Schedule),
}

/// Loop state machine; owns no timers, the caller runs the schedules
#[derive(Debug)]
pub struct Reconciler {
    phase: ReconcilePhase,
    generation: u64,
    timing: ReconcileTiming,
    /// The current loop has sent at least one full refresh
    refreshed: bool,
}

impl Reconciler {
    pub fn new(timing: ReconcileTiming) -> Self {
        Self {
            phase: ReconcilePhase::Idle,
            generation: 0,
            timing,
            refreshed: false,
        }
    }

    pub fn phase(&self) -> ReconcilePhase {
        self.phase
    }

    /// Whether a zone reply now counts as the receiver answering
    ///
    /// Only replies that follow the loop's first full refresh qualify;
    /// anything earlier was already in flight at the power-on edge.
    pub fn awaiting_reply(&self) -> bool {
        self.phase == ReconcilePhase::Polling && self.refreshed
    }

    /// Enter polling for a new power-on edge
    pub fn start(&mut self) -> Schedule {
        self.generation += 1;
        self.phase = ReconcilePhase::Polling;
        self.refreshed = false;
        debug!(generation = self.generation, "Power-on reconciliation started");
        Schedule {
            generation: self.generation,
            after: self.timing.initial_delay,
        }
    }

    /// Advance the loop for a fired timer
    pub fn tick(&mut self, generation: u64, reconciled: bool) -> TickOutcome {
        if generation != self.generation || self.phase != ReconcilePhase::Polling {
            return TickOutcome::Stale;
        }

        if reconciled {
            self.phase = ReconcilePhase::Reconciled;
            debug!(generation, "Power-on reconciliation complete");
            return TickOutcome::Done;
        }

        self.refreshed = true;
        TickOutcome::Refresh(Schedule {
            generation,
            after: self.timing.interval,
        })
    }

    /// Abandon any running loop (connection torn down)
    pub fn cancel(&mut self) {
        if self.phase == ReconcilePhase::Polling {
            debug!(generation = self.generation, "Power-on reconciliation cancelled");
        }
        self.generation += 1;
        self.phase = ReconcilePhase::Idle;
        self.refreshed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polls_until_reconciled() {
        let mut reconciler = Reconciler::new(ReconcileTiming::default());
        assert_eq!(reconciler.phase(), ReconcilePhase::Idle);

        let first = reconciler.start();
        assert_eq!(first.after, DEFAULT_POWERON_DELAY);
        assert_eq!(reconciler.phase(), ReconcilePhase::Polling);

        match reconciler.tick(first.generation, false) {
            TickOutcome::Refresh(next) => {
                assert_eq!(next.generation, first.generation);
                assert_eq!(next.after, DEFAULT_POWERON_INTERVAL);
            }
            other => panic!("expected refresh, got {:?}", other),
        }

        assert_eq!(reconciler.tick(first.generation, true), TickOutcome::Done);
        assert_eq!(reconciler.phase(), ReconcilePhase::Reconciled);

        // Loop is finished, further ticks do nothing
        assert_eq!(reconciler.tick(first.generation, false), TickOutcome::Stale);
    }

    #[test]
    fn test_replies_count_only_after_first_refresh() {
        let mut reconciler = Reconciler::new(ReconcileTiming::default());
        assert!(!reconciler.awaiting_reply());

        let first = reconciler.start();
        assert!(!reconciler.awaiting_reply());

        // A flag set before any refresh does not finish the loop
        assert!(matches!(
            reconciler.tick(first.generation, false),
            TickOutcome::Refresh(_)
        ));
        assert!(reconciler.awaiting_reply());

        // A new edge starts over
        reconciler.start();
        assert!(!reconciler.awaiting_reply());
    }

    #[test]
    fn test_new_edge_supersedes_old_loop() {
        let mut reconciler = Reconciler::new(ReconcileTiming::default());
        let old = reconciler.start();
        let new = reconciler.start();
        assert_ne!(old.generation, new.generation);

        assert_eq!(reconciler.tick(old.generation, false), TickOutcome::Stale);
        assert!(matches!(
            reconciler.tick(new.generation, false),
            TickOutcome::Refresh(_)
        ));
    }

    #[test]
    fn test_cancel_stops_loop() {
        let mut reconciler = Reconciler::new(ReconcileTiming::default());
        let schedule = reconciler.start();
        reconciler.cancel();
        assert_eq!(reconciler.phase(), ReconcilePhase::Idle);
        assert_eq!(reconciler.tick(schedule.generation, false), TickOutcome::Stale);
    }
}
