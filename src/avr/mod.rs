//! Anthem AVR protocol handler
//!
//! [`Avr`] is the synchronous core: it owns the device state mirror, the
//! frame decoder and the write sink, interprets responses and exposes typed
//! properties. It never sleeps or spawns. Work that must happen later
//! (change notifications, reconciliation timers) is queued as [`Action`]s
//! that the owner drains with [`Avr::take_actions`].
//!
//! [`AvrActor`] runs the core on a single tokio task and [`AvrHandle`] is
//! the cloneable async API on top of it.

mod actor;
mod commands;
mod handle;
mod interpret;
mod properties;
pub mod reconcile;
pub mod volume;

use std::time::Duration;
use tracing::{info, warn};

use crate::protocol::{encoder, registry, FrameDecoder, WriteSink};
use crate::state::{DeviceState, StateSnapshot};

pub use actor::AvrActor;
pub use commands::{AvrCommand, AvrStatus, ConnectionLostFn, SetRequest, UpdateFn};
pub use handle::AvrHandle;
pub use interpret::InterpretResult;
pub use reconcile::{ReconcilePhase, ReconcileTiming};

use reconcile::{Reconciler, Schedule, TickOutcome};

/// Deferred work produced by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A response changed state; deliver the raw message to subscribers
    Notify(String),
    /// Run [`Avr::reconcile_tick`] for `generation` after `after`
    ScheduleReconcile { generation: u64, after: Duration },
}

/// Protocol handler core for one receiver connection
pub struct Avr {
    state: DeviceState,
    decoder: FrameDecoder,
    sink: Option<Box<dyn WriteSink>>,
    reconciler: Reconciler,
    actions: Vec<Action>,
}

impl Avr {
    /// Create a handler with state seeded to defaults and no transport
    pub fn new(timing: ReconcileTiming) -> Self {
        Self {
            state: DeviceState::new(),
            decoder: FrameDecoder::new(),
            sink: None,
            reconciler: Reconciler::new(timing),
            actions: Vec::new(),
        }
    }

    // =========================================================================
    // Transport signals
    // =========================================================================

    /// Attach a transport and ask for everything answerable in standby
    pub fn connection_made(&mut self, sink: Box<dyn WriteSink>) {
        info!("Connection established to AVR");
        self.sink = Some(sink);
        self.refresh_core();
    }

    /// Detach the transport
    ///
    /// Drops any half-received message and stops a running power-on loop.
    pub fn connection_lost(&mut self, reason: Option<&str>) {
        match reason {
            None => warn!("eof from receiver?"),
            Some(reason) => warn!("Lost connection to receiver: {}", reason),
        }
        self.sink = None;
        self.decoder.clear();
        self.reconciler.cancel();
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Decode a received chunk and interpret every complete message in it
    pub fn data_received(&mut self, chunk: &[u8]) -> Vec<InterpretResult> {
        tracing::debug!("Received {} bytes from AVR", chunk.len());
        self.decoder
            .feed(chunk)
            .iter()
            .map(|message| self.interpret(message))
            .collect()
    }

    // =========================================================================
    // Queries and commands
    // =========================================================================

    /// Query the attributes that exist regardless of power state
    pub fn refresh_core(&mut self) {
        info!("Sending out mass query for all attributes");
        for key in registry::core_keys() {
            self.query(key);
        }
    }

    /// Query every known attribute
    pub fn refresh_all(&mut self) {
        info!("refresh_all");
        for key in registry::keys() {
            self.query(key);
        }
    }

    /// Ask the receiver for the current value of an attribute
    pub fn query(&mut self, key: &str) {
        let frame = encoder::encode_query(key);
        self.send(&frame);
    }

    /// Send a raw command such as `P1V-50`
    pub fn command(&mut self, raw: &str) {
        let frame = encoder::encode_command(raw);
        self.send(&frame);
    }

    fn send(&mut self, frame: &str) {
        encoder::send(self.sink.as_deref_mut(), frame);
    }

    // =========================================================================
    // Power-on reconciliation
    // =========================================================================

    pub(crate) fn start_reconcile(&mut self) {
        let Schedule { generation, after } = self.reconciler.start();
        self.actions.push(Action::ScheduleReconcile { generation, after });
    }

    /// Run one step of the power-on loop
    ///
    /// Called when a timer scheduled through
    /// [`Action::ScheduleReconcile`] fires.
    pub fn reconcile_tick(&mut self, generation: u64) {
        match self.reconciler.tick(generation, self.state.is_reconciled()) {
            TickOutcome::Stale => {}
            TickOutcome::Done => info!("Power-on refresh successful"),
            TickOutcome::Refresh(Schedule { generation, after }) => {
                self.refresh_all();
                self.actions.push(Action::ScheduleReconcile { generation, after });
            }
        }
    }

    pub fn reconcile_phase(&self) -> ReconcilePhase {
        self.reconciler.phase()
    }

    // =========================================================================
    // State access
    // =========================================================================

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Record a discovered input name
    pub fn set_input_label(&mut self, number: u8, name: &str) -> bool {
        self.state.set_input_name(number, name)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// Drain deferred work in the order it was produced
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }
}

impl Default for Avr {
    fn default() -> Self {
        Self::new(ReconcileTiming::default())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::Result;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Sink that records every frame as a string
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub frames: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSink {
        pub fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.frames.lock())
        }
    }

    impl WriteSink for RecordingSink {
        fn write(&mut self, frame: &[u8]) -> Result<()> {
            self.frames
                .lock()
                .push(String::from_utf8_lossy(frame).into_owned());
            Ok(())
        }
    }

    /// Connected core plus the sink it writes to, with the connect traffic cleared
    pub fn connected() -> (Avr, RecordingSink) {
        let sink = RecordingSink::default();
        let mut avr = Avr::default();
        avr.connection_made(Box::new(sink.clone()));
        sink.take();
        (avr, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_connection_made_queries_core_attributes() {
        let sink = RecordingSink::default();
        let mut avr = Avr::default();
        avr.connection_made(Box::new(sink.clone()));
        assert!(avr.is_connected());
        assert_eq!(sink.take(), vec!["P1P?;"]);
    }

    #[test]
    fn test_refresh_all_queries_every_attribute() {
        let (mut avr, sink) = connected();
        avr.refresh_all();
        assert_eq!(sink.take(), vec!["P1P?;", "P1V?;", "P1S?;", "P1M?;"]);
    }

    #[test]
    fn test_commands_without_transport_are_dropped() {
        let mut avr = Avr::default();
        avr.command("P1M1");
        avr.query("P1P");
        assert!(!avr.is_connected());
        assert!(avr.take_actions().is_empty());
    }

    #[test]
    fn test_end_to_end_chunk() {
        let (mut avr, _sink) = connected();
        let results = avr.data_received(b"P1P1;P1M0;");

        assert_eq!(results.len(), 2);
        assert_eq!(avr.state().raw(registry::POWER), "1");
        assert_eq!(avr.state().raw(registry::MUTE), "0");
        assert!(avr.power());
        assert!(!avr.mute());

        let notifications: Vec<_> = avr
            .take_actions()
            .into_iter()
            .filter(|action| matches!(action, Action::Notify(_)))
            .collect();
        assert_eq!(
            notifications,
            vec![
                Action::Notify("P1P1".to_string()),
                Action::Notify("P1M0".to_string())
            ]
        );
    }

    #[test]
    fn test_reconcile_tick_refreshes_until_confirmed() {
        let (mut avr, sink) = connected();
        avr.data_received(b"P1P1;");
        let generation = match avr.take_actions().as_slice() {
            [Action::ScheduleReconcile { generation, after }, Action::Notify(_)] => {
                assert_eq!(*after, Duration::from_secs(1));
                *generation
            }
            other => panic!("unexpected actions {:?}", other),
        };

        avr.reconcile_tick(generation);
        assert_eq!(sink.take().len(), registry::attributes().len());
        assert_eq!(
            avr.take_actions(),
            vec![Action::ScheduleReconcile {
                generation,
                after: Duration::from_secs(2)
            }]
        );

        // A zone attribute answering confirms the receiver is up
        avr.data_received(b"P1VM-40;");
        assert!(avr.state().is_reconciled());
        avr.take_actions();

        avr.reconcile_tick(generation);
        assert!(sink.take().is_empty());
        assert!(avr.take_actions().is_empty());
        assert_eq!(avr.reconcile_phase(), ReconcilePhase::Reconciled);
    }

    #[test]
    fn test_connection_lost_cancels_polling() {
        let (mut avr, _sink) = connected();
        avr.data_received(b"P1P1;P1V");
        avr.connection_lost(Some("reset by peer"));

        assert!(!avr.is_connected());
        assert_eq!(avr.reconcile_phase(), ReconcilePhase::Idle);

        // Partial message was discarded with the connection
        avr.data_received(b"M-10;");
        assert_eq!(avr.state().raw(registry::VOLUME), "");
    }
}
