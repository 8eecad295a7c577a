//! AvrActor - single-task event loop for the protocol handler
//!
//! The actor owns the [`Avr`] core and processes [`AvrCommand`]s one at a
//! time. Nothing else touches the core, so there are no locks and the order
//! of responses, user requests and timer ticks is the order they were
//! queued.
//!
//! ```text
//!  reader task ──Feed──┐
//!  AvrHandle ──Query/Set/Get──┼──▶ command_rx ──▶ Avr core ──▶ actions
//!  timer tasks ──ReconcileTick─┘                                │
//!        ▲                                                      │
//!        └──────────── ScheduleReconcile ◀──────────────────────┤
//!  subscribers ◀────────────── Notify ◀─────────────────────────┘
//! ```

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::commands::{AvrCommand, ConnectionLostFn, UpdateFn};
use super::handle::AvrHandle;
use super::reconcile::ReconcileTiming;
use super::{Action, Avr};

/// Actor wrapping the protocol handler core
pub struct AvrActor {
    avr: Avr,

    /// Change notification subscribers, called in registration order
    subscribers: Vec<UpdateFn>,

    /// Connection-lost listeners
    lost_listeners: Vec<ConnectionLostFn>,

    /// Receiver for incoming commands
    command_rx: mpsc::UnboundedReceiver<AvrCommand>,

    /// Weak sender handed to timer tasks so they never keep the actor alive
    self_tx: mpsc::WeakUnboundedSender<AvrCommand>,

    /// Counter for received chunks
    chunk_count: u64,
}

impl AvrActor {
    /// Spawn a new actor on the current tokio runtime and return a handle
    ///
    /// The actor stops when every handle has been dropped or on
    /// [`AvrHandle::shutdown`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let avr = AvrActor::spawn(ReconcileTiming::default());
    /// avr.subscribe(Arc::new(|raw| println!("changed: {}", raw)));
    /// ```
    pub fn spawn(timing: ReconcileTiming) -> AvrHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = AvrActor {
            avr: Avr::new(timing),
            subscribers: Vec::new(),
            lost_listeners: Vec::new(),
            command_rx: cmd_rx,
            self_tx: cmd_tx.downgrade(),
            chunk_count: 0,
        };

        tokio::spawn(actor.run());

        info!("AvrActor spawned");

        AvrHandle::new(cmd_tx)
    }

    async fn run(mut self) {
        debug!("AvrActor run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(command = cmd.kind(), "Processing command");

            match cmd {
                // Transport signals
                AvrCommand::ConnectionMade { sink } => {
                    self.avr.connection_made(sink);
                }
                AvrCommand::ConnectionLost { reason } => {
                    self.avr.connection_lost(reason.as_deref());
                    for listener in &self.lost_listeners {
                        listener();
                    }
                }
                AvrCommand::Feed { chunk, done } => {
                    self.chunk_count += 1;
                    let results = self.avr.data_received(&chunk);
                    // Notifications for this chunk go out before the reader resumes
                    self.dispatch_actions();
                    if let Some(done) = done {
                        let _ = done.send(results);
                    }
                }

                // Fire-and-forget requests
                AvrCommand::Query { key } => self.avr.query(&key),
                AvrCommand::Command { raw } => self.avr.command(&raw),
                AvrCommand::RefreshCore => self.avr.refresh_core(),
                AvrCommand::RefreshAll => self.avr.refresh_all(),
                AvrCommand::ReconcileTick { generation } => {
                    self.avr.reconcile_tick(generation);
                }

                // Request-response
                AvrCommand::Set { request, response } => {
                    let _ = response.send(self.avr.apply(request));
                }
                AvrCommand::GetStatus { response } => {
                    let _ = response.send(self.avr.status());
                }
                AvrCommand::GetLabel { key, response } => {
                    let _ = response.send(self.avr.label(&key));
                }
                AvrCommand::GetInputList { response } => {
                    let _ = response.send(self.avr.input_list());
                }
                AvrCommand::GetSnapshot { response } => {
                    let _ = response.send(self.avr.snapshot());
                }

                // Lifecycle
                AvrCommand::Subscribe { listener } => {
                    self.subscribers.push(listener);
                    debug!(subscribers = self.subscribers.len(), "Added subscriber");
                }
                AvrCommand::OnConnectionLost { listener } => {
                    self.lost_listeners.push(listener);
                }
                AvrCommand::Shutdown => {
                    info!("AvrActor received shutdown command");
                    break;
                }
            }

            self.dispatch_actions();
        }

        info!(chunks = self.chunk_count, "AvrActor run loop terminated");
    }

    /// Run deferred work queued by the core, in order
    fn dispatch_actions(&mut self) {
        for action in self.avr.take_actions() {
            match action {
                Action::Notify(raw) => {
                    for subscriber in &self.subscribers {
                        subscriber(&raw);
                    }
                }
                Action::ScheduleReconcile { generation, after } => {
                    let weak = self.self_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        if let Some(tx) = weak.upgrade() {
                            let _ = tx.send(AvrCommand::ReconcileTick { generation });
                        }
                    });
                }
            }
        }
    }
}
