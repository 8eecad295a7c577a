//! AvrHandle - public API for the AvrActor
//!
//! Cloneable, cheap to pass around. Requests that cannot fail are
//! fire-and-forget; reads and range-checked setters await a reply.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::commands::{AvrCommand, AvrStatus, SetRequest};
use super::interpret::InterpretResult;
use super::reconcile::{ReconcilePhase, ReconcileTiming};
use crate::error::{AvrError, Result};
use crate::protocol::WriteSink;
use crate::state::StateSnapshot;

/// Handle for interacting with the AvrActor
///
/// # Fire-and-forget
/// - `query`, `command`, `refresh_core`, `refresh_all`
/// - `connection_made`, `connection_lost`
///
/// # Request-response
/// - property getters (`power`, `volume`, ...) and `status`
/// - property setters, which reject out-of-range values
/// - `feed`, which resolves once the chunk has been fully processed
#[derive(Clone)]
pub struct AvrHandle {
    cmd_tx: mpsc::UnboundedSender<AvrCommand>,
}

impl AvrHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<AvrCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Spawn a new AvrActor and return a handle to it
    pub fn spawn(timing: ReconcileTiming) -> Self {
        super::actor::AvrActor::spawn(timing)
    }

    fn send(&self, cmd: AvrCommand) {
        let _ = self.cmd_tx.send(cmd);
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> AvrCommand) -> Result<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.cmd_tx
            .send(build(response_tx))
            .map_err(|_| AvrError::HandlerClosed)?;
        response_rx.await.map_err(|_| AvrError::HandlerClosed)
    }

    // =========================================================================
    // Transport signals
    // =========================================================================

    /// Attach a transport; the handler queries core attributes right away
    pub fn connection_made(&self, sink: Box<dyn WriteSink>) {
        self.send(AvrCommand::ConnectionMade { sink });
    }

    /// Report the transport gone (`None` for EOF)
    pub fn connection_lost(&self, reason: Option<String>) {
        self.send(AvrCommand::ConnectionLost { reason });
    }

    /// Hand a received chunk to the handler and wait until it is processed
    ///
    /// Resolves after every complete message in the chunk has updated state
    /// and its change notifications have been delivered. Readers await this
    /// before reading again.
    pub async fn feed(&self, chunk: impl Into<Bytes>) -> Result<Vec<InterpretResult>> {
        let chunk = chunk.into();
        self.request(|done| AvrCommand::Feed {
            chunk,
            done: Some(done),
        })
        .await
    }

    // =========================================================================
    // Fire-and-forget requests
    // =========================================================================

    /// Query one attribute, e.g. `query("P1S")`
    pub fn query(&self, key: impl Into<String>) {
        self.send(AvrCommand::Query { key: key.into() });
    }

    /// Send a raw command, e.g. `command("P1V-50")`
    pub fn command(&self, raw: impl Into<String>) {
        self.send(AvrCommand::Command { raw: raw.into() });
    }

    pub fn refresh_core(&self) {
        self.send(AvrCommand::RefreshCore);
    }

    pub fn refresh_all(&self) {
        self.send(AvrCommand::RefreshAll);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub async fn status(&self) -> Result<AvrStatus> {
        self.request(|response| AvrCommand::GetStatus { response }).await
    }

    pub async fn power(&self) -> Result<bool> {
        Ok(self.status().await?.power)
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.set(SetRequest::Power(on)).await
    }

    pub async fn mute(&self) -> Result<bool> {
        Ok(self.status().await?.mute)
    }

    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        self.set(SetRequest::Mute(muted)).await
    }

    pub async fn attenuation(&self) -> Result<i32> {
        Ok(self.status().await?.attenuation)
    }

    pub async fn set_attenuation(&self, attenuation: i32) -> Result<()> {
        self.set(SetRequest::Attenuation(attenuation)).await
    }

    pub async fn volume(&self) -> Result<i32> {
        Ok(self.status().await?.volume)
    }

    pub async fn set_volume(&self, level: i32) -> Result<()> {
        self.set(SetRequest::Volume(level)).await
    }

    pub async fn volume_as_percentage(&self) -> Result<f64> {
        Ok(self.status().await?.volume_as_percentage)
    }

    pub async fn set_volume_as_percentage(&self, percentage: f64) -> Result<()> {
        self.set(SetRequest::VolumePercentage(percentage)).await
    }

    pub async fn input_number(&self) -> Result<Option<i32>> {
        Ok(self.status().await?.input_number)
    }

    pub async fn set_input_number(&self, number: i32) -> Result<()> {
        self.set(SetRequest::InputNumber(number)).await
    }

    pub async fn input_name(&self) -> Result<String> {
        Ok(self.status().await?.input_name)
    }

    pub async fn set_input_name(&self, name: impl Into<String>) -> Result<()> {
        self.set(SetRequest::InputName(name.into())).await
    }

    pub async fn input_list(&self) -> Result<Vec<String>> {
        self.request(|response| AvrCommand::GetInputList { response }).await
    }

    /// Registry label for the current value of an attribute
    pub async fn label(&self, key: impl Into<String>) -> Result<Option<&'static str>> {
        let key = key.into();
        self.request(|response| AvrCommand::GetLabel { key, response }).await
    }

    pub async fn reconcile_phase(&self) -> Result<ReconcilePhase> {
        Ok(self.status().await?.reconcile_phase)
    }

    pub async fn snapshot(&self) -> Result<StateSnapshot> {
        self.request(|response| AvrCommand::GetSnapshot { response }).await
    }

    async fn set(&self, request: SetRequest) -> Result<()> {
        self.request(|response| AvrCommand::Set { request, response }).await?
    }

    // =========================================================================
    // Subscriptions and lifecycle
    // =========================================================================

    /// Register a change notification callback
    ///
    /// Called with the raw message (e.g. `"P1M1"`) whenever a response
    /// changes stored state, after the whole chunk has been interpreted.
    pub fn subscribe(&self, listener: Arc<dyn Fn(&str) + Send + Sync>) {
        self.send(AvrCommand::Subscribe { listener });
    }

    /// Register a callback for connection loss
    pub fn on_connection_lost(&self, listener: Arc<dyn Fn() + Send + Sync>) {
        self.send(AvrCommand::OnConnectionLost { listener });
    }

    /// Returns false once the actor has stopped
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    pub fn shutdown(&self) {
        self.send(AvrCommand::Shutdown);
    }
}
