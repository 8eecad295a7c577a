//! Command enum for the AVR actor
//!
//! Everything that touches the handler goes through one queue so responses,
//! user requests and timer ticks are processed strictly one after another.

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::interpret::InterpretResult;
use super::reconcile::ReconcilePhase;
use crate::error::Result;
use crate::protocol::WriteSink;
use crate::state::StateSnapshot;

// ============================================================================
// Type Aliases
// ============================================================================

/// Change notification callback, receives the raw message that changed state
pub type UpdateFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Called once each time the transport reports the connection gone
pub type ConnectionLostFn = Arc<dyn Fn() + Send + Sync>;

/// Typed view of the receiver at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvrStatus {
    pub connected: bool,
    pub power: bool,
    pub mute: bool,
    pub attenuation: i32,
    pub volume: i32,
    pub volume_as_percentage: f64,
    pub input_number: Option<i32>,
    pub input_name: String,
    /// Registry label of the active source, e.g. "TV"
    pub source: Option<&'static str>,
    pub reconcile_phase: ReconcilePhase,
    pub reconciled: bool,
}

/// Property writes that may be rejected before anything is sent
#[derive(Debug, Clone, PartialEq)]
pub enum SetRequest {
    Power(bool),
    Mute(bool),
    Attenuation(i32),
    Volume(i32),
    VolumePercentage(f64),
    InputNumber(i32),
    InputName(String),
}

// ============================================================================
// AvrCommand
// ============================================================================

/// Commands for the AVR actor
///
/// Transport signals and fire-and-forget requests carry no response.
/// Reads, setters and `Feed` reply over a oneshot channel.
pub enum AvrCommand {
    // -------------------------------------------------------------------------
    // Transport signals
    // -------------------------------------------------------------------------
    /// Transport is up; frames go to `sink` from now on
    ConnectionMade { sink: Box<dyn WriteSink> },

    /// Transport is gone (`None` for a clean EOF)
    ConnectionLost { reason: Option<String> },

    /// A chunk read from the socket
    ///
    /// `done` fires after every message in the chunk has been interpreted
    /// and its notifications dispatched.
    Feed {
        chunk: Bytes,
        done: Option<oneshot::Sender<Vec<InterpretResult>>>,
    },

    // -------------------------------------------------------------------------
    // Fire-and-forget requests
    // -------------------------------------------------------------------------
    Query { key: String },
    Command { raw: String },
    RefreshCore,
    RefreshAll,

    /// Power-on loop timer fired
    ReconcileTick { generation: u64 },

    // -------------------------------------------------------------------------
    // Request-response
    // -------------------------------------------------------------------------
    Set {
        request: SetRequest,
        response: oneshot::Sender<Result<()>>,
    },
    GetStatus {
        response: oneshot::Sender<AvrStatus>,
    },
    GetLabel {
        key: String,
        response: oneshot::Sender<Option<&'static str>>,
    },
    GetInputList {
        response: oneshot::Sender<Vec<String>>,
    },
    GetSnapshot {
        response: oneshot::Sender<StateSnapshot>,
    },

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------
    Subscribe { listener: UpdateFn },
    OnConnectionLost { listener: ConnectionLostFn },
    Shutdown,
}

impl AvrCommand {
    /// Short name for trace output
    pub fn kind(&self) -> &'static str {
        match self {
            AvrCommand::ConnectionMade { .. } => "connection_made",
            AvrCommand::ConnectionLost { .. } => "connection_lost",
            AvrCommand::Feed { .. } => "feed",
            AvrCommand::Query { .. } => "query",
            AvrCommand::Command { .. } => "command",
            AvrCommand::RefreshCore => "refresh_core",
            AvrCommand::RefreshAll => "refresh_all",
            AvrCommand::ReconcileTick { .. } => "reconcile_tick",
            AvrCommand::Set { .. } => "set",
            AvrCommand::GetStatus { .. } => "get_status",
            AvrCommand::GetLabel { .. } => "get_label",
            AvrCommand::GetInputList { .. } => "get_input_list",
            AvrCommand::GetSnapshot { .. } => "get_snapshot",
            AvrCommand::Subscribe { .. } => "subscribe",
            AvrCommand::OnConnectionLost { .. } => "on_connection_lost",
            AvrCommand::Shutdown => "shutdown",
        }
    }
}
