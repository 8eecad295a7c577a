//! TCP transport for the receiver
//!
//! Dials the receiver once and wires the socket to an [`AvrHandle`]:
//!
//! - a writer task drains a frame queue onto the socket, pausing briefly
//!   between frames so the receiver is not flooded
//! - a reader task hands every chunk to [`AvrHandle::feed`] and waits for it
//!   to be processed before reading again
//!
//! There is no reconnect. When the socket closes the handler is told via
//! `connection_lost` and the tasks end.

use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::avr::AvrHandle;
use crate::error::{AvrError, Result};
use crate::protocol::WriteSink;

/// Default TCP port of the receiver's control interface
pub const DEFAULT_PORT: u16 = 14999;

/// Default pause after each frame written to the socket
pub const DEFAULT_COMMAND_SPACING: Duration = Duration::from_millis(10);

const READ_BUFFER_SIZE: usize = 1024;

/// Write sink that queues frames for the writer task
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self { tx }
    }
}

impl WriteSink for ChannelSink {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        self.tx
            .send(Bytes::copy_from_slice(frame))
            .map_err(|_| AvrError::NotConnected)
    }
}

/// Open connection to a receiver
pub struct Connection {
    peer: String,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    handle: AvrHandle,
}

impl Connection {
    /// Connect to `host:port` and attach the socket to `handle`
    ///
    /// On success the handler has been given a sink and has already queued
    /// its initial power query.
    pub async fn open(
        host: &str,
        port: u16,
        handle: AvrHandle,
        command_spacing: Duration,
    ) -> Result<Self> {
        let peer = format!("{}:{}", host, port);
        info!("Connecting to receiver at {}", peer);

        let stream = TcpStream::connect(peer.as_str()).await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY: {}", e);
        }
        let (read_half, write_half) = stream.into_split();

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(write_half, frame_rx, command_spacing));

        handle.connection_made(Box::new(ChannelSink::new(frame_tx)));

        let reader = tokio::spawn(read_loop(read_half, handle.clone()));

        info!("✅ Connected to receiver at {}", peer);

        Ok(Self {
            peer,
            reader,
            writer,
            handle,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Whether the socket is still being read
    pub fn is_open(&self) -> bool {
        !self.reader.is_finished()
    }

    /// Wait until the receiver closes the connection
    pub async fn closed(&mut self) {
        let _ = (&mut self.reader).await;
    }

    /// Drop the socket and tell the handler
    pub fn close(self) {
        if !self.reader.is_finished() {
            self.reader.abort();
            self.handle
                .connection_lost(Some("connection closed locally".to_string()));
        }
        self.writer.abort();
        info!("Disconnected from {}", self.peer);
    }
}

async fn write_loop(
    mut socket: OwnedWriteHalf,
    mut frames: mpsc::UnboundedReceiver<Bytes>,
    spacing: Duration,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = socket.write_all(&frame).await {
            warn!("Write to receiver failed: {}", e);
            break;
        }
        trace!(bytes = frame.len(), "Frame written");
        if !spacing.is_zero() {
            tokio::time::sleep(spacing).await;
        }
    }
    debug!("Writer task terminated");
}

async fn read_loop(mut socket: OwnedReadHalf, handle: AvrHandle) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match socket.read(&mut buf).await {
            Ok(0) => {
                handle.connection_lost(None);
                break;
            }
            Ok(n) => {
                if let Err(e) = handle.feed(Bytes::copy_from_slice(&buf[..n])).await {
                    warn!("Handler unavailable, closing reader: {}", e);
                    break;
                }
            }
            Err(e) => {
                handle.connection_lost(Some(e.to_string()));
                break;
            }
        }
    }
    debug!("Reader task terminated");
}
