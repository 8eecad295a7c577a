//! Frame decoder for the semicolon-delimited response stream
//!
//! The receiver sends a sequence of `;`-terminated messages and frequently
//! batches several of them into one TCP read, or splits one across reads.
//! The decoder buffers raw bytes and only yields complete messages.

use bytes::{Buf, BytesMut};
use tracing::trace;

/// Message delimiter on the wire
pub const DELIMITER: u8 = b';';

/// Splits an incoming byte stream into discrete protocol messages
///
/// The buffer is unbounded: a peer that never sends a delimiter grows it
/// without limit.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every message it completes
    ///
    /// Empty segments (`;;`) are dropped. A trailing segment without a
    /// delimiter stays buffered until a later chunk completes it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == DELIMITER) {
            let segment = self.buffer.split_to(pos);
            self.buffer.advance(1);

            if segment.is_empty() {
                continue;
            }

            let message = String::from_utf8_lossy(&segment).into_owned();
            trace!("assembled message {}", message);
            messages.push(message);
        }

        messages
    }

    /// Bytes held back waiting for a delimiter
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop any partial message (used when the connection is torn down)
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
