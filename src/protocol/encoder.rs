//! Outbound request formatting and the write sink seam
//!
//! Requests are plain ASCII: `KEY?;` for queries and `KEYVALUE;` for
//! commands. Delivery is fire-and-forget. A sink failure is logged and
//! dropped, the caller never learns whether the receiver saw the request.

use tracing::{debug, warn};

use super::frame::DELIMITER;
use super::registry;
use crate::error::Result;

/// Destination for encoded request frames
///
/// Implemented by the TCP glue in [`crate::connection`] and by recording
/// sinks in tests.
pub trait WriteSink: Send {
    /// Hand one complete frame to the transport
    fn write(&mut self, frame: &[u8]) -> Result<()>;
}

/// Build a query frame for an attribute key
///
/// The volume attribute is reported as `P1VM` but queried as `P1V?`.
pub fn encode_query(key: &str) -> String {
    if key == registry::VOLUME {
        encode_command("P1V?")
    } else {
        encode_command(&format!("{}?", key))
    }
}

/// Terminate a raw command with the delimiter
pub fn encode_command(raw: &str) -> String {
    let mut frame = String::with_capacity(raw.len() + 1);
    frame.push_str(raw);
    frame.push(DELIMITER as char);
    frame
}

/// Write a frame to the sink, logging instead of failing
///
/// Returns whether the sink accepted the frame.
pub fn send(sink: Option<&mut (dyn WriteSink + '_)>, frame: &str) -> bool {
    debug!("> {}", frame);

    let Some(sink) = sink else {
        warn!("No transport found, unable to send command {}", frame);
        return false;
    };

    match sink.write(frame.as_bytes()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Unable to send command {}: {}", frame, e);
            false
        }
    }
}
