//! Error types for the AVR protocol handler
//!
//! Nothing in the handler is fatal. Write failures are logged and swallowed
//! by the encoder, parse failures degrade to defaults inside the getters, and
//! unrecognised or rejected responses only produce log lines. The variants
//! here are what callers can actually observe.

use thiserror::Error;

pub type Result<T, E = AvrError> = core::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AvrError {
    /// No transport is attached (before connect or after the connection dropped)
    #[error("not connected to receiver")]
    NotConnected,

    /// The transport refused the write
    #[error("I/O error: {0}")]
    Io(String),

    /// A setter was given a value outside the range the receiver accepts
    #[error("{what} {value} out of range ({min}..={max})")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// No discovered input carries this name
    #[error("unknown input name: {0}")]
    UnknownInput(String),

    /// The handler task has stopped
    #[error("handler task is no longer running")]
    HandlerClosed,
}

impl From<std::io::Error> for AvrError {
    fn from(err: std::io::Error) -> Self {
        AvrError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = AvrError::OutOfRange {
            what: "attenuation",
            value: 5,
            min: -90,
            max: 0,
        };
        assert_eq!(err.to_string(), "attenuation 5 out of range (-90..=0)");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: AvrError = io.into();
        assert!(matches!(err, AvrError::Io(ref msg) if msg.contains("pipe closed")));
    }
}
