//! Anthem AVR IP control
//!
//! Protocol handler for Anthem x00 series A/V receivers speaking the
//! `;`-delimited ASCII control protocol over TCP (port 14999).
//!
//! - [`protocol`]: attribute registry, frame decoder and request encoder
//! - [`state`]: the raw device state mirror
//! - [`avr`]: response interpreter, typed properties, power-on refresh loop
//!   and the actor/handle pair that runs them on tokio
//! - [`connection`]: TCP glue between a socket and an [`AvrHandle`]
//! - [`config`], [`paths`], [`cli`]: support for the `anthem-avr` binary

pub mod avr;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod paths;
pub mod protocol;
pub mod state;

pub use avr::{AvrHandle, AvrStatus, InterpretResult, ReconcilePhase, ReconcileTiming};
pub use connection::Connection;
pub use error::{AvrError, Result};
