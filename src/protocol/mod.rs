//! Wire-level pieces of the Anthem IP control protocol
//!
//! - [`registry`]: the static attribute table
//! - [`frame`]: splitting the response stream into messages
//! - [`encoder`]: formatting queries/commands and handing them to a sink

pub mod encoder;
pub mod frame;
pub mod registry;

pub use encoder::{encode_command, encode_query, WriteSink};
pub use frame::FrameDecoder;
pub use registry::AttributeDescriptor;
