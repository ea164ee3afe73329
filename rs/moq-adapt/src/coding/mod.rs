//! Minimal binary coding for the payloads this crate owns.
//!
//! The transport owns its own framing; the only thing encoded here is the feedback sample.

mod decode;
mod encode;
mod varint;

pub use decode::*;
pub use encode::*;
pub use varint::*;
