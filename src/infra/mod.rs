//! Infrastructure layer: pure bit-level codecs with no knowledge of the bus state.
pub mod codec;
