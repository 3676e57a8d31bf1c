//! Data-link transport surface: the frame type and the traits binding the
//! protocol engine to the hardware bit engine below and applications above.

pub mod can_frame;
pub mod traits;

/// Raw bits delivered per receive event by a byte-oriented sampler (DMA of one
/// PIO RX FIFO byte on the RP2040).
pub const RAW_BITS_PER_EVENT: u32 = 8;

/// Low raw bits of an ACK pattern the engine has to match before driving the slot.
pub const ACK_PATTERN_BITS: u32 = 21;
