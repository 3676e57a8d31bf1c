//! Defines the "data contract" between the frame encoder (transmit side) and
//! the frame parser (receive side): field widths, bit masks and limits.
//!
//! Every width below is expressed in unstuffed (logical) bits.

/// Highest valid standard (11-bit) identifier.
pub const MAX_STANDARD_ID: u16 = 0x7FF;

/// Classic CAN payload capacity.
pub const MAX_DATA_LEN: usize = 8;

/// Header as seen by the parser: identifier(11) + RTR + IDE + r0 + DLC(4).
/// The SOF bit is absorbed by the unstuffer as the edge ending bus idle.
pub const HEADER_BITS: u32 = 18;

/// Header as pushed by the encoder: SOF + [`HEADER_BITS`].
pub const ENCODED_HEADER_BITS: u32 = HEADER_BITS + 1;

/// One payload byte.
pub const DATA_BITS: u32 = 8;

/// CRC-15 trailer.
pub const CRC_BITS: u32 = 15;

/// CRC delimiter + ACK slot.
pub const ACK_BITS: u32 = 2;

/// ACK delimiter + the first five EOF bits; the sixth recessive bit must
/// surface as a recessive stuff error.
pub const EOF_BITS: u32 = 6;

/// Expected ACK field: recessive CRC delimiter followed by a dominant ACK slot.
pub const ACK_FIELD_OK: u32 = 0b10;

/// RTR, IDE and r0 must be dominant for a supported (standard data) frame.
pub const HEADER_RESERVED_MASK: u32 = 0b111 << 4;

/// Identifier position inside the 18-bit header.
pub const HEADER_ID_SHIFT: u32 = 7;

/// Data length code position inside the header.
pub const HEADER_DLC_MASK: u32 = 0xF;

/// Worst-case stuffed frame image (SOF, header, 8 bytes, CRC and delimiter)
/// rounded up to 32-bit words: 99 bits + 24 stuff bits = 123 bits.
pub const MAX_STUFFED_WORDS: usize = 4;
