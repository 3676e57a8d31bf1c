//! Line codecs used by both directions of the data link: the CAN CRC-15 and the
//! 5-equal-bits stuffing rule.
pub mod bits;
pub mod crc;
