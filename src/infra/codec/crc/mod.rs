//! CAN CRC-15 (polynomial 0x4599, MSB first, initial value 0, no final XOR).
//!
//! The CRC covers the logical (unstuffed) bits from SOF to the end of the data
//! field. Both the encoder and the frame parser fold bits through these helpers.

/// CRC-15/CAN generator polynomial (x^15 + x^14 + x^10 + x^8 + x^7 + x^4 + x^3 + 1).
pub const CRC15_POLY: u16 = 0x4599;

/// Width mask of the CRC register.
pub const CRC15_MASK: u16 = 0x7FFF;

/// Fold a single bit into the CRC register.
#[inline]
pub const fn crc_next(crc: u16, bit: u32) -> u16 {
    let feedback = ((crc >> 14) as u32 ^ bit) & 1;
    let shifted = (crc << 1) & CRC15_MASK;
    if feedback != 0 {
        shifted ^ CRC15_POLY
    } else {
        shifted
    }
}

/// Fold the `count` low bits of `data`, most significant first.
#[inline]
pub fn crc_bits(mut crc: u16, data: u32, count: u32) -> u16 {
    for i in (0..count.min(32)).rev() {
        crc = crc_next(crc, (data >> i) & 1);
    }
    crc
}
