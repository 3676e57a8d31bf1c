//! Bit (de)stuffing for the CAN line code: after five consecutive bits of equal
//! level the transmitter inserts one bit of the opposite level, and the
//! receiver removes it again.
//!
//! Both directions work on 32-bit accumulators where the newest bit sits in the
//! lowest position. Edge detection is done on whole words (`x ^ (x >> 1)`)
//! instead of bit by bit, which keeps the per-interrupt work bounded.
use crate::error::BitWriterError;
use crate::infra::codec::crc::crc_bits;

/// Largest field accepted by [`BitStuffer::push`]; leaves room for the stuff
/// bits and five bits of history inside a 32-bit accumulator.
pub const MAX_PUSH_BITS: u32 = 24;

/// Logical level of a bit on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitLevel {
    /// Logical 0, wins arbitration.
    Dominant,
    /// Logical 1, idle level.
    Recessive,
}

/// Outcome of [`BitUnstuffer::pull`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// The requested field is complete; carries the destuffed value.
    Complete(u32),
    /// Raw bits ran out before the field was complete.
    NeedMoreData,
    /// Six consecutive raw bits of the given level were seen.
    StuffError(BitLevel),
}

#[inline]
fn shr(value: u32, amount: u32) -> u32 {
    value.checked_shr(amount).unwrap_or(0)
}

/// Mask selecting the `count` low bits (`count` ≥ 32 selects every bit).
#[inline]
pub(crate) fn low_mask(count: u32) -> u32 {
    u32::MAX
        .checked_shr(32u32.saturating_sub(count))
        .unwrap_or(0)
}

/// Two-bit line history ending in `bit`, preceded by the opposite level.
#[inline]
pub const fn edge_history(bit: u32) -> u32 {
    let bit = bit & 1;
    ((bit ^ 1) << 1) | bit
}

//==================================================================================BIT_UNSTUFFER

/// Incremental destuffer: raw line bits go in, fixed-width fields come out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitUnstuffer {
    /// Raw bits sampled from the line, newest bit lowest. Bits above
    /// `count_stuff` are history used for run detection.
    stuffed_bits: u32,
    /// Raw bits not yet consumed.
    count_stuff: u32,
    /// Destuffed bits of the field being assembled, MSB first.
    unstuffed_bits: u32,
    /// Destuffed bits still missing to complete the field.
    count_unstuff: u32,
}

impl BitUnstuffer {
    /// Empty destuffer with a dominant history.
    pub const fn new() -> Self {
        Self::with_history(0)
    }

    /// Destuffer whose line history (bits preceding the first delivery) is `history`.
    pub const fn with_history(history: u32) -> Self {
        Self {
            stuffed_bits: history,
            count_stuff: 0,
            unstuffed_bits: 0,
            count_unstuff: 0,
        }
    }

    /// Append `count` freshly sampled bits (oldest first in the high bits of `data`).
    ///
    /// Pending raw bits from the previous delivery are not kept: drain with
    /// [`pull`](Self::pull) until it asks for more data before adding bits.
    pub fn add_bits(&mut self, data: u32, count: u32) {
        let count = count.min(32);
        self.stuffed_bits =
            self.stuffed_bits.checked_shl(count).unwrap_or(0) | (data & low_mask(count));
        self.count_stuff = count;
    }

    /// Declare the width of the next field and reset the output accumulator.
    pub fn set_field_width(&mut self, width: u32) {
        self.unstuffed_bits = 0;
        self.count_unstuff = width.min(32);
    }

    /// Break a partial run at the CRC/ACK boundary.
    ///
    /// The CRC delimiter is not subject to stuffing: if the last consumed CRC
    /// bits form a run of two to four bits, the delimiter could otherwise
    /// complete a five-bit run and make the ACK slot look like a stuff bit.
    pub fn clear_edge_state(&mut self) {
        let sb = self.stuffed_bits;
        let edges = sb ^ (sb >> 1);
        let cs = self.count_stuff;
        let recent_edges = shr(edges, cs);
        if recent_edges & 1 == 0 && recent_edges & 0xF != 0 {
            self.stuffed_bits ^= 1u32.checked_shl(cs).unwrap_or(0);
        }
    }

    /// Consume raw bits until the declared field is complete, the raw bits run
    /// out, or a six-bit run is found.
    pub fn pull(&mut self) -> Pull {
        let sb = self.stuffed_bits;
        let edges = sb ^ (sb >> 1);
        let mut ub = self.unstuffed_bits;
        let mut cs = self.count_stuff;
        let mut cu = self.count_unstuff;

        let result = loop {
            if cu == 0 {
                break Pull::Complete(ub);
            }
            if cs == 0 {
                break Pull::NeedMoreData;
            }
            cs -= 1;
            if shr(edges, cs + 1) & 0xF != 0 {
                // The four preceding edges are not all quiet: regular data bit.
                cu -= 1;
                ub |= ((sb >> cs) & 1) << cu;
            } else if (edges >> cs) & 0x1F == 0 {
                // Sixth equal bit where a stuff bit was due.
                let level = if (sb >> cs) & 1 != 0 {
                    BitLevel::Recessive
                } else {
                    BitLevel::Dominant
                };
                break Pull::StuffError(level);
            }
            // Otherwise: stuff bit, dropped.
        };

        self.unstuffed_bits = ub;
        self.count_stuff = cs;
        self.count_unstuff = cu;
        result
    }

    /// Raw bits delivered but not consumed yet.
    pub fn pending(&self) -> u32 {
        self.count_stuff
    }

    /// Destuffed bits still missing for the current field.
    pub fn remaining(&self) -> u32 {
        self.count_unstuff
    }

    /// Destuffed bits assembled so far, aligned as if the field were complete.
    pub fn unstuffed_bits(&self) -> u32 {
        self.unstuffed_bits
    }

    /// Raw accumulator including history.
    pub fn raw_bits(&self) -> u32 {
        self.stuffed_bits
    }

    /// Forget the raw history (after a sync counter reset).
    pub fn clear_history(&mut self) {
        self.stuffed_bits = 0;
    }
}

//==================================================================================BIT_STUFFER

/// Insert stuff bits into the `num_bits` low bits of `bits`.
///
/// Bits above `num_bits` are history (the bits already emitted) and seed the
/// run detection. Returns the number of bits the field occupies once stuffed.
pub fn bitstuff(bits: &mut u32, num_bits: u32) -> u32 {
    let mut b = *bits;
    let mut edges = b ^ (b >> 1);
    let mut count = num_bits;
    let mut i = num_bits.min(31) as i32 - 1;
    while i >= 0 {
        if (edges >> i) & 0xF == 0 {
            // Bits i..i+4 are equal: open a slot below them for the stuff bit.
            let mask = low_mask(i as u32 + 1);
            let low = b & mask;
            let high = (b & !(mask >> 1)) << 1;
            b = high ^ low ^ (1 << i);
            // The stuff bit starts a new run.
            i -= 3;
            count += 1;
            edges = b ^ (b >> 1);
        }
        i -= 1;
    }
    *bits = b;
    count
}

/// Frame encoder writing stuffed bits MSB first into a word buffer while
/// folding the logical bits into the CRC-15.
pub struct BitStuffer<'a> {
    /// Last stuffed bits emitted, used to carry runs across fields.
    prev_stuffed: u32,
    /// Write cursor, in bits from the start of the buffer.
    bitpos: usize,
    /// Running CRC over the unstuffed bits pushed with [`push`](Self::push).
    crc: u16,
    /// Destination image; cleared on construction.
    buffer: &'a mut [u32],
}

impl<'a> BitStuffer<'a> {
    /// Create an encoder over `buffer`, preceded by a recessive (idle) bit.
    pub fn new(buffer: &'a mut [u32]) -> Self {
        buffer.iter_mut().for_each(|word| *word = 0);
        Self {
            prev_stuffed: 1,
            bitpos: 0,
            crc: 0,
            buffer,
        }
    }

    /// Override the level of the bit preceding the first pushed bit. That bit
    /// is itself preceded by an edge, so no run is carried in.
    pub fn with_previous_bit(mut self, bit: u32) -> Self {
        self.prev_stuffed = edge_history(bit);
        self
    }

    /// Push the `count` low bits of `data`: CRC update, stuffing, then append.
    pub fn push(&mut self, data: u32, count: u32) -> Result<(), BitWriterError> {
        if count > MAX_PUSH_BITS {
            return Err(BitWriterError::TooLongForType {
                max: MAX_PUSH_BITS as u8,
                asked: count.min(u8::MAX as u32) as u8,
            });
        }
        let data = data & low_mask(count);
        let mut stuffed = self.prev_stuffed.checked_shl(count).unwrap_or(0) | data;
        let stuffed_count = bitstuff(&mut stuffed, count);
        self.push_raw(stuffed, stuffed_count)?;
        self.crc = crc_bits(self.crc, data, count);
        self.prev_stuffed = stuffed;
        Ok(())
    }

    /// Append bits verbatim: no stuffing and no CRC update.
    pub fn push_raw(&mut self, data: u32, count: u32) -> Result<(), BitWriterError> {
        if count > 32 {
            return Err(BitWriterError::TooLongForType {
                max: 32,
                asked: count.min(u8::MAX as u32) as u8,
            });
        }
        if count == 0 {
            return Ok(());
        }
        let capacity = self.buffer.len() * 32;
        let end = self.bitpos + count as usize;
        if end > capacity {
            return Err(BitWriterError::OutOfBounds {
                asked: count as usize,
                available: capacity - self.bitpos,
            });
        }

        let data = data & low_mask(count);
        let word = self.bitpos / 32;
        let available = 32 - (self.bitpos % 32) as u32;
        if available >= count {
            self.buffer[word] |= data << (available - count);
        } else {
            let spill = count - available;
            self.buffer[word] |= data >> spill;
            self.buffer[word + 1] |= data << (32 - spill);
        }
        self.bitpos = end;
        Ok(())
    }

    /// Pad the last word with recessive bits and return the number of words used.
    pub fn finalize(&mut self) -> usize {
        let words = self.bitpos.div_ceil(32);
        let extra = words * 32 - self.bitpos;
        if extra > 0 {
            self.buffer[words - 1] |= low_mask(extra as u32);
        }
        words
    }

    /// CRC-15 over every bit pushed with [`push`](Self::push).
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// Bits written so far (stuff bits included, padding excluded).
    pub fn bit_len(&self) -> usize {
        self.bitpos
    }
}

//==================================================================================TEST_BITS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
