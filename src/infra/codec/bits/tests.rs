//! Stuffing/destuffing edge cases and the stuff → unstuff identity.
extern crate std;

use super::*;
use std::vec::Vec;

/// Deterministic bit source for the round-trip grid.
fn xorshift(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

/// Expand a word image into individual bits, MSB first.
fn image_bits(words: &[u32], len: usize) -> Vec<u32> {
    (0..len)
        .map(|i| (words[i / 32] >> (31 - (i % 32))) & 1)
        .collect()
}

/// Pack up to 8 bits (oldest first) into an `add_bits` delivery.
fn pack(bits: &[u32]) -> u32 {
    bits.iter().fold(0, |acc, bit| (acc << 1) | bit)
}

/// Destuff `total` logical bits out of `raw`, 8-bit fields at a time.
/// Returns the logical bits and the number of raw bits consumed.
fn unstuff_all(raw: &[u32], history: u32, total: u32) -> (Vec<u32>, usize) {
    let mut unstuffer = BitUnstuffer::with_history(history);
    let mut out = Vec::new();
    let mut fed = 0usize;
    let mut remaining = total;
    let mut width = remaining.min(8);
    unstuffer.set_field_width(width);

    loop {
        match unstuffer.pull() {
            Pull::Complete(value) => {
                for i in (0..width).rev() {
                    out.push((value >> i) & 1);
                }
                remaining -= width;
                if remaining == 0 {
                    break;
                }
                width = remaining.min(8);
                unstuffer.set_field_width(width);
            }
            Pull::NeedMoreData => {
                assert!(fed < raw.len(), "raw stream exhausted");
                let chunk = &raw[fed..(fed + 8).min(raw.len())];
                unstuffer.add_bits(pack(chunk), chunk.len() as u32);
                fed += chunk.len();
            }
            Pull::StuffError(level) => panic!("unexpected stuff error {:?}", level),
        }
    }
    (out, fed - unstuffer.pending() as usize)
}

#[test]
/// Five equal bits get a complementary stuff bit appended.
fn test_bitstuff_five_dominant() {
    let mut bits = 1 << 5;
    let count = bitstuff(&mut bits, 5);
    assert_eq!(count, 6);
    assert_eq!(bits & 0x3F, 0b000001);
}

#[test]
/// A run carried over from the history completes inside the new field.
fn test_bitstuff_uses_history() {
    // History "0 1", field "1111": five recessive bits in a row.
    let mut bits = (0b01 << 4) | 0b1111;
    let count = bitstuff(&mut bits, 4);
    assert_eq!(count, 5);
    assert_eq!(bits & 0x1F, 0b11110);
}

#[test]
/// Alternating bits never need stuffing.
fn test_bitstuff_alternating() {
    let mut bits = (1 << 16) | 0xAAAA;
    assert_eq!(bitstuff(&mut bits, 16), 16);
    assert_eq!(bits & 0xFFFF, 0xAAAA);
}

#[test]
/// Raw pushes are written MSB first and padded with recessive bits.
fn test_push_raw_and_finalize() {
    let mut buffer = [0u32; 2];
    let mut stuffer = BitStuffer::new(&mut buffer);
    stuffer.push_raw(0b000, 3).unwrap();
    assert_eq!(stuffer.bit_len(), 3);
    assert_eq!(stuffer.finalize(), 1);
    assert_eq!(buffer[0], 0x1FFF_FFFF);
}

#[test]
/// Writes spanning a word boundary land on both words.
fn test_push_raw_spanning_words() {
    let mut buffer = [0u32; 2];
    let mut stuffer = BitStuffer::new(&mut buffer);
    stuffer.push_raw(0, 28).unwrap();
    stuffer.push_raw(0xFF, 8).unwrap();
    assert_eq!(stuffer.finalize(), 2);
    assert_eq!(buffer[0], 0x0000_000F);
    assert_eq!(buffer[1], 0xFFFF_FFFF);
}

#[test]
/// Guard rails on field width and capacity.
fn test_push_limits() {
    let mut buffer = [0u32; 1];
    let mut stuffer = BitStuffer::new(&mut buffer);
    assert!(matches!(
        stuffer.push(0, 25),
        Err(BitWriterError::TooLongForType { max: 24, asked: 25 })
    ));
    stuffer.push_raw(0, 30).unwrap();
    assert!(matches!(
        stuffer.push_raw(0, 4),
        Err(BitWriterError::OutOfBounds {
            asked: 4,
            available: 2
        })
    ));
}

#[test]
/// The CRC covers logical bits only, not the inserted stuff bits.
fn test_push_crc_ignores_stuffing() {
    let mut buffer = [0u32; 2];
    let mut stuffer = BitStuffer::new(&mut buffer);
    stuffer.push(0, 19).unwrap();
    assert!(stuffer.bit_len() > 19);
    assert_eq!(stuffer.crc(), crate::infra::codec::crc::crc_bits(0, 0, 19));
}

#[test]
/// Six dominant bits are a framing error.
fn test_unstuff_dominant_error() {
    let mut unstuffer = BitUnstuffer::with_history(edge_history(1));
    unstuffer.set_field_width(8);
    unstuffer.add_bits(0b1000_0000, 8);
    assert_eq!(unstuffer.pull(), Pull::StuffError(BitLevel::Dominant));
    // The seventh zero is still pending.
    assert_eq!(unstuffer.pending(), 1);
}

#[test]
/// Six recessive bits report the idle polarity and keep the partial field.
fn test_unstuff_recessive_error() {
    let mut unstuffer = BitUnstuffer::with_history(edge_history(1));
    unstuffer.set_field_width(8);
    unstuffer.add_bits(0b0011_1111, 8);
    assert_eq!(unstuffer.pull(), Pull::StuffError(BitLevel::Recessive));
    // Two dominant bits and five recessive bits were accepted.
    assert_eq!(unstuffer.remaining(), 1);
    assert_eq!(unstuffer.unstuffed_bits() >> 1, 0b0011111);
}

#[test]
/// A stuff bit between two deliveries is dropped.
fn test_unstuff_across_deliveries() {
    let mut unstuffer = BitUnstuffer::with_history(edge_history(1));
    unstuffer.set_field_width(8);
    // "00000" then stuff "1", then "000".
    unstuffer.add_bits(0b0000, 4);
    assert_eq!(unstuffer.pull(), Pull::NeedMoreData);
    unstuffer.add_bits(0b01000, 5);
    assert_eq!(unstuffer.pull(), Pull::Complete(0));
}

#[test]
/// Fields narrower than the delivery leave raw bits pending.
fn test_unstuff_pending_bits() {
    let mut unstuffer = BitUnstuffer::with_history(edge_history(0));
    unstuffer.set_field_width(2);
    unstuffer.add_bits(0b1010_1010, 8);
    assert_eq!(unstuffer.pull(), Pull::Complete(0b10));
    assert_eq!(unstuffer.pending(), 6);
    unstuffer.set_field_width(6);
    assert_eq!(unstuffer.pull(), Pull::Complete(0b101010));
}

#[test]
/// A partial run at the CRC/ACK boundary is broken so the ACK slot is read as data.
fn test_clear_edge_state() {
    let mut plain = BitUnstuffer::with_history(edge_history(0));
    plain.set_field_width(4);
    plain.add_bits(0b1111, 4);
    assert_eq!(plain.pull(), Pull::Complete(0b1111));
    let mut corrected = plain;

    plain.set_field_width(2);
    plain.add_bits(0b10, 2);
    assert_eq!(plain.pull(), Pull::NeedMoreData);

    corrected.clear_edge_state();
    corrected.set_field_width(2);
    corrected.add_bits(0b10, 2);
    assert_eq!(corrected.pull(), Pull::Complete(0b10));
}

#[test]
/// A complete run of five leaves the history untouched.
fn test_clear_edge_state_full_run() {
    let mut unstuffer = BitUnstuffer::with_history(edge_history(0));
    unstuffer.set_field_width(5);
    unstuffer.add_bits(0b11111, 5);
    assert_eq!(unstuffer.pull(), Pull::Complete(0b11111));
    let raw = unstuffer.raw_bits();
    unstuffer.clear_edge_state();
    assert_eq!(unstuffer.raw_bits(), raw);
}

#[test]
/// unstuff(stuff(bits)) == bits for every length up to 64 and both initial edges.
fn test_stuff_unstuff_identity() {
    let mut seed = 0x1234_5678;
    for len in 1..=64u32 {
        for round in 0..8 {
            for edge in 0..2u32 {
                // Alternate random data with long runs to exercise stuffing.
                let bits: Vec<u32> = (0..len)
                    .map(|i| match round {
                        0 => 0,
                        1 => 1,
                        2 => (i / 7) & 1,
                        _ => xorshift(&mut seed) & 1,
                    })
                    .collect();

                let mut buffer = [0u32; 4];
                let mut stuffer = BitStuffer::new(&mut buffer).with_previous_bit(edge);
                for chunk in bits.chunks(8) {
                    stuffer.push(pack(chunk), chunk.len() as u32).unwrap();
                }
                let stuffed_len = stuffer.bit_len();
                let raw = image_bits(&buffer, stuffed_len);

                let (decoded, consumed) = unstuff_all(&raw, edge_history(edge), len);
                assert_eq!(decoded, bits, "len {} round {} edge {}", len, round, edge);

                // A trailing stuff bit is only consumed with the next field.
                assert!(consumed <= stuffed_len);
                if consumed < stuffed_len {
                    assert_eq!(stuffed_len - consumed, 1);
                    assert_ne!(raw[stuffed_len - 1], raw[stuffed_len - 2]);
                }
            }
        }
    }
}
