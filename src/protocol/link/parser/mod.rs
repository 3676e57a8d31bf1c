//! Frame parser state machine.
//!
//! Each state owns the width of the next destuffed field. A completed field
//! drives [`LinkEngine::data_state_update`]; six recessive bits (end of frame,
//! idle) drive `go_idle`, six dominant bits (error frame) drive `go_error`.
use crate::core::{
    ACK_BITS, ACK_FIELD_OK, CRC_BITS, DATA_BITS, EOF_BITS, HEADER_BITS, HEADER_DLC_MASK,
    HEADER_ID_SHIFT, HEADER_RESERVED_MASK,
};
use crate::infra::codec::bits::{bitstuff, low_mask};
use crate::infra::codec::crc::crc_bits;
use crate::protocol::link::notify::{ErrorKind, Event};
use crate::protocol::link::LinkEngine;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::traits::bit_transport::BitTransport;
use crate::protocol::transport::ACK_PATTERN_BITS;

use super::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Position of the parser within a frame.
pub enum ParseState {
    /// Bus idle, waiting for the 18-bit header that follows SOF.
    Start,
    /// Reading payload bytes.
    Data,
    /// Reading the 15-bit CRC.
    Crc,
    /// Reading CRC delimiter and ACK slot.
    Ack,
    /// Reading end of frame.
    Eof,
    /// Skipping bits until the bus goes idle.
    Discard,
}

impl<'q, T: BitTransport, H: Notifier, const N: usize> LinkEngine<'q, T, H, N> {
    /// Dispatch a completed field to the current state.
    pub(crate) fn data_state_update(&mut self, field: u32) {
        match self.state {
            ParseState::Start => self.update_start(field),
            ParseState::Data => self.update_data(field),
            ParseState::Crc => self.update_crc(field),
            ParseState::Ack => self.update_ack(field),
            ParseState::Eof => {
                // A complete EOF field contains an edge, hence a dominant bit.
                self.abandon_frame();
            }
            ParseState::Discard => self.go_discard(),
        }
    }

    //==============================================================================TRANSITIONS
    /// Skip the rest of the current frame.
    pub(crate) fn go_discard(&mut self) {
        self.state = ParseState::Discard;
        self.unstuffer.set_field_width(DATA_BITS);
        self.on_collision_or_cancel();
        self.transport.watch_idle(true);
    }

    /// Protocol violation on an active frame.
    fn abandon_frame(&mut self) {
        self.stats.parse_error = self.stats.parse_error.wrapping_add(1);
        #[cfg(feature = "defmt")]
        defmt::debug!("Frame abandoned in {}", self.state);
        self.go_discard();
    }

    /// Six dominant bits.
    pub(crate) fn go_error(&mut self) {
        if self.state == ParseState::Discard {
            self.go_discard();
        } else {
            self.abandon_frame();
        }
    }

    /// Six recessive bits: end of frame or idle bus.
    pub(crate) fn go_idle(&mut self) {
        if self.state == ParseState::Start {
            if self.unstuffer.pending() == 0 && self.unstuffer.raw_bits() == u32::MAX {
                // Long idle; keep the bit engine's idle counter from saturating.
                #[cfg(feature = "defmt")]
                defmt::debug!("Bus idle counter saturated, resync");
                self.transport.resync();
                self.unstuffer.clear_history();
                self.go_discard();
                return;
            }
            self.unstuffer.set_field_width(HEADER_BITS);
            return;
        }

        self.transport.watch_idle(false);
        if self.state == ParseState::Eof && self.eof_is_recessive() {
            if self.check_self_transmit() {
                self.on_self_reception_confirmed();
            } else {
                self.report_rx();
            }
        }
        self.transport.cancel_ack();
        self.try_start_send();
        self.state = ParseState::Start;
        self.unstuffer.set_field_width(HEADER_BITS);
    }

    /// Destuffed EOF bits received so far are all recessive.
    fn eof_is_recessive(&self) -> bool {
        let missing = self.unstuffer.remaining();
        if missing > EOF_BITS {
            return false;
        }
        let received = self.unstuffer.unstuffed_bits() >> missing;
        received.wrapping_add(1) == 1 << (EOF_BITS - missing)
    }

    fn report_rx(&mut self) {
        self.stats.rx_total = self.stats.rx_total.wrapping_add(1);
        #[cfg(feature = "defmt")]
        defmt::trace!("Rx {}", self.parse_frame);
        self.notify(Event::Rx(self.parse_frame));
    }

    //==============================================================================FIELDS
    fn update_start(&mut self, header: u32) {
        // RTR, IDE and r0 must be dominant: no remote or extended frames.
        if header & HEADER_RESERVED_MASK != 0 {
            #[cfg(feature = "defmt")]
            defmt::trace!("Unsupported header {:#x}", header);
            self.go_discard();
            return;
        }

        self.parse_crc = crc_bits(0, header, HEADER_BITS);
        self.parse_frame = CanFrame::from_raw(header >> HEADER_ID_SHIFT, header & HEADER_DLC_MASK, &[]);
        self.parse_datapos = 0;

        if self.parse_frame.dlc() == 0 {
            self.go_crc();
        } else {
            self.state = ParseState::Data;
            self.unstuffer.set_field_width(DATA_BITS);
        }
        self.transport.watch_idle(true);
    }

    fn update_data(&mut self, byte: u32) {
        self.parse_crc = crc_bits(self.parse_crc, byte, DATA_BITS);
        self.parse_frame.set_byte(self.parse_datapos, byte as u8);
        self.parse_datapos += 1;

        if self.parse_datapos >= self.parse_frame.dlc() {
            self.go_crc();
        } else {
            self.unstuffer.set_field_width(DATA_BITS);
        }
    }

    /// Header and payload done: either our own frame is coming back, or we
    /// arm the ACK for someone else's.
    fn go_crc(&mut self) {
        self.state = ParseState::Crc;
        self.unstuffer.set_field_width(CRC_BITS);

        if self.check_self_transmit() || !self.config.ack_enabled {
            return;
        }

        // Predict the raw bits of CRC and CRC delimiter, continuing from the
        // raw bits already consumed so the stuffing matches the line.
        let unconsumed = self.unstuffer.pending();
        let history = self.unstuffer.raw_bits().checked_shr(unconsumed).unwrap_or(0);
        let mut pattern = (history << CRC_BITS) | self.parse_crc as u32;
        let stuffed = bitstuff(&mut pattern, CRC_BITS + 1).wrapping_sub(1);
        pattern = (pattern << 1) | 1;

        let crc_start = self.raw_bit_count.wrapping_sub(unconsumed).wrapping_sub(1);
        self.transport.inject_ack(
            pattern & low_mask(ACK_PATTERN_BITS),
            crc_start.wrapping_add(stuffed).wrapping_add(1),
        );
    }

    fn update_crc(&mut self, crc: u32) {
        if crc != self.parse_crc as u32 {
            #[cfg(feature = "defmt")]
            defmt::debug!("CRC mismatch: got {:#x}, expected {:#x}", crc, self.parse_crc);
            self.transport.cancel_ack();
            self.abandon_frame();
            return;
        }

        self.state = ParseState::Ack;
        self.unstuffer.clear_edge_state();
        self.unstuffer.set_field_width(ACK_BITS);
    }

    fn update_ack(&mut self, ack: u32) {
        self.transport.cancel_ack();
        if ack != ACK_FIELD_OK {
            self.abandon_frame();
            if self.transport.rx_stalled() {
                #[cfg(feature = "defmt")]
                defmt::warn!("Receiver stalled, resetting bit engine");
                self.transport.reset();
                self.notify(Event::Error(ErrorKind::ReceiverStall));
            }
            return;
        }

        self.state = ParseState::Eof;
        self.unstuffer.set_field_width(EOF_BITS);
    }
}
