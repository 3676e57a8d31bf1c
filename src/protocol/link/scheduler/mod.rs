//! Transmit scheduling.
//!
//! The head of the [`TxQueue`](crate::protocol::link::tx_queue::TxQueue) is
//! handed to the bit transport each time the bus goes idle. A transmission
//! only completes once the parser has read the frame back and the bus has
//! returned to idle; any disturbance before that cancels it and the frame is
//! retried on the next idle period.
use crate::protocol::link::notify::{Event, Notifier};
use crate::protocol::link::parser::ParseState;
use crate::protocol::link::LinkEngine;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::traits::bit_transport::BitTransport;
use crate::error::TransmitError;

impl<'q, T: BitTransport, H: Notifier, const N: usize> LinkEngine<'q, T, H, N> {
    /// Queue a frame and start it if the bus is idle.
    ///
    /// For use from the engine's own context; other contexts go through
    /// [`LinkService::enqueue`](crate::protocol::link::service::LinkService::enqueue).
    pub fn enqueue(&mut self, frame: &CanFrame) -> Result<(), TransmitError> {
        self.queue.push(frame)?;
        self.kick_transmit();
        Ok(())
    }

    /// Whether the transmit queue has a free slot.
    pub fn is_space_available(&self) -> bool {
        self.queue.is_space_available()
    }

    /// Start the head entry when the parser sits on an idle bus. Used after a
    /// frame was pushed from outside the engine.
    pub fn kick_transmit(&mut self) {
        if self.state == ParseState::Start {
            self.try_start_send();
        }
    }

    /// Hand the head entry to the bit transport unless one is already in flight.
    /// A head cancelled more than `retry_limit` times is dropped first.
    pub(crate) fn try_start_send(&mut self) {
        if self.queue.is_transmitting() || self.queue.is_empty() {
            return;
        }

        if self.cancel_count > self.config.retry_limit {
            self.cancel_count = 0;
            if let Some(frame) = self.queue.pop() {
                #[cfg(feature = "defmt")]
                defmt::warn!("Tx abandoned after {} retries: {}", self.config.retry_limit, frame);
                self.notify(Event::TxFail(frame));
            }
            if self.queue.is_empty() {
                return;
            }
        }

        self.queue.set_transmitting(true);
        let queue = self.queue;
        let transport = &mut self.transport;
        queue.with_head(|entry| transport.start_transmit(entry.words()));
        self.stats.tx_attempt = self.stats.tx_attempt.wrapping_add(1);
        #[cfg(feature = "defmt")]
        defmt::trace!("Tx start, attempt {}", self.stats.tx_attempt);
    }

    /// Withdraw the transmission in flight, if any, and release the line.
    pub(crate) fn on_collision_or_cancel(&mut self) {
        if self.queue.is_transmitting() {
            self.queue.set_transmitting(false);
            self.cancel_count = self.cancel_count.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::trace!("Tx cancelled ({})", self.cancel_count);
        }
        self.transport.cancel_transmit();
    }

    /// Whether the frame being parsed is the one we are transmitting. A
    /// different frame means arbitration was lost; the transmission is cancelled.
    pub(crate) fn check_self_transmit(&mut self) -> bool {
        if !self.queue.is_transmitting() {
            return false;
        }
        let (frame, crc) = (self.parse_frame, self.parse_crc);
        if self.queue.with_head(|entry| entry.matches(&frame, crc)) == Some(true) {
            return true;
        }
        self.on_collision_or_cancel();
        false
    }

    /// Own frame read back through EOF: retire it.
    pub(crate) fn on_self_reception_confirmed(&mut self) {
        self.queue.set_transmitting(false);
        self.transport.cancel_transmit();
        self.cancel_count = 0;
        if let Some(frame) = self.queue.pop() {
            self.stats.tx_total = self.stats.tx_total.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::trace!("Tx {}", frame);
            self.notify(Event::Tx(frame));
        }
    }
}
