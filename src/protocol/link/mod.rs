//! Software CAN data link: parses the raw bit stream delivered by a
//! [`BitTransport`], acknowledges valid frames, confirms our own transmissions
//! by reading them back, and schedules retries.
//!
//! The engine runs in a single execution context (the receive interrupt).
//! [`service::LinkService`] wraps it for use from several contexts.
pub mod bus;
pub mod config;
pub mod notify;
pub mod parser;
pub mod scheduler;
pub mod service;
pub mod tx_queue;

use crate::core::DATA_BITS;
use crate::infra::codec::bits::{BitLevel, BitUnstuffer, Pull};
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::traits::bit_transport::BitTransport;
use crate::protocol::transport::RAW_BITS_PER_EVENT;
use config::LinkConfig;
use notify::{Event, Notifier};
use parser::ParseState;
use tx_queue::TxQueue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Running counters, wrapping at `u32::MAX`.
pub struct Statistics {
    /// Frames from other nodes reported with [`Event::Rx`].
    pub rx_total: u32,
    /// Own frames confirmed with [`Event::Tx`].
    pub tx_total: u32,
    /// Frame images handed to the bit transport.
    pub tx_attempt: u32,
    /// Frames abandoned on a stuff, CRC, ACK or EOF violation.
    pub parse_error: u32,
}

//==================================================================================LINK_ENGINE
/// Receive parser and transmit scheduler of one CAN controller.
pub struct LinkEngine<'q, T: BitTransport, H: Notifier, const N: usize> {
    transport: T,
    notifier: H,
    queue: &'q TxQueue<N>,
    config: LinkConfig,

    unstuffer: BitUnstuffer,
    /// Raw bits seen since start, wrapping.
    raw_bit_count: u32,
    state: ParseState,
    parse_crc: u16,
    parse_frame: CanFrame,
    parse_datapos: usize,

    /// Cancellations of the current head entry.
    cancel_count: u32,
    stats: Statistics,
}

impl<'q, T: BitTransport, H: Notifier, const N: usize> LinkEngine<'q, T, H, N> {
    /// Build a stopped engine; call [`start`](Self::start) once the bit
    /// transport is running.
    pub fn new(transport: T, notifier: H, queue: &'q TxQueue<N>, config: LinkConfig) -> Self {
        let mut unstuffer = BitUnstuffer::new();
        unstuffer.set_field_width(DATA_BITS);
        Self {
            transport,
            notifier,
            queue,
            config,
            unstuffer,
            raw_bit_count: 0,
            state: ParseState::Discard,
            parse_crc: 0,
            parse_frame: CanFrame::EMPTY,
            parse_datapos: 0,
            cancel_count: 0,
            stats: Statistics::default(),
        }
    }

    /// Enter the discard state and wait for the bus to go idle.
    pub fn start(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("CAN link started");
        self.go_discard();
    }

    /// Feed one byte of raw line samples, oldest bit in bit 7.
    pub fn process_rx(&mut self, byte: u8) {
        self.process_rx_bits(byte as u32, RAW_BITS_PER_EVENT);
    }

    /// Feed `count` raw line samples (at most 32), oldest bit highest.
    ///
    /// Wider deliveries are split into byte-sized chunks, oldest first, so the
    /// parser sees the same steps as with one event per byte.
    pub fn process_rx_bits(&mut self, data: u32, count: u32) {
        let mut remaining = count.min(u32::BITS);
        while remaining > 0 {
            let chunk = remaining.min(RAW_BITS_PER_EVENT);
            remaining -= chunk;
            self.process_chunk(data >> remaining, chunk);
        }
    }

    fn process_chunk(&mut self, data: u32, count: u32) {
        self.unstuffer.add_bits(data, count);
        self.raw_bit_count = self.raw_bit_count.wrapping_add(count);

        loop {
            match self.unstuffer.pull() {
                Pull::Complete(field) => self.data_state_update(field),
                Pull::NeedMoreData => break,
                Pull::StuffError(BitLevel::Recessive) => self.go_idle(),
                Pull::StuffError(BitLevel::Dominant) => self.go_error(),
            }
        }
    }

    /// Bit engine detected an idle bus (eleven recessive bits) while a frame
    /// was still being tracked.
    pub fn on_bus_idle(&mut self) {
        if self.state != ParseState::Start {
            self.go_idle();
        }
    }

    /// Parser state.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Counters since construction.
    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Configuration given at construction.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Transmit queue drained by this engine.
    pub fn queue(&self) -> &'q TxQueue<N> {
        self.queue
    }

    /// Cancellations of the frame at the head of the queue.
    pub fn cancel_count(&self) -> u32 {
        self.cancel_count
    }

    /// Raw bits processed so far, wrapping.
    pub fn raw_bit_count(&self) -> u32 {
        self.raw_bit_count
    }

    /// Bit transport driven by this engine.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the bit transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Event sink.
    pub fn notifier(&self) -> &H {
        &self.notifier
    }

    /// Mutable access to the event sink.
    pub fn notifier_mut(&mut self) -> &mut H {
        &mut self.notifier
    }

    fn notify(&mut self, event: Event) {
        self.notifier.notify(event);
    }
}
