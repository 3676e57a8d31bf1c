//! Shares one [`LinkEngine`] between the receive interrupt and application code.
//!
//! The engine sits behind a critical-section mutex. The receive side calls
//! [`LinkService::on_rx_byte`] (and [`LinkService::on_bus_idle`]) from its
//! interrupt handler; applications call [`LinkService::enqueue`] from thread
//! mode or tasks. Enqueueing only takes the lock to start a transmission on an
//! idle bus, never while encoding.
//!
//! The notifier runs inside the lock: it must not call back into the service.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::error::TransmitError;
use crate::protocol::link::notify::Notifier;
use crate::protocol::link::tx_queue::TxQueue;
use crate::protocol::link::{LinkEngine, Statistics};
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::traits::bit_transport::BitTransport;

/// Lock-protected engine plus lock-free access to its transmit queue.
pub struct LinkService<'q, T: BitTransport, H: Notifier, const N: usize> {
    queue: &'q TxQueue<N>,
    engine: Mutex<CriticalSectionRawMutex, RefCell<LinkEngine<'q, T, H, N>>>,
}

impl<'q, T: BitTransport, H: Notifier, const N: usize> LinkService<'q, T, H, N> {
    pub fn new(engine: LinkEngine<'q, T, H, N>) -> Self {
        Self {
            queue: engine.queue(),
            engine: Mutex::new(RefCell::new(engine)),
        }
    }

    /// See [`LinkEngine::start`].
    pub fn start(&self) {
        self.with_engine(|engine| engine.start());
    }

    /// Receive interrupt: one byte of raw line samples.
    pub fn on_rx_byte(&self, byte: u8) {
        self.with_engine(|engine| engine.process_rx(byte));
    }

    /// Receive interrupt: `count` raw line samples (at most 32), oldest bit highest.
    pub fn on_rx_bits(&self, data: u32, count: u32) {
        self.with_engine(|engine| engine.process_rx_bits(data, count));
    }

    /// Idle interrupt.
    pub fn on_bus_idle(&self) {
        self.with_engine(|engine| engine.on_bus_idle());
    }

    /// Queue a frame for transmission.
    ///
    /// The frame is encoded outside the lock; the lock is then taken briefly so
    /// a frame queued on an idle bus starts immediately instead of waiting for
    /// the next idle period.
    pub fn enqueue(&self, frame: &CanFrame) -> Result<(), TransmitError> {
        self.queue.push(frame)?;
        self.with_engine(|engine| engine.kick_transmit());
        Ok(())
    }

    pub fn is_space_available(&self) -> bool {
        self.queue.is_space_available()
    }

    pub fn statistics(&self) -> Statistics {
        self.with_engine(|engine| engine.statistics())
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut LinkEngine<'q, T, H, N>) -> R) -> R {
        self.engine.lock(|engine| f(&mut engine.borrow_mut()))
    }
}
