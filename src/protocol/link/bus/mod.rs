//! [`CanBus`] implementation over a [`LinkService`], for async applications.
//!
//! The engine reports through a [`ChannelNotifier`] into a pre-allocated event
//! channel; `recv` drains it. `send` waits on the space signal when the
//! transmit queue is full. Nothing is allocated by the library.
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::{Channel, Receiver},
    signal::Signal,
};

use crate::error::{LinkBusError, TransmitError};
use crate::protocol::link::notify::{ChannelNotifier, Event};
use crate::protocol::link::service::LinkService;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::traits::bit_transport::BitTransport;
use crate::protocol::transport::traits::can_bus::CanBus;

/// Async frame I/O on top of the software link.
pub struct LinkBus<'s, 'q, T: BitTransport, const N: usize, const CAP: usize> {
    service: &'s LinkService<'q, T, ChannelNotifier<'q, CAP>, N>,
    events: Receiver<'q, CriticalSectionRawMutex, Event, CAP>,
    tx_space: &'q Signal<CriticalSectionRawMutex, ()>,
}

impl<'s, 'q, T: BitTransport, const N: usize, const CAP: usize> LinkBus<'s, 'q, T, N, CAP> {
    /// `events` and `tx_space` must be the channel and signal given to the
    /// service's [`ChannelNotifier`].
    pub fn new(
        service: &'s LinkService<'q, T, ChannelNotifier<'q, CAP>, N>,
        events: &'q Channel<CriticalSectionRawMutex, Event, CAP>,
        tx_space: &'q Signal<CriticalSectionRawMutex, ()>,
    ) -> Self {
        Self {
            service,
            events: events.receiver(),
            tx_space,
        }
    }
}

impl<T: BitTransport, const N: usize, const CAP: usize> CanBus for LinkBus<'_, '_, T, N, CAP> {
    type Error = LinkBusError;

    /// Completes once the frame is queued, not once it is on the wire.
    async fn send<'a>(&'a mut self, frame: &'a CanFrame) -> Result<(), Self::Error> {
        loop {
            match self.service.enqueue(frame) {
                Ok(()) => return Ok(()),
                Err(TransmitError::QueueFull) => self.tx_space.wait().await,
                Err(err) => return Err(LinkBusError::Enqueue(err)),
            }
        }
    }

    /// Next frame from another node. Own confirmations are skipped; abandoned
    /// transmissions and infrastructure faults surface as errors.
    async fn recv(&mut self) -> Result<CanFrame, Self::Error> {
        loop {
            match self.events.receive().await {
                Event::Rx(frame) => return Ok(frame),
                Event::Tx(_) => {}
                Event::TxFail(frame) => return Err(LinkBusError::TransmitFailed(frame)),
                Event::Error(kind) => return Err(LinkBusError::Protocol(kind)),
            }
        }
    }
}
