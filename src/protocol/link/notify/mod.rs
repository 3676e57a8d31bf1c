//! Notifications raised by the data link.
//!
//! Every event is delivered synchronously from the receive context that
//! produced it. Handlers must not block and must not re-enter the
//! [`LinkService`](crate::protocol::link::service::LinkService) that owns the
//! engine; pushing into a [`TxQueue`](crate::protocol::link::tx_queue::TxQueue)
//! directly is fine.
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};

use crate::protocol::transport::can_frame::CanFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Infrastructure faults.
pub enum ErrorKind {
    /// The receiver fell behind the raw bit stream; the bit engine was reset.
    ReceiverStall,
}

impl ErrorKind {
    /// Numeric code reported with [`Event::Error`].
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::ReceiverStall => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What happened on the bus.
pub enum Event {
    /// A frame sent by another node was received and acknowledged.
    Rx(CanFrame),
    /// A queued frame was transmitted and read back intact.
    Tx(CanFrame),
    /// A queued frame was abandoned after too many cancellations.
    TxFail(CanFrame),
    /// Infrastructure fault.
    Error(ErrorKind),
}

/// Receiver of link events.
pub trait Notifier {
    fn notify(&mut self, event: Event);
}

impl<F: FnMut(Event)> Notifier for F {
    fn notify(&mut self, event: Event) {
        self(event)
    }
}

//==================================================================================CHANNEL_NOTIFIER
/// Forwards events into a pre-allocated channel for consumption by async tasks.
///
/// Optionally signals `tx_space` whenever a queue slot is released (`Tx` or
/// `TxFail`), so a blocked sender can retry.
pub struct ChannelNotifier<'a, const CAP: usize> {
    events: &'a Channel<CriticalSectionRawMutex, Event, CAP>,
    tx_space: Option<&'a Signal<CriticalSectionRawMutex, ()>>,
    dropped: u32,
}

impl<'a, const CAP: usize> ChannelNotifier<'a, CAP> {
    pub fn new(events: &'a Channel<CriticalSectionRawMutex, Event, CAP>) -> Self {
        Self {
            events,
            tx_space: None,
            dropped: 0,
        }
    }

    /// Signal `tx_space` when a queue slot is released.
    pub fn with_space_signal(mut self, tx_space: &'a Signal<CriticalSectionRawMutex, ()>) -> Self {
        self.tx_space = Some(tx_space);
        self
    }

    /// Events lost because the channel was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const CAP: usize> Notifier for ChannelNotifier<'_, CAP> {
    fn notify(&mut self, event: Event) {
        if matches!(event, Event::Tx(_) | Event::TxFail(_)) {
            if let Some(tx_space) = self.tx_space {
                tx_space.signal(());
            }
        }
        if self.events.try_send(event).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("Event channel full, dropped {}", event);
        }
    }
}
