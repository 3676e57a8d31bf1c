//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (frame construction,
//! transmit queue admission, async bus adapter).
use crate::protocol::link::notify::ErrorKind;
use crate::protocol::transport::can_frame::CanFrame;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur while building a [`CanFrame`].
pub enum FrameError {
    /// Identifier does not fit in 11 bits.
    #[error("Invalid standard identifier: {id:#X}")]
    InvalidId { id: u32 },
    /// Classic CAN frames carry at most eight bytes.
    #[error("Payload too long: {len} bytes")]
    DataTooLong { len: usize },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors raised when handing a frame to the transmit queue.
pub enum TransmitError {
    /// Every queue slot holds a pending frame.
    #[error("Transmit queue full")]
    QueueFull,
    /// The frame image did not fit the slot buffer.
    #[error("Encoding failed: {source}")]
    Encoding { source: BitWriterError },
}

//==================================================================================LINK_BUS_ERROR
#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors surfaced by the async [`LinkBus`](crate::protocol::link::bus::LinkBus) adapter.
pub enum LinkBusError {
    /// The scheduler gave up on a queued frame after repeated cancellations.
    #[error("Transmit abandoned after repeated cancellation: {0:?}")]
    TransmitFailed(CanFrame),
    /// The frame could not be queued.
    #[error("Enqueue failed: {0}")]
    Enqueue(TransmitError),
    /// The engine reported an infrastructure fault.
    #[error("Protocol error: {0:?}")]
    Protocol(ErrorKind),
}

//==================================================================================BITWRITER_ERRORS
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Errors raised while laying stuffed bits into a word buffer.
pub enum BitWriterError {
    /// Attempted to write beyond the provided capacity.
    #[error("Attempted to write out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
    /// Field is too large for a single push.
    #[error("Cannot write more than {max} bits. Requested: {asked}")]
    TooLongForType { max: u8, asked: u8 },
}
