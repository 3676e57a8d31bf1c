//! Frame-level async interface, the way applications see a controller.
//!
//! [`LinkBus`](crate::protocol::link::bus::LinkBus) implements it on top of the
//! software link; hardware controllers or host adapters can implement it too,
//! so application code does not care which one sits underneath.
use crate::protocol::transport::can_frame::CanFrame;
use futures_util::Future;

/// Async frame I/O.
pub trait CanBus {
    type Error: core::fmt::Debug;

    /// Hand a frame to the controller. Completion means accepted for
    /// transmission, not confirmed on the wire.
    fn send<'a>(
        &'a mut self,
        frame: &'a CanFrame,
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;

    /// Wait for the next frame sent by another node.
    fn recv<'a>(&'a mut self) -> impl Future<Output = Result<CanFrame, Self::Error>> + 'a;
}
