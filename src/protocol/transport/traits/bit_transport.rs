//! Contract with the hardware bit engine (PIO state machines + DMA on the
//! RP2040, a timer-driven sampler elsewhere). The engine samples the line,
//! delivers raw bits, shifts out pre-stuffed images, and drives the ACK slot.
//!
//! Every method is called from the receive interrupt context and must return
//! without blocking.

/// Outbound half of the bit transport: what the data link asks of the engine.
pub trait BitTransport {
    /// Begin shifting out a pre-stuffed frame image (MSB first, recessive padding)
    /// as soon as the bus is idle. Arbitration loss is detected by the engine.
    fn start_transmit(&mut self, words: &[u32]);

    /// Abort any transmission in progress and release the line (recessive).
    fn cancel_transmit(&mut self);

    /// Drive a dominant ACK slot once the receiver has matched `pattern`
    /// (the last raw bits of the CRC field and the CRC delimiter, newest
    /// lowest) ending at raw bit `bit_position`.
    fn inject_ack(&mut self, pattern: u32, bit_position: u32);

    /// Withdraw a pending ACK injection.
    fn cancel_ack(&mut self);

    /// Whether the receiver overran (the CPU did not keep up with raw bits).
    fn rx_stalled(&mut self) -> bool;

    /// Hard reset of the receive/transmit machinery after a stall.
    fn reset(&mut self);

    /// Reset the bus-idle counter after it saturated.
    fn resync(&mut self);

    /// Arm or disarm the "bus idle detected" signal.
    fn watch_idle(&mut self, _enabled: bool) {}
}
