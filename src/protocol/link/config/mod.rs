//! Runtime knobs of the data link.

/// Cancellations tolerated on one queued frame before it is abandoned.
pub const DEFAULT_RETRY_LIMIT: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Engine configuration, fixed at construction.
pub struct LinkConfig {
    /// A queued frame is dropped with a `TxFail` notification once it has been
    /// cancelled (arbitration loss, bus error, missing ACK) more than this many times.
    pub retry_limit: u32,
    /// Drive the ACK slot for frames received with a valid CRC. Disable for
    /// listen-only monitoring.
    pub ack_enabled: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkConfig {
    /// Default configuration: 32 retries, acknowledgment enabled.
    pub const fn new() -> Self {
        Self {
            retry_limit: DEFAULT_RETRY_LIMIT,
            ack_enabled: true,
        }
    }

    /// Sets the cancellation threshold.
    pub const fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Enables or disables ACK injection.
    pub const fn with_ack(mut self, ack_enabled: bool) -> Self {
        self.ack_enabled = ack_enabled;
        self
    }
}
