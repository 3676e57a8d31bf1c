//! Transmit queue shared by two execution contexts: the application pushes
//! frames (producer) while the receive interrupt starts, retries and retires
//! them (consumer).
//!
//! Positions grow monotonically and wrap at `u32::MAX`; `push - pull` is the
//! number of pending entries. The push position is only written by producers,
//! inside the slot lock; the pull position and the in-flight flag only by the
//! consumer.
//! Only atomic loads and stores are used, so targets without compare-and-swap
//! (Cortex-M0+) are supported.
use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::core::{CRC_BITS, DATA_BITS, ENCODED_HEADER_BITS, MAX_STUFFED_WORDS};
use crate::error::{BitWriterError, TransmitError};
use crate::infra::codec::bits::BitStuffer;
use crate::protocol::transport::can_frame::CanFrame;

//==================================================================================TX_ENTRY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A queued frame with its wire image, computed once at enqueue time.
pub struct TxEntry {
    frame: CanFrame,
    crc: u16,
    stuffed: [u32; MAX_STUFFED_WORDS],
    stuffed_words: usize,
}

impl Default for TxEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl TxEntry {
    /// Unused slot.
    pub const EMPTY: Self = Self {
        frame: CanFrame::EMPTY,
        crc: 0,
        stuffed: [0; MAX_STUFFED_WORDS],
        stuffed_words: 0,
    };

    /// Encode SOF, header, payload and CRC with stuffing, then the CRC delimiter.
    pub fn encode(frame: &CanFrame) -> Result<Self, BitWriterError> {
        let mut stuffed = [0u32; MAX_STUFFED_WORDS];
        let mut stuffer = BitStuffer::new(&mut stuffed);
        stuffer.push(frame.header(), ENCODED_HEADER_BITS)?;
        for byte in frame.data() {
            stuffer.push(*byte as u32, DATA_BITS)?;
        }
        let crc = stuffer.crc();
        stuffer.push(crc as u32, CRC_BITS)?;
        stuffer.push_raw(1, 1)?;
        let stuffed_words = stuffer.finalize();

        Ok(Self {
            frame: *frame,
            crc,
            stuffed,
            stuffed_words,
        })
    }

    /// Frame as submitted (normalized).
    pub fn frame(&self) -> &CanFrame {
        &self.frame
    }

    /// CRC-15 of the frame.
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// Stuffed image handed to the bit transport.
    pub fn words(&self) -> &[u32] {
        &self.stuffed[..self.stuffed_words]
    }

    /// Whether a frame read back from the bus is this entry. The CRC is
    /// compared first, the payload only when it matches.
    pub fn matches(&self, frame: &CanFrame, crc: u16) -> bool {
        self.crc == crc && self.frame == *frame
    }
}

//==================================================================================TX_QUEUE
/// Fixed-capacity ring of pending transmissions.
pub struct TxQueue<const N: usize> {
    /// Slot storage; the lock covers copying an entry in or out and serializes producers.
    slots: Mutex<CriticalSectionRawMutex, RefCell<[TxEntry; N]>>,
    /// Written by producers under the slot lock.
    push_pos: AtomicU32,
    /// Written by the consumer.
    pull_pos: AtomicU32,
    /// Head entry handed to the bit transport; written by the consumer.
    in_transmit: AtomicBool,
}

impl<const N: usize> Default for TxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TxQueue<N> {
    /// Empty queue, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([TxEntry::EMPTY; N])),
            push_pos: AtomicU32::new(0),
            pull_pos: AtomicU32::new(0),
            in_transmit: AtomicBool::new(false),
        }
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    fn slot(pos: u32) -> usize {
        pos as usize % N
    }

    /// Entries waiting to be confirmed or abandoned, in-flight head included.
    pub fn pending(&self) -> usize {
        let pull = self.pull_pos.load(Ordering::Acquire);
        let push = self.push_pos.load(Ordering::Acquire);
        push.wrapping_sub(pull) as usize
    }

    /// Whether [`push`](Self::push) would currently succeed.
    pub fn is_space_available(&self) -> bool {
        self.pending() < N
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Whether the head entry is currently handed to the bit transport.
    pub fn is_transmitting(&self) -> bool {
        self.in_transmit.load(Ordering::Acquire)
    }

    /// Producer side: normalize, encode and append a frame.
    ///
    /// The capacity check, slot write and position update happen under the
    /// slot lock, so several contexts may push concurrently. This does not start the transmission; see
    /// [`LinkService::enqueue`](crate::protocol::link::service::LinkService::enqueue).
    pub fn push(&self, frame: &CanFrame) -> Result<(), TransmitError> {
        let entry = TxEntry::encode(frame).map_err(|source| TransmitError::Encoding { source })?;
        self.slots.lock(|slots| {
            let pull = self.pull_pos.load(Ordering::Acquire);
            let push = self.push_pos.load(Ordering::Relaxed);
            if push.wrapping_sub(pull) as usize >= N {
                return Err(TransmitError::QueueFull);
            }
            slots.borrow_mut()[Self::slot(push)] = entry;
            self.push_pos.store(push.wrapping_add(1), Ordering::Release);
            Ok(())
        })
    }

    /// Consumer side: run `f` on the head entry.
    pub(crate) fn with_head<R>(&self, f: impl FnOnce(&TxEntry) -> R) -> Option<R> {
        if self.is_empty() {
            return None;
        }
        let pull = self.pull_pos.load(Ordering::Relaxed);
        Some(self.slots.lock(|slots| f(&slots.borrow()[Self::slot(pull)])))
    }

    /// Consumer side: retire the head entry and return its frame.
    pub(crate) fn pop(&self) -> Option<CanFrame> {
        let frame = self.with_head(|entry| entry.frame)?;
        let pull = self.pull_pos.load(Ordering::Relaxed);
        self.pull_pos.store(pull.wrapping_add(1), Ordering::Release);
        Some(frame)
    }

    pub(crate) fn set_transmitting(&self, in_transmit: bool) {
        self.in_transmit.store(in_transmit, Ordering::Release);
    }
}
