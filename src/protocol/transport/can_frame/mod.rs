//! In-memory representation of a classic CAN 2.0A data frame.
use crate::core::{HEADER_ID_SHIFT, MAX_DATA_LEN, MAX_STANDARD_ID};
use crate::error::FrameError;
use embedded_can::{Id, StandardId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Standard data frame as queued for transmission or reported on reception.
///
/// Payload bytes beyond `dlc` are always zero, so frame equality is payload equality.
pub struct CanFrame {
    /// 11-bit identifier.
    id: u16,
    /// Number of valid payload bytes (0 to 8).
    dlc: u8,
    /// Payload buffer.
    data: [u8; MAX_DATA_LEN],
}

impl CanFrame {
    /// Identifier 0, no payload.
    pub const EMPTY: Self = Self {
        id: 0,
        dlc: 0,
        data: [0; MAX_DATA_LEN],
    };

    /// Build a frame, rejecting identifiers above 0x7FF and payloads above eight bytes.
    pub fn new(id: u16, data: &[u8]) -> Result<Self, FrameError> {
        if id > MAX_STANDARD_ID {
            return Err(FrameError::InvalidId { id: id as u32 });
        }
        if data.len() > MAX_DATA_LEN {
            return Err(FrameError::DataTooLong { len: data.len() });
        }
        Ok(Self::from_raw(id as u32, data.len() as u32, data))
    }

    /// Lenient constructor: the identifier is masked to 11 bits, the length is
    /// clamped to eight and missing bytes read as zero.
    pub fn from_raw(id: u32, dlc: u32, data: &[u8]) -> Self {
        let dlc = dlc.min(MAX_DATA_LEN as u32) as usize;
        let mut frame = Self {
            id: (id & MAX_STANDARD_ID as u32) as u16,
            dlc: dlc as u8,
            data: [0; MAX_DATA_LEN],
        };
        let copied = dlc.min(data.len());
        frame.data[..copied].copy_from_slice(&data[..copied]);
        frame
    }

    /// 11-bit identifier.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Number of valid payload bytes.
    #[inline]
    pub fn dlc(&self) -> usize {
        self.dlc as usize
    }

    /// Valid payload bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }

    /// Header bits following SOF: identifier, RTR/IDE/r0 (dominant) and DLC.
    #[inline]
    pub fn header(&self) -> u32 {
        ((self.id as u32) << HEADER_ID_SHIFT) | self.dlc as u32
    }

    /// Store one received payload byte.
    #[inline]
    pub(crate) fn set_byte(&mut self, pos: usize, byte: u8) {
        if let Some(slot) = self.data.get_mut(pos) {
            *slot = byte;
        }
    }
}

//==================================================================================EMBEDDED_CAN
impl embedded_can::Frame for CanFrame {
    /// Only standard identifiers are supported.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) => CanFrame::new(id.as_raw(), data).ok(),
            Id::Extended(_) => None,
        }
    }

    /// Remote frames are not modeled.
    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        // The identifier is masked to 11 bits at construction.
        Id::Standard(StandardId::new(self.id).unwrap_or(StandardId::MAX))
    }

    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    fn data(&self) -> &[u8] {
        CanFrame::data(self)
    }
}
