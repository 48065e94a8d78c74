//! Standard-identifier CAN frame
//!
//! Queued layout (15 bytes, little-endian):
//!
//! | Offset | Size | Field       |
//! |--------|------|-------------|
//! | 0      | 2    | `id`        |
//! | 2      | 8    | `data`      |
//! | 10     | 1    | `len`       |
//! | 11     | 4    | `timestamp` |

use irqflow_core::{PipelineError, QueueItem};

use crate::errors::{PlatformError, PlatformResult};
use crate::time::Timestamp;

/// Largest standard (11-bit) identifier
pub const MAX_STANDARD_ID: u16 = 0x7FF;

/// Classic CAN payload limit
pub const MAX_DATA_LEN: usize = 8;

/// One received or outgoing frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanFrame {
    /// Standard identifier
    pub id: u16,
    /// Payload; bytes past `len` are zero
    pub data: [u8; MAX_DATA_LEN],
    /// Data length code, `0..=8`
    pub len: u8,
    /// Receive tick in milliseconds, zero for outgoing frames
    pub timestamp: Timestamp,
}

impl CanFrame {
    /// Build a frame from an identifier and up to eight payload bytes
    ///
    /// ## Errors
    /// - `InvalidParam`: `id` above 0x7FF or more than eight bytes
    pub fn new(id: u16, payload: &[u8]) -> PlatformResult<Self> {
        if id > MAX_STANDARD_ID || payload.len() > MAX_DATA_LEN {
            return Err(PlatformError::Pipeline(PipelineError::InvalidParam));
        }
        let mut data = [0u8; MAX_DATA_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            data,
            len: payload.len() as u8,
            timestamp: 0,
        })
    }

    /// Same frame with a receive stamp
    pub const fn stamped(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The `len` valid payload bytes
    pub fn payload(&self) -> &[u8] {
        let len = (self.len as usize).min(MAX_DATA_LEN);
        &self.data[..len]
    }
}

impl QueueItem for CanFrame {
    const SIZE: usize = 15;

    fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.id.to_le_bytes());
        out[2..10].copy_from_slice(&self.data);
        out[10] = self.len;
        out[11..15].copy_from_slice(&self.timestamp.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut data = [0u8; MAX_DATA_LEN];
        data.copy_from_slice(&bytes[2..10]);
        Self {
            id: u16::from_le_bytes([bytes[0], bytes[1]]),
            data,
            len: bytes[10],
            timestamp: u32::from_le_bytes([bytes[11], bytes[12], bytes[13], bytes[14]]),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CanFrame {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "CanFrame {{ id: {=u16:#x}, data: {=[u8]:x}, t: {=u32} }}",
            self.id,
            self.payload(),
            self.timestamp
        )
    }
}
