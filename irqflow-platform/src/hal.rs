//! Hardware abstraction seams
//!
//! Drivers talk to peripherals only through these traits. A board support
//! crate implements them over its vendor HAL; tests implement them over
//! plain memory. Methods take `&self` because the same handle is reached
//! from both the interrupt and the task side; implementations own whatever
//! register access that implies.
//!
//! Handle identity is address identity: the reference the application
//! registers must be the same one the interrupt vector passes back.

use crate::errors::HalError;
use crate::frame::CanFrame;

/// One acceptance filter bank in 32-bit identifier/mask mode
///
/// `id` and `mask` are standard identifiers; positioning them in the
/// bank registers is the implementation's concern. A zero mask accepts
/// every identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Bank number inside the shared pool
    pub bank: u8,
    /// Identifier to match
    pub id: u16,
    /// Bits of `id` that must match
    pub mask: u16,
    /// First bank owned by the second controller, carried by the first
    /// controller's configuration on dual-controller parts
    pub slave_start_bank: Option<u8>,
}

impl FilterConfig {
    /// Filter that lets every frame through
    pub const fn accept_all(bank: u8, slave_start_bank: Option<u8>) -> Self {
        Self {
            bank,
            id: 0,
            mask: 0,
            slave_start_bank,
        }
    }

    /// Does this filter admit `id`
    pub const fn accepts(&self, id: u16) -> bool {
        (id & self.mask) == (self.id & self.mask)
    }
}

/// CAN controller
pub trait CanHardware {
    /// Take one frame from the receive FIFO
    ///
    /// `WouldBlock` when the FIFO is empty. The returned frame's timestamp
    /// is ignored; the driver stamps it.
    fn receive(&self) -> nb::Result<CanFrame, HalError>;

    /// Queue a frame in a transmit mailbox
    fn transmit(&self, frame: &CanFrame) -> Result<(), HalError>;

    /// Program one filter bank
    fn configure_filter(&self, filter: &FilterConfig) -> Result<(), HalError>;

    /// Leave initialization mode and enable the receive-pending interrupt
    fn start(&self) -> Result<(), HalError>;

    /// Controller is ready or listening
    fn is_ready(&self) -> bool;

    /// Error code latched by the controller
    fn hardware_error_count(&self) -> u32 {
        0
    }
}

/// UART receiving one byte per interrupt
pub trait UartHardware {
    /// Byte captured by the receive that just completed
    ///
    /// `WouldBlock` if no byte is pending.
    fn take_rx_byte(&self) -> nb::Result<u8, HalError>;

    /// Arm the next single-byte interrupt receive
    fn rearm_rx(&self) -> Result<(), HalError>;

    /// Blocking transmit bounded by `timeout_ms`
    fn write(&self, bytes: &[u8], timeout_ms: u32) -> Result<(), HalError>;

    /// Peripheral is idle and accepts a transmit
    fn is_ready(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_all_admits_everything() {
        let filter = FilterConfig::accept_all(0, Some(14));
        assert!(filter.accepts(0));
        assert!(filter.accepts(0x7FF));
    }

    #[test]
    fn mask_selects_identifier_bits() {
        let filter = FilterConfig {
            bank: 3,
            id: 0x120,
            mask: 0x7F0,
            slave_start_bank: None,
        };
        assert!(filter.accepts(0x120));
        assert!(filter.accepts(0x12F));
        assert!(!filter.accepts(0x130));
    }
}
