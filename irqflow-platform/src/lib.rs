//! Multi-instance peripheral layer for irqflow
//!
//! Binds the `irqflow-core` pipeline to CAN controllers and UARTs through
//! the traits in [`hal`]:
//!
//! - [`can::CanBus`]: receive interrupt → per-controller frame queue →
//!   routed or default handler, plus transmit, filters and counters
//! - [`uart::UartPort`]: byte-per-interrupt reception into a queue,
//!   blocking transmit
//! - [`platform::Platform`]: both of the above plus last-error health
//!
//! ```no_run
//! use irqflow_platform::{CanBus, CanConfig, CanFrame, CanHardware, HalError, FilterConfig};
//! use irqflow_platform::time::TickCounter;
//!
//! struct Bxcan(u32);
//! impl CanHardware for Bxcan {
//!     fn receive(&self) -> nb::Result<CanFrame, HalError> { Err(nb::Error::WouldBlock) }
//!     fn transmit(&self, _: &CanFrame) -> Result<(), HalError> { Ok(()) }
//!     fn configure_filter(&self, _: &FilterConfig) -> Result<(), HalError> { Ok(()) }
//!     fn start(&self) -> Result<(), HalError> { Ok(()) }
//!     fn is_ready(&self) -> bool { true }
//! }
//!
//! let can1 = Bxcan(0x4000_6400);
//! let ticks = TickCounter::new();
//! let on_speed = |frame: &CanFrame| { let _ = frame.payload(); };
//!
//! let mut bus: CanBus<'_, Bxcan> = CanBus::new(&[&can1], CanConfig::default(), &ticks).unwrap();
//! bus.route(0x120, &on_speed).unwrap();
//!
//! // CAN RX0 interrupt
//! bus.on_rx_interrupt(&can1);
//!
//! // Main loop
//! bus.process_rx(0).unwrap();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
#[allow(unused_macros)]
mod macros;

pub mod can;
pub mod config;
pub mod errors;
pub mod frame;
pub mod hal;
pub mod platform;
pub mod time;
pub mod uart;

// Public API
pub use can::{CanBus, FrameHandler};
pub use config::{CanConfig, UartConfig};
pub use errors::{HalError, PlatformError, PlatformResult};
pub use frame::CanFrame;
pub use hal::{CanHardware, FilterConfig, UartHardware};
pub use platform::{Platform, PlatformConfig, PlatformHandles};
pub use time::{FixedTime, TimeSource};
pub use uart::UartPort;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
        assert_eq!(Platform::<dyn CanHardware, dyn UartHardware>::version(), VERSION);
    }
}
