//! Platform aggregate and health
//!
//! [`Platform::begin`] brings up whatever peripherals were handed to it and
//! keeps going past a failing one; the failure is kept as the last error.
//! Calls routed through [`Platform::track`] update the same slot.

use crate::can::CanBus;
use crate::config::{CanConfig, UartConfig};
use crate::errors::{PlatformError, PlatformResult};
use crate::hal::{CanHardware, UartHardware};
use crate::time::TimeSource;
use crate::uart::UartPort;

/// Configuration for every peripheral type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PlatformConfig {
    /// CAN bus settings
    pub can: CanConfig,
    /// UART settings
    pub uart: UartConfig,
}

/// Hardware handles supplied by the application
pub struct PlatformHandles<'h, 'a, C: ?Sized, U: ?Sized> {
    /// CAN controllers, index order
    pub can: &'h [&'a C],
    /// UARTs, index order
    pub uart: &'h [&'a U],
}

/// Initialized peripherals plus the last recorded error
pub struct Platform<'a, C: CanHardware + ?Sized, U: UartHardware + ?Sized> {
    can: Option<CanBus<'a, C>>,
    uart: Option<UartPort<'a, U>>,
    last_error: Option<PlatformError>,
}

impl<'a, C: CanHardware + ?Sized, U: UartHardware + ?Sized> Platform<'a, C, U> {
    /// Bring up every peripheral type that has handles
    pub fn begin(
        handles: PlatformHandles<'_, 'a, C, U>,
        config: PlatformConfig,
        clock: &'a dyn TimeSource,
    ) -> Self {
        let mut platform = Self {
            can: None,
            uart: None,
            last_error: None,
        };

        if !handles.can.is_empty() {
            platform.can = platform
                .track(CanBus::new(handles.can, config.can, clock))
                .ok();
        }
        if !handles.uart.is_empty() {
            platform.uart = platform
                .track(UartPort::new(handles.uart, config.uart))
                .ok();
        }

        if let Some(_e) = platform.last_error {
            log_warn!("platform {}: degraded, {}", crate::VERSION, _e);
        } else {
            log_info!("platform {}: up", crate::VERSION);
        }
        platform
    }

    /// Record the error of `result`, if any, and pass it through
    pub fn track<T>(&mut self, result: PlatformResult<T>) -> PlatformResult<T> {
        if let Err(e) = &result {
            self.last_error = Some(*e);
        }
        result
    }

    /// Drain and dispatch every CAN instance once
    pub fn poll(&self) -> usize {
        self.can.as_ref().map_or(0, CanBus::process_all_rx)
    }

    /// CAN bus, if it came up
    pub fn can(&self) -> Option<&CanBus<'a, C>> {
        self.can.as_ref()
    }

    /// CAN bus for routing changes
    pub fn can_mut(&mut self) -> Option<&mut CanBus<'a, C>> {
        self.can.as_mut()
    }

    /// UART port, if it came up
    pub fn uart(&self) -> Option<&UartPort<'a, U>> {
        self.uart.as_ref()
    }

    /// UART port for timeout changes
    pub fn uart_mut(&mut self) -> Option<&mut UartPort<'a, U>> {
        self.uart.as_mut()
    }

    /// Most recent recorded error
    pub fn last_error(&self) -> Option<PlatformError> {
        self.last_error
    }

    /// Forget the recorded error
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// At least one peripheral type is up and no error is recorded
    pub fn is_healthy(&self) -> bool {
        self.last_error.is_none() && (self.can.is_some() || self.uart.is_some())
    }

    /// Library version
    pub const fn version() -> &'static str {
        crate::VERSION
    }
}
