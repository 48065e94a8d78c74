//! Platform Status Codes
//!
//! Two layers:
//! - [`HalError`]: what a peripheral reported (timeout, bus fault, no free
//!   mailbox). Produced by [`CanHardware`](crate::hal::CanHardware) and
//!   [`UartHardware`](crate::hal::UartHardware) implementations.
//! - [`PlatformError`]: what a driver call returns. Pipeline conditions from
//!   `irqflow-core` pass through unchanged.
//!
//! Interrupt entry points never return errors; they count them instead.

use irqflow_core::PipelineError;
use thiserror_no_std::Error;

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Failure reported by the peripheral itself
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalError {
    /// Operation did not complete within its timeout
    #[error("Operation timed out")]
    Timeout,

    /// Bus-level fault (error passive, bus-off, framing)
    #[error("Bus fault")]
    Bus,

    /// Every transmit mailbox is occupied
    #[error("No free transmit mailbox")]
    NoMailbox,

    /// Receive overrun in the peripheral
    #[error("Receive overrun")]
    Overrun,

    /// Any other vendor-layer failure
    #[error("HAL error")]
    Other,
}

impl HalError {
    /// Static description
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "Operation timed out",
            Self::Bus => "Bus fault",
            Self::NoMailbox => "No free transmit mailbox",
            Self::Overrun => "Receive overrun",
            Self::Other => "HAL error",
        }
    }
}

/// Driver-level status
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    /// Queue, router, registry or partition condition
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Underlying peripheral failure
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// Instance number beyond the registered count
    #[error("No such instance: {0}")]
    NoSuchInstance(usize),

    /// Peripheral is not in a state that accepts the request
    #[error("Resource busy")]
    Busy,
}

impl PlatformError {
    /// Static description, usable where `Display` is unavailable
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pipeline(e) => e.as_str(),
            Self::Hal(e) => e.as_str(),
            Self::NoSuchInstance(_) => "No such instance",
            Self::Busy => "Resource busy",
        }
    }

    /// Part of normal operation (backpressure, unrouted identifier)
    pub const fn is_expected(&self) -> bool {
        match self {
            Self::Pipeline(e) => e.is_expected(),
            _ => false,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PlatformError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NoSuchInstance(i) => defmt::write!(fmt, "No such instance: {=usize}", i),
            other => defmt::write!(fmt, "{=str}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_convert_with_question_mark() {
        fn push_full() -> PlatformResult<()> {
            Err::<(), _>(PipelineError::QueueFull)?;
            Ok(())
        }

        let err = push_full().unwrap_err();
        assert_eq!(err, PlatformError::Pipeline(PipelineError::QueueFull));
        assert!(err.is_expected());
        assert_eq!(err.as_str(), "Queue is full");
    }

    #[test]
    fn hal_errors_are_not_expected() {
        let err = PlatformError::from(HalError::NoMailbox);
        assert!(!err.is_expected());
        assert_eq!(err.as_str(), "No free transmit mailbox");
        assert!(!PlatformError::Busy.is_expected());
    }

    #[cfg(feature = "std")]
    #[test]
    fn display_includes_context() {
        use std::string::ToString;

        assert_eq!(
            PlatformError::NoSuchInstance(3).to_string(),
            "No such instance: 3"
        );
        assert_eq!(
            PlatformError::Hal(HalError::Timeout).to_string(),
            "HAL error: Operation timed out"
        );
        assert_eq!(
            PlatformError::Pipeline(PipelineError::TableFull).to_string(),
            "Routing table is full"
        );
    }
}
