//! Status Codes for the Interrupt-to-Task Pipeline
//!
//! ## Design
//!
//! Every operation in this crate returns its status; nothing panics and
//! nothing is escalated to a global abort. The error type is small and `Copy`
//! so an interrupt handler can return or record it without cost.
//!
//! ## Categories
//!
//! ### Configuration
//! - `InvalidParam`: zero or out-of-range size, capacity or count
//! - `OutOfMemory`: queue storage could not be allocated
//! - `NotInitialized`: queue used after `free()`
//!
//! ### Backpressure (normal flow)
//! - `QueueFull`: producer must count the drop and return, never retry
//! - `QueueEmpty`: consumer has drained everything
//!
//! ### Routing
//! - `DuplicateKey`, `TableFull`: insert-time conditions
//! - `NotFound`: identifier not routed, callers fall through to a default handler
//!
//! ### Instances
//! - `InstanceNotOwned`: handle belongs to someone else (shared interrupt line)
//!
//! ```rust
//! use irqflow_core::{ItemQueue, PipelineError};
//!
//! let queue = ItemQueue::new(1, 1).unwrap();
//! queue.push(&[7]).unwrap();
//! match queue.push(&[8]) {
//!     Err(PipelineError::QueueFull) => {
//!         // bump a drop counter, do not spin
//!     }
//!     _ => {}
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline status codes
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineError {
    /// Zero or out-of-range size, capacity or count
    #[error("Invalid parameter")]
    InvalidParam,

    /// Storage allocation failed
    #[error("Memory allocation failed")]
    OutOfMemory,

    /// Queue storage was released and not re-initialized
    #[error("Not initialized")]
    NotInitialized,

    /// Queue holds `capacity` items
    #[error("Queue is full")]
    QueueFull,

    /// Queue holds no items
    #[error("Queue is empty")]
    QueueEmpty,

    /// Identifier is already routed
    #[error("Identifier already routed")]
    DuplicateKey,

    /// Every router slot is occupied
    #[error("Routing table is full")]
    TableFull,

    /// Identifier is not routed
    #[error("Identifier not found")]
    NotFound,

    /// Handle is not registered with this registry
    #[error("Instance not owned")]
    InstanceNotOwned,
}

impl PipelineError {
    /// Static description, usable where `Display` is unavailable
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParam => "Invalid parameter",
            Self::OutOfMemory => "Memory allocation failed",
            Self::NotInitialized => "Not initialized",
            Self::QueueFull => "Queue is full",
            Self::QueueEmpty => "Queue is empty",
            Self::DuplicateKey => "Identifier already routed",
            Self::TableFull => "Routing table is full",
            Self::NotFound => "Identifier not found",
            Self::InstanceNotOwned => "Instance not owned",
        }
    }

    /// `QueueFull` or `QueueEmpty`
    pub const fn is_backpressure(&self) -> bool {
        matches!(self, Self::QueueFull | Self::QueueEmpty)
    }

    /// Outcomes that are part of normal operation rather than defects
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::QueueFull | Self::QueueEmpty | Self::NotFound | Self::InstanceNotOwned
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PipelineError {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str())
    }
}
