//! Runtime driver configuration
//!
//! Defaults come from [`irqflow_core::constants`]. `validate()` runs inside
//! the driver constructors, so an invalid configuration never allocates.

use irqflow_core::constants::{
    CAN_FILTER_BANK_POOL, DEFAULT_CAN_RX_QUEUE, DEFAULT_DRAIN_LIMIT, DEFAULT_UART_RX_QUEUE,
    MAX_QUEUE_CAPACITY,
};
use irqflow_core::{PartitionStrategy, PipelineError, PipelineResult};

/// Default blocking transmit timeout for a UART
pub const DEFAULT_TX_TIMEOUT_MS: u32 = 1000;

/// Longest accepted transmit timeout
pub const MAX_TX_TIMEOUT_MS: u32 = 60_000;

/// CAN bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanConfig {
    /// Receive queue depth per controller
    pub rx_queue_capacity: usize,
    /// Frames handled per `process_rx` call
    pub drain_limit: usize,
    /// Filter banks shared by the controllers
    pub filter_bank_pool: u8,
    /// How the pool is split
    pub partition: PartitionStrategy,
}

impl Default for CanConfig {
    fn default() -> Self {
        Self {
            rx_queue_capacity: DEFAULT_CAN_RX_QUEUE,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            filter_bank_pool: CAN_FILTER_BANK_POOL,
            partition: PartitionStrategy::EvenSplit,
        }
    }
}

impl CanConfig {
    /// Set the receive queue depth
    pub const fn with_rx_queue_capacity(mut self, capacity: usize) -> Self {
        self.rx_queue_capacity = capacity;
        self
    }

    /// Set the per-call drain limit
    pub const fn with_drain_limit(mut self, limit: usize) -> Self {
        self.drain_limit = limit;
        self
    }

    /// Set the filter bank pool size
    pub const fn with_filter_bank_pool(mut self, banks: u8) -> Self {
        self.filter_bank_pool = banks;
        self
    }

    /// Set the partition strategy
    pub const fn with_partition(mut self, strategy: PartitionStrategy) -> Self {
        self.partition = strategy;
        self
    }

    /// Check ranges
    ///
    /// ## Errors
    /// - `InvalidParam`: zero or oversized queue, zero drain limit, empty pool
    pub fn validate(&self) -> PipelineResult<()> {
        if self.rx_queue_capacity == 0 || self.rx_queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(PipelineError::InvalidParam);
        }
        if self.drain_limit == 0 || self.filter_bank_pool == 0 {
            return Err(PipelineError::InvalidParam);
        }
        Ok(())
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UartConfig {
    /// Receive queue depth per UART, in bytes
    pub rx_queue_capacity: usize,
    /// Initial transmit timeout for every UART
    pub tx_timeout_ms: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            rx_queue_capacity: DEFAULT_UART_RX_QUEUE,
            tx_timeout_ms: DEFAULT_TX_TIMEOUT_MS,
        }
    }
}

impl UartConfig {
    /// Set the receive queue depth
    pub const fn with_rx_queue_capacity(mut self, capacity: usize) -> Self {
        self.rx_queue_capacity = capacity;
        self
    }

    /// Set the transmit timeout
    pub const fn with_tx_timeout_ms(mut self, ms: u32) -> Self {
        self.tx_timeout_ms = ms;
        self
    }

    /// Check ranges
    ///
    /// ## Errors
    /// - `InvalidParam`: zero or oversized queue, timeout outside `1..=60000`
    pub fn validate(&self) -> PipelineResult<()> {
        if self.rx_queue_capacity == 0 || self.rx_queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(PipelineError::InvalidParam);
        }
        validate_timeout(self.tx_timeout_ms)
    }
}

pub(crate) fn validate_timeout(ms: u32) -> PipelineResult<()> {
    if ms == 0 || ms > MAX_TX_TIMEOUT_MS {
        return Err(PipelineError::InvalidParam);
    }
    Ok(())
}
