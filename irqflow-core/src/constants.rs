//! Configuration Constants
//!
//! Compile-time ceilings and defaults for the pipeline. Runtime sizes chosen
//! by drivers (queue capacity, item size) are validated against these.

// ===== QUEUES =====

/// Largest capacity an item queue accepts.
///
/// Queue storage is `capacity × item_size` bytes of RAM allocated once at
/// initialization; 1024 items of a 16-byte CAN frame is already 16KB.
pub const MAX_QUEUE_CAPACITY: usize = 1024;

/// Default receive queue depth for one CAN controller.
///
/// A 1Mbit/s bus delivers at most ~8 frames per millisecond; 32 slots
/// absorb a 4ms poll gap.
pub const DEFAULT_CAN_RX_QUEUE: usize = 32;

/// Default receive queue depth for one UART, in bytes.
pub const DEFAULT_UART_RX_QUEUE: usize = 128;

/// Items drained per `process` call before returning to the caller.
///
/// Bounds worst-case task-context latency when the producer keeps up with
/// the consumer.
pub const DEFAULT_DRAIN_LIMIT: usize = 64;

// ===== INSTANCES =====

/// CAN controllers on the target (bxCAN master + slave).
pub const MAX_CAN_INSTANCES: usize = 2;

/// UARTs that can be registered.
pub const MAX_UART_INSTANCES: usize = 3;

// ===== ROUTER =====

/// Slot count of the message router.
///
/// Sized for tens of identifiers known at configuration time.
pub const DEFAULT_TABLE_SIZE: usize = 50;

// ===== FILTER BANKS =====

/// Acceptance filter banks shared by the CAN controllers.
pub const CAN_FILTER_BANK_POOL: u8 = 28;

/// Largest item a [`TypedQueue`](crate::queue::TypedQueue) can carry, in bytes.
///
/// Typed pushes encode into a stack scratch buffer of this size before the
/// critical section is entered.
pub const MAX_ITEM_SIZE: usize = 64;
