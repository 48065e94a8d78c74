//! Millisecond time sources
//!
//! Frames are stamped in interrupt context, so a source must be readable
//! from an ISR: no locks, no allocation. The tick is a `u32` millisecond
//! counter that wraps after ~49.7 days; compare stamps with [`elapsed_ms`].

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

/// Milliseconds since boot, wrapping
pub type Timestamp = u32;

/// Source of time for frame stamping
pub trait TimeSource {
    /// Current tick in milliseconds
    fn now_ms(&self) -> Timestamp;
}

/// Milliseconds from `earlier` to `later`, correct across one wrap
#[inline]
pub const fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u32 {
    later.wrapping_sub(earlier)
}

/// Tick counter advanced by a periodic interrupt (SysTick or a timer)
///
/// The tick interrupt is the only writer.
#[derive(Debug, Default)]
pub struct TickCounter {
    ticks: AtomicU32,
}

impl TickCounter {
    /// Counter at zero
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Call from the 1ms tick interrupt
    #[inline]
    pub fn on_tick(&self) {
        let now = self.ticks.load(Ordering::Relaxed);
        self.ticks.store(now.wrapping_add(1), Ordering::Relaxed);
    }
}

impl TimeSource for TickCounter {
    fn now_ms(&self) -> Timestamp {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    time: Cell<Timestamp>,
}

impl FixedTime {
    /// Source reporting `time` until changed
    pub fn new(time: Timestamp) -> Self {
        Self {
            time: Cell::new(time),
        }
    }

    /// Set the reported time
    pub fn set(&self, time: Timestamp) {
        self.time.set(time);
    }

    /// Move the reported time forward, wrapping
    pub fn advance(&self, ms: u32) {
        self.time.set(self.time.get().wrapping_add(ms));
    }
}

impl TimeSource for FixedTime {
    fn now_ms(&self) -> Timestamp {
        self.time.get()
    }
}
