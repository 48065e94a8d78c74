//! Multi-Instance Registry
//!
//! Several identical controllers (two CAN, three UART, ...) share one
//! interrupt callback per peripheral type. The vendor layer hands the
//! callback a reference to the hardware handle that fired; the registry maps
//! that reference back to a dense logical index by address comparison.
//!
//! ```text
//! register([&can1, &can2])        callback(&can2)
//!        ↓                               ↓
//!  ┌───┬────────┬──────────┐      resolve: scan for ptr == &can2
//!  │ 0 │ &can1  │ counters │             ↓
//!  │ 1 │ &can2  │ counters │ ←──── Some(InstanceIndex(1))
//!  └───┴────────┴──────────┘
//! ```
//!
//! Registered counts are single-digit, so `resolve` is a linear scan. The
//! registry is built once and has no mutating methods afterwards; the only
//! state that changes at runtime is the per-instance counters, each of which
//! has exactly one writing context.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use heapless::Vec;

use crate::errors::{PipelineError, PipelineResult};
use crate::queue::bump;

/// Dense logical index of a registered instance, assigned in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InstanceIndex(usize);

impl InstanceIndex {
    /// Index as `usize`, for addressing per-instance arrays
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl From<InstanceIndex> for usize {
    fn from(index: InstanceIndex) -> usize {
        index.get()
    }
}

impl fmt::Display for InstanceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for InstanceIndex {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "#{=usize}", self.0)
    }
}

/// Per-instance traffic counters
///
/// Writers:
/// - `received`, `dropped`: the instance's interrupt handler
/// - `sent`, `errors`: task context (transmit path)
///
/// Each counter has one writer, so increments are plain load/store pairs.
#[derive(Default)]
pub struct InstanceCounters {
    sent: AtomicU32,
    received: AtomicU32,
    errors: AtomicU32,
    dropped: AtomicU32,
}

impl InstanceCounters {
    /// All counters at zero
    pub const fn new() -> Self {
        Self {
            sent: AtomicU32::new(0),
            received: AtomicU32::new(0),
            errors: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Count a transmitted item
    #[inline]
    pub fn record_sent(&self) {
        bump(&self.sent);
    }

    /// Count an item pushed by the interrupt handler
    #[inline]
    pub fn record_received(&self) {
        bump(&self.received);
    }

    /// Count a transmit or configuration failure
    #[inline]
    pub fn record_error(&self) {
        bump(&self.errors);
    }

    /// Count an item the interrupt handler could not queue
    #[inline]
    pub fn record_dropped(&self) {
        bump(&self.dropped);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> InstanceStats {
        InstanceStats {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`InstanceCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InstanceStats {
    /// Items transmitted
    pub sent: u32,
    /// Items received and queued
    pub received: u32,
    /// Transmit or configuration failures
    pub errors: u32,
    /// Items lost to a full queue
    pub dropped: u32,
}

struct Entry<'hw, H: ?Sized> {
    handle: &'hw H,
    counters: InstanceCounters,
}

/// Handle-to-index table for one peripheral type
///
/// `N` is the compile-time ceiling (the number of interrupt vectors for the
/// peripheral type). The registry borrows handles; it never owns or frees them.
pub struct InstanceRegistry<'hw, H: ?Sized, const N: usize> {
    entries: Vec<Entry<'hw, H>, N>,
}

impl<'hw, H: ?Sized, const N: usize> InstanceRegistry<'hw, H, N> {
    /// Register the application's hardware handles
    ///
    /// Handles beyond `N` are ignored (clamped, not an error). Index `i` is
    /// assigned to `handles[i]`.
    ///
    /// ## Errors
    /// - `InvalidParam`: the same handle appears twice
    pub fn register(handles: &[&'hw H]) -> PipelineResult<Self> {
        if handles.len() > N {
            log_warn!(
                "registry: {} handles supplied, clamped to {}",
                handles.len(),
                N
            );
        }

        let mut entries: Vec<Entry<'hw, H>, N> = Vec::new();
        for &handle in handles.iter().take(N) {
            if entries.iter().any(|e| same_handle(e.handle, handle)) {
                return Err(PipelineError::InvalidParam);
            }
            // take(N) bounds the loop, so the push cannot overflow
            let _ = entries.push(Entry {
                handle,
                counters: InstanceCounters::new(),
            });
        }

        log_debug!("registry: {} instances", entries.len());
        Ok(Self { entries })
    }

    /// Logical index of `handle`, or `None` if it is not registered here
    ///
    /// `None` is routine: an interrupt line may be shared with handles that
    /// belong to someone else.
    #[inline]
    pub fn resolve(&self, handle: &H) -> Option<InstanceIndex> {
        self.entries
            .iter()
            .position(|e| same_handle(e.handle, handle))
            .map(InstanceIndex)
    }

    /// [`resolve`](Self::resolve) as a `Result` carrying `InstanceNotOwned`
    pub fn try_resolve(&self, handle: &H) -> PipelineResult<InstanceIndex> {
        self.resolve(handle).ok_or(PipelineError::InstanceNotOwned)
    }

    /// Index for a raw number, if that many instances are registered
    pub fn index(&self, raw: usize) -> Option<InstanceIndex> {
        (raw < self.entries.len()).then_some(InstanceIndex(raw))
    }

    /// Hardware handle registered at `index`
    pub fn handle(&self, index: InstanceIndex) -> Option<&'hw H> {
        self.entries.get(index.get()).map(|e| e.handle)
    }

    /// Counters of the instance at `index`
    pub fn counters(&self, index: InstanceIndex) -> Option<&InstanceCounters> {
        self.entries.get(index.get()).map(|e| &e.counters)
    }

    /// Registered instances in index order
    pub fn iter(&self) -> impl Iterator<Item = (InstanceIndex, &'hw H)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (InstanceIndex(i), e.handle))
    }

    /// Number of registered instances
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No instances registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compile-time ceiling
    pub const fn max_instances() -> usize {
        N
    }
}

/// Address identity; metadata of unsized handles is ignored
#[inline(always)]
fn same_handle<H: ?Sized>(a: &H, b: &H) -> bool {
    core::ptr::eq(a as *const H as *const (), b as *const H as *const ())
}
