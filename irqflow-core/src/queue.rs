//! ISR-Safe Bounded Item Queue
//!
//! ## Overview
//!
//! A fixed-capacity circular queue of fixed-size items, the foundation every
//! peripheral driver builds on. Exactly one producer (the interrupt handler of
//! one peripheral instance) pushes; exactly one consumer (the task-context
//! poll loop) pops.
//!
//! ```text
//! Producer (ISR)                          Consumer (task)
//!      ↓                                        ↓
//!   push ──→ [ cs: copy, head++, count++ ]   pop ──→ [ cs: copy, tail++, count-- ]
//!      ↓                                        ↓
//!   QueueFull → count the drop, return      QueueEmpty → done draining
//! ```
//!
//! ## Layout
//!
//! ```text
//! capacity = 5, item_size = 4
//! ┌────┬────┬────┬────┬────┐
//! │ i0 │ i1 │ i2 │    │    │   storage: capacity × item_size bytes
//! └────┴────┴────┴────┴────┘
//!   ↑              ↑
//!  tail           head
//! ```
//!
//! Indices advance modulo `capacity`, so capacity does not have to be a power
//! of two. `count` disambiguates full from empty: every slot is usable.
//!
//! ## Synchronization
//!
//! The `head`/`tail`/`count` triple lives in a
//! `critical_section::Mutex<RefCell<_>>`. Each push or pop takes one short
//! critical section that copies one item and updates a few integers. A
//! concurrent pop never sees a half-updated index. `len()` reads a mirror of
//! `count` that is written inside the critical section, so status queries do
//! not mask interrupts.
//!
//! ## Typed Items
//!
//! [`TypedQueue`] wraps an [`ItemQueue`] for any type implementing
//! [`QueueItem`], a fixed-size encode/decode contract. Encoding happens before
//! the critical section is entered.

use alloc::vec::Vec;
use core::cell::RefCell;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use critical_section::Mutex;

use crate::constants::{MAX_ITEM_SIZE, MAX_QUEUE_CAPACITY};
use crate::errors::{PipelineError, PipelineResult};

/// Increment a counter that only one context ever writes.
///
/// A plain load/store pair is enough when there is a single writer, and it
/// works on cores without atomic read-modify-write instructions.
#[inline(always)]
pub(crate) fn bump(counter: &AtomicU32) {
    let next = counter.load(Ordering::Relaxed).wrapping_add(1);
    counter.store(next, Ordering::Relaxed);
}

/// Queue statistics
///
/// `pushed`, `dropped` and `max_depth` are written by the producer only,
/// `popped` by the consumer only.
pub struct QueueStats {
    /// Items accepted by `push`
    pub pushed: AtomicU32,
    /// Items removed by `pop`
    pub popped: AtomicU32,
    /// Pushes rejected with `QueueFull`
    pub dropped: AtomicU32,
    /// Highest depth observed after a push
    pub max_depth: AtomicU32,
}

impl QueueStats {
    const fn new() -> Self {
        Self {
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_depth: AtomicU32::new(0),
        }
    }

    fn update_max_depth(&self, depth: usize) {
        let depth = depth as u32;
        if depth > self.max_depth.load(Ordering::Relaxed) {
            self.max_depth.store(depth, Ordering::Relaxed);
        }
    }

    fn reset(&self) {
        self.pushed.store(0, Ordering::Relaxed);
        self.popped.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.max_depth.store(0, Ordering::Relaxed);
    }
}

/// Indices and storage shared between the two contexts
struct Ring {
    storage: Vec<u8>,
    head: usize,
    tail: usize,
    count: usize,
}

impl Ring {
    const fn empty() -> Self {
        Self {
            storage: Vec::new(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }
}

/// Fixed-capacity queue of fixed-size byte items
///
/// ## Invariants
///
/// - `0 <= count <= capacity`
/// - `head < capacity` and `tail < capacity`
/// - storage is exactly `capacity × item_size` bytes and is owned by the queue
///
/// `init`/`free` take `&mut self`: storage can only be replaced when no
/// producer holds a reference.
pub struct ItemQueue {
    ring: Mutex<RefCell<Ring>>,
    /// Mirror of `count`, written inside the critical section
    len: AtomicUsize,
    item_size: usize,
    capacity: usize,
    stats: QueueStats,
}

impl ItemQueue {
    /// Queue with no storage; every operation returns `NotInitialized`
    /// until [`init`](Self::init) succeeds.
    pub const fn unallocated() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(Ring::empty())),
            len: AtomicUsize::new(0),
            item_size: 0,
            capacity: 0,
            stats: QueueStats::new(),
        }
    }

    /// Allocate a queue of `capacity` items of `item_size` bytes each
    ///
    /// ## Errors
    /// - `InvalidParam`: either argument is zero, or capacity exceeds
    ///   [`MAX_QUEUE_CAPACITY`]
    /// - `OutOfMemory`: storage allocation failed
    pub fn new(item_size: usize, capacity: usize) -> PipelineResult<Self> {
        let mut queue = Self::unallocated();
        queue.init(item_size, capacity)?;
        Ok(queue)
    }

    /// (Re-)allocate storage, discarding anything queued before
    pub fn init(&mut self, item_size: usize, capacity: usize) -> PipelineResult<()> {
        if item_size == 0 || capacity == 0 || capacity > MAX_QUEUE_CAPACITY {
            return Err(PipelineError::InvalidParam);
        }
        let bytes = item_size
            .checked_mul(capacity)
            .ok_or(PipelineError::InvalidParam)?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(bytes)
            .map_err(|_| PipelineError::OutOfMemory)?;
        storage.resize(bytes, 0);

        *self.ring.get_mut().get_mut() = Ring {
            storage,
            head: 0,
            tail: 0,
            count: 0,
        };
        self.len.store(0, Ordering::Release);
        self.item_size = item_size;
        self.capacity = capacity;
        self.stats.reset();

        log_debug!("queue allocated: {} x {} bytes", capacity, item_size);
        Ok(())
    }

    /// Release storage. The queue is unusable until re-initialized.
    pub fn free(&mut self) {
        *self.ring.get_mut().get_mut() = Ring::empty();
        self.len.store(0, Ordering::Release);
        self.item_size = 0;
        self.capacity = 0;
    }

    /// Whether storage is currently allocated
    pub fn is_initialized(&self) -> bool {
        self.capacity != 0
    }

    /// Push one item (producer side, interrupt-safe)
    ///
    /// `item` must be exactly `item_size` bytes. Never overwrites: when full
    /// the item is dropped, `stats().dropped` is bumped and `QueueFull` is
    /// returned.
    pub fn push(&self, item: &[u8]) -> PipelineResult<()> {
        if !self.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        if item.len() != self.item_size {
            return Err(PipelineError::InvalidParam);
        }

        let size = self.item_size;
        let capacity = self.capacity;
        let depth = critical_section::with(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            if ring.count >= capacity {
                return None;
            }
            let start = ring.head * size;
            ring.storage[start..start + size].copy_from_slice(item);
            ring.head = (ring.head + 1) % capacity;
            ring.count += 1;
            self.len.store(ring.count, Ordering::Release);
            Some(ring.count)
        });

        match depth {
            Some(depth) => {
                bump(&self.stats.pushed);
                self.stats.update_max_depth(depth);
                Ok(())
            }
            None => {
                bump(&self.stats.dropped);
                log_trace!("queue full, item dropped");
                Err(PipelineError::QueueFull)
            }
        }
    }

    /// Pop the oldest item into `out` (consumer side)
    ///
    /// `out` must be exactly `item_size` bytes.
    pub fn pop(&self, out: &mut [u8]) -> PipelineResult<()> {
        self.take(Some(out), true)
    }

    /// Copy the oldest item into `out` without removing it
    pub fn peek(&self, out: &mut [u8]) -> PipelineResult<()> {
        self.take(Some(out), false)
    }

    /// Remove the oldest item without copying it out
    pub fn skip(&self) -> PipelineResult<()> {
        self.take(None, true)
    }

    fn take(&self, out: Option<&mut [u8]>, advance: bool) -> PipelineResult<()> {
        if !self.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        if matches!(&out, Some(buf) if buf.len() != self.item_size) {
            return Err(PipelineError::InvalidParam);
        }

        let size = self.item_size;
        let capacity = self.capacity;
        critical_section::with(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            if ring.count == 0 {
                return Err(PipelineError::QueueEmpty);
            }
            if let Some(out) = out {
                let start = ring.tail * size;
                out.copy_from_slice(&ring.storage[start..start + size]);
            }
            if advance {
                ring.tail = (ring.tail + 1) % capacity;
                ring.count -= 1;
                self.len.store(ring.count, Ordering::Release);
            }
            Ok(())
        })?;

        if advance {
            bump(&self.stats.popped);
        }
        Ok(())
    }

    /// Discard every queued item (consumer side)
    pub fn clear(&self) {
        critical_section::with(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            ring.head = 0;
            ring.tail = 0;
            ring.count = 0;
            self.len.store(0, Ordering::Release);
        });
    }

    /// Number of queued items
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// No items queued
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `len() == capacity()`; an unallocated queue is never full
    #[inline]
    pub fn is_full(&self) -> bool {
        self.is_initialized() && self.len() >= self.capacity
    }

    /// Maximum number of items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of one item in bytes
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

impl Default for ItemQueue {
    fn default() -> Self {
        Self::unallocated()
    }
}

/// Fixed-size binary form of a queued item
///
/// `encode` writes exactly `SIZE` bytes; `decode` reads exactly `SIZE` bytes
/// produced by `encode`.
pub trait QueueItem: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Serialize into `out` (`out.len() == SIZE`)
    fn encode(&self, out: &mut [u8]);

    /// Deserialize from `bytes` (`bytes.len() == SIZE`)
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_queue_item_le {
    ($($ty:ty),*) => {
        $(
            impl QueueItem for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_queue_item_le!(u8, u16, u32, u64, i16, i32);

/// Item queue carrying values of one [`QueueItem`] type
///
/// ```rust
/// use irqflow_core::queue::TypedQueue;
///
/// let queue: TypedQueue<u16> = TypedQueue::new(8).unwrap();
/// queue.push(&0x123).unwrap();
/// assert_eq!(queue.pop().unwrap(), 0x123);
/// ```
pub struct TypedQueue<T: QueueItem> {
    inner: ItemQueue,
    _item: PhantomData<fn(T) -> T>,
}

impl<T: QueueItem> TypedQueue<T> {
    /// Allocate a queue for `capacity` items of `T`
    pub fn new(capacity: usize) -> PipelineResult<Self> {
        if T::SIZE > MAX_ITEM_SIZE {
            return Err(PipelineError::InvalidParam);
        }
        Ok(Self {
            inner: ItemQueue::new(T::SIZE, capacity)?,
            _item: PhantomData,
        })
    }

    /// Push one item (producer side, interrupt-safe)
    pub fn push(&self, item: &T) -> PipelineResult<()> {
        let mut scratch = [0u8; MAX_ITEM_SIZE];
        let bytes = &mut scratch[..T::SIZE];
        item.encode(bytes);
        self.inner.push(bytes)
    }

    /// Pop the oldest item (consumer side)
    pub fn pop(&self) -> PipelineResult<T> {
        let mut scratch = [0u8; MAX_ITEM_SIZE];
        let bytes = &mut scratch[..T::SIZE];
        self.inner.pop(bytes)?;
        Ok(T::decode(bytes))
    }

    /// Copy of the oldest item, left in place
    pub fn peek(&self) -> PipelineResult<T> {
        let mut scratch = [0u8; MAX_ITEM_SIZE];
        let bytes = &mut scratch[..T::SIZE];
        self.inner.peek(bytes)?;
        Ok(T::decode(bytes))
    }

    /// Pop items until the queue is empty or `limit` items were yielded
    pub fn drain(&self, limit: usize) -> Drain<'_, T> {
        Drain {
            queue: self,
            remaining: limit,
        }
    }

    /// (Re-)allocate storage for `capacity` items, discarding anything queued
    pub fn init(&mut self, capacity: usize) -> PipelineResult<()> {
        self.inner.init(T::SIZE, capacity)
    }

    /// Release storage. The queue is unusable until [`init`](Self::init).
    pub fn free(&mut self) {
        self.inner.free();
    }

    /// Untyped view of the queue
    pub fn as_raw(&self) -> &ItemQueue {
        &self.inner
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// No items queued
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Queue holds `capacity()` items
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Maximum number of items
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Queue statistics
    pub fn stats(&self) -> &QueueStats {
        self.inner.stats()
    }
}

/// Bounded draining iterator returned by [`TypedQueue::drain`]
pub struct Drain<'a, T: QueueItem> {
    queue: &'a TypedQueue<T>,
    remaining: usize,
}

impl<'a, T: QueueItem> Iterator for Drain<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.queue.pop().ok()?;
        self.remaining -= 1;
        Some(item)
    }
}
