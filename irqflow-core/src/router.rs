//! Identifier-Based Message Router
//!
//! ## Overview
//!
//! Maps a numeric message identifier (a CAN id, a command byte) to the
//! handler that owns it, so a drain loop can dispatch each popped item
//! without a linear scan. The table is an open-addressed hash table with
//! linear probing and a fixed slot count.
//!
//! ## Slot States
//!
//! ```text
//! Empty ──insert──→ Occupied ──delete──→ Tombstone
//!   ↑                                       │
//!   └────────── clear / last delete ────────┘
//!                    insert may reuse ──────┘
//! ```
//!
//! A deleted slot becomes a tombstone rather than `Empty`. Lookups probe
//! through tombstones, so an entry that was displaced past the deleted slot
//! stays reachable:
//!
//! ```text
//! home(a) = home(b) = 3
//! ┌─────┬─────┬─────┐          ┌─────┬─────┬─────┐
//! │  a  │  b  │     │ delete a │  †  │  b  │     │  lookup(b): 3 → † → 4 ✓
//! └─────┴─────┴─────┘          └─────┴─────┴─────┘
//!    3     4     5                3     4     5
//! ```
//!
//! Inserts remember the first tombstone on the probe path and reuse it once
//! the identifier is known not to be present further along.
//!
//! ## Hash
//!
//! Two xor-shift/multiply rounds (`0x045d9f3b`) spread identifiers that
//! differ in a few low bits (typical of CAN ids) across the table. The
//! function is pure, so an identifier always probes from the same home slot.

use core::mem;
use core::ops::Deref;

use crate::constants::DEFAULT_TABLE_SIZE;
use crate::errors::{PipelineError, PipelineResult};

/// Something that consumes routed messages
///
/// Implemented for every `Fn(&M)`, so plain functions and closures can be
/// routed as `&dyn MessageHandler<M>` side by side with handler structs.
pub trait MessageHandler<M: ?Sized> {
    /// Handle one message
    fn handle(&self, message: &M);
}

impl<M: ?Sized, F: Fn(&M)> MessageHandler<M> for F {
    fn handle(&self, message: &M) {
        self(message)
    }
}

/// Integer mixing function behind [`MessageRouter::home_slot`]
pub const fn mix(id: u32) -> u32 {
    let mut x = id;
    x ^= x >> 16;
    x = x.wrapping_mul(0x045d_9f3b);
    x ^= x >> 16;
    x = x.wrapping_mul(0x045d_9f3b);
    x ^= x >> 16;
    x
}

enum Slot<H> {
    Empty,
    Occupied { id: u32, handler: H },
    Tombstone,
}

/// Fixed-size identifier → handler table
///
/// Populated during setup, read-only while messages flow. No resizing:
/// `TABLE_SIZE` is chosen for the tens of identifiers a node is configured
/// with.
pub struct MessageRouter<H, const TABLE_SIZE: usize = { DEFAULT_TABLE_SIZE }> {
    slots: [Slot<H>; TABLE_SIZE],
    len: usize,
    tombstones: usize,
}

impl<H, const TABLE_SIZE: usize> MessageRouter<H, TABLE_SIZE> {
    const HAS_SLOTS: () = assert!(TABLE_SIZE > 0, "router needs at least one slot");

    /// Empty table
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HAS_SLOTS;
        Self {
            slots: core::array::from_fn(|_| Slot::Empty),
            len: 0,
            tombstones: 0,
        }
    }

    /// Slot where the probe sequence for `id` starts
    #[inline]
    pub fn home_slot(id: u32) -> usize {
        mix(id) as usize % TABLE_SIZE
    }

    /// Route `id` to `handler`
    ///
    /// ## Errors
    /// - `DuplicateKey`: `id` is already routed (ownership is never
    ///   silently reassigned)
    /// - `TableFull`: every slot holds a live entry
    pub fn insert(&mut self, id: u32, handler: H) -> PipelineResult<()> {
        let home = Self::home_slot(id);
        let mut reusable = None;
        let mut target = None;

        for step in 0..TABLE_SIZE {
            let idx = (home + step) % TABLE_SIZE;
            match &self.slots[idx] {
                Slot::Occupied { id: existing, .. } if *existing == id => {
                    return Err(PipelineError::DuplicateKey);
                }
                Slot::Occupied { .. } => {}
                Slot::Tombstone => {
                    reusable.get_or_insert(idx);
                }
                Slot::Empty => {
                    target = Some(reusable.unwrap_or(idx));
                    break;
                }
            }
        }

        let idx = target.or(reusable).ok_or(PipelineError::TableFull)?;
        if matches!(self.slots[idx], Slot::Tombstone) {
            self.tombstones -= 1;
        }
        self.slots[idx] = Slot::Occupied { id, handler };
        self.len += 1;

        log_debug!("router: id {} -> slot {} (home {})", id, idx, home);
        Ok(())
    }

    /// Route every identifier in `first..=last` to a clone of `handler`
    ///
    /// Stops at the first identifier that cannot be inserted and returns its
    /// error; identifiers routed before the failure stay routed.
    pub fn insert_range(&mut self, first: u32, last: u32, handler: H) -> PipelineResult<usize>
    where
        H: Clone,
    {
        if first > last {
            return Err(PipelineError::InvalidParam);
        }
        let mut inserted = 0;
        for id in first..=last {
            self.insert(id, handler.clone())?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Handler routed for `id`, or `None` for an unrouted identifier
    #[inline]
    pub fn lookup(&self, id: u32) -> Option<&H> {
        let idx = self.find(id)?;
        match &self.slots[idx] {
            Slot::Occupied { handler, .. } => Some(handler),
            _ => None,
        }
    }

    /// Whether `id` is routed
    pub fn contains(&self, id: u32) -> bool {
        self.find(id).is_some()
    }

    /// Remove the route for `id`, returning its handler
    ///
    /// The slot becomes a tombstone so entries probed past it stay
    /// reachable. When the table empties, tombstones are swept.
    ///
    /// ## Errors
    /// - `NotFound`: `id` is not routed
    pub fn delete(&mut self, id: u32) -> PipelineResult<H> {
        let idx = self.find(id).ok_or(PipelineError::NotFound)?;
        let removed = mem::replace(&mut self.slots[idx], Slot::Tombstone);
        self.len -= 1;
        self.tombstones += 1;

        if self.len == 0 {
            self.clear();
        }

        log_debug!("router: id {} removed from slot {}", id, idx);
        match removed {
            Slot::Occupied { handler, .. } => Ok(handler),
            // find() only returns occupied slots
            _ => Err(PipelineError::NotFound),
        }
    }

    /// Drop every route and tombstone
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.len = 0;
        self.tombstones = 0;
    }

    /// Call the handler routed for `id` with `message`
    ///
    /// Returns `false` when `id` is unrouted so the caller can fall through
    /// to its default handler.
    pub fn dispatch<M: ?Sized>(&self, id: u32, message: &M) -> bool
    where
        H: Deref,
        H::Target: MessageHandler<M>,
    {
        match self.lookup(id) {
            Some(handler) => {
                <H::Target as MessageHandler<M>>::handle(&**handler, message);
                true
            }
            None => false,
        }
    }

    /// Live `(id, handler)` entries in slot order
    pub fn entries(&self) -> impl Iterator<Item = (u32, &H)> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied { id, handler } => Some((*id, handler)),
            _ => None,
        })
    }

    /// Log the slot table at debug level
    pub fn dump(&self) {
        log_debug!(
            "router: {} live, {} tombstones, {} slots",
            self.len,
            self.tombstones,
            TABLE_SIZE
        );
        #[cfg(any(feature = "log", feature = "defmt"))]
        for (idx, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Occupied { id, .. } => {
                    log_debug!("  slot {}: id {}", idx, id);
                }
                Slot::Tombstone => {
                    log_debug!("  slot {}: deleted", idx);
                }
                Slot::Empty => {}
            }
        }
    }

    /// Number of routed identifiers
    pub fn len(&self) -> usize {
        self.len
    }

    /// No identifiers routed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots currently holding a tombstone
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Total slot count
    pub const fn capacity(&self) -> usize {
        TABLE_SIZE
    }

    /// Same probe sequence as `insert`; stops at the first empty slot or
    /// after `TABLE_SIZE` steps.
    fn find(&self, id: u32) -> Option<usize> {
        let home = Self::home_slot(id);
        for step in 0..TABLE_SIZE {
            let idx = (home + step) % TABLE_SIZE;
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied { id: existing, .. } if *existing == id => return Some(idx),
                _ => {}
            }
        }
        None
    }
}

impl<H, const TABLE_SIZE: usize> Default for MessageRouter<H, TABLE_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
