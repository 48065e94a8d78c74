//! Filter Bank Partitioner
//!
//! CAN controllers on the same die share one pool of acceptance filter
//! banks (28 on dual-bxCAN parts). Before any filter is programmed, the pool
//! is split into contiguous, non-overlapping ranges, one per controller:
//!
//! ```text
//! EvenSplit, 3 instances, 28 banks
//! ┌──────────── 10 ───────────┬────────── 9 ──────────┬────────── 9 ──────────┐
//! │ instance 0: [0, 10)       │ instance 1: [10, 19)  │ instance 2: [19, 28)  │
//! └───────────────────────────┴───────────────────────┴───────────────────────┘
//!                             ↑
//!                         boundary
//! ```
//!
//! The remainder of an uneven division goes to the first instances. The
//! start of the second range is the boundary handed to the hardware through
//! instance 0 ("the next controller's banks begin here").
//!
//! `OnePerInstance` reserves bank `i` for instance `i` and gives the last
//! instance everything from its bank to the end of the pool, so the ranges
//! still cover the whole pool.
//!
//! Computed once at initialization; pure, no I/O.

use heapless::Vec;

use crate::errors::{PipelineError, PipelineResult};

/// How the pool is divided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PartitionStrategy {
    /// `pool / n` banks each, remainder to the first instances
    #[default]
    EvenSplit,
    /// One bank per instance; the last instance keeps the rest of the pool
    OnePerInstance,
}

/// Half-open range of filter banks `[start, start + count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BankRange {
    /// First bank owned
    pub start: u8,
    /// Number of banks owned
    pub count: u8,
}

impl BankRange {
    /// One past the last bank owned
    pub const fn end(&self) -> u8 {
        self.start + self.count
    }

    /// Whether `bank` falls inside the range
    pub const fn contains(&self, bank: u8) -> bool {
        bank >= self.start && bank < self.end()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BankRange {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "[{=u8}, {=u8})", self.start, self.end())
    }
}

/// Per-instance ownership of a shared filter bank pool
///
/// `N` is the instance ceiling.
#[derive(Debug, Clone)]
pub struct FilterPartition<const N: usize> {
    ranges: Vec<BankRange, N>,
    pool_size: u8,
    strategy: PartitionStrategy,
}

impl<const N: usize> FilterPartition<N> {
    /// Split `pool_size` banks across `instance_count` instances
    ///
    /// ## Errors
    /// - `InvalidParam`: no instances, more than `N` instances, an empty pool,
    ///   or fewer banks than instances
    pub fn compute(
        instance_count: usize,
        pool_size: u8,
        strategy: PartitionStrategy,
    ) -> PipelineResult<Self> {
        if instance_count == 0
            || instance_count > N
            || pool_size == 0
            || instance_count > pool_size as usize
        {
            return Err(PipelineError::InvalidParam);
        }

        // instance_count <= pool_size <= u8::MAX from here on
        let n = instance_count as u8;
        let mut ranges: Vec<BankRange, N> = Vec::new();
        let mut start = 0u8;

        for i in 0..n {
            let count = match strategy {
                PartitionStrategy::EvenSplit => {
                    let base = pool_size / n;
                    let extra = u8::from(i < pool_size % n);
                    base + extra
                }
                PartitionStrategy::OnePerInstance if i + 1 == n => pool_size - start,
                PartitionStrategy::OnePerInstance => 1,
            };
            ranges
                .push(BankRange { start, count })
                .map_err(|_| PipelineError::InvalidParam)?;
            start += count;
        }

        let partition = Self {
            ranges,
            pool_size,
            strategy,
        };
        log_info!(
            "filter banks: {} instances over {} banks, boundary {}",
            instance_count,
            pool_size,
            partition.boundary().unwrap_or(pool_size)
        );
        Ok(partition)
    }

    /// Banks owned by instance `index`
    pub fn range(&self, index: usize) -> Option<BankRange> {
        self.ranges.get(index).copied()
    }

    /// Bank instance `index` programs its default filter into
    pub fn primary_bank(&self, index: usize) -> Option<u8> {
        self.range(index).map(|r| r.start)
    }

    /// First bank of the second instance, if there is one
    ///
    /// Instance 0 hands this to the hardware as the start of the next
    /// controller's banks.
    pub fn boundary(&self) -> Option<u8> {
        self.ranges.get(1).map(|r| r.start)
    }

    /// Instance owning `bank`
    pub fn owner_of(&self, bank: u8) -> Option<usize> {
        self.ranges.iter().position(|r| r.contains(bank))
    }

    /// Ranges in instance order
    pub fn iter(&self) -> impl Iterator<Item = BankRange> + '_ {
        self.ranges.iter().copied()
    }

    /// Number of instances partitioned
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// No instances partitioned (never true for a computed partition)
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total banks in the pool
    pub fn pool_size(&self) -> u8 {
        self.pool_size
    }

    /// Strategy used
    pub fn strategy(&self) -> PartitionStrategy {
        self.strategy
    }
}
