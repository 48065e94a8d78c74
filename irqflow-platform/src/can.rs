//! Multi-instance CAN bus
//!
//! One [`CanBus`] owns every registered controller:
//!
//! ```text
//! RX interrupt ─► on_rx_interrupt(hw) ─► resolve instance ─► stamp ─► rx queue[i]
//!                                                                        │
//! main loop ────► process_rx(i) ─► router.lookup(id) ─► handler          │
//!                                      └─ miss ─► default handler ◄──────┘
//! ```
//!
//! Setup (`new`, `route*`, `on_default`) takes `&mut self`; the steady-state
//! paths take `&self`, so the interrupt and task sides share one bus.
//! The routing table is shared by all controllers: an identifier means the
//! same thing on every bus the node is attached to.

use heapless::Vec;

use irqflow_core::constants::{DEFAULT_TABLE_SIZE, MAX_CAN_INSTANCES};
use irqflow_core::{
    FilterPartition, InstanceCounters, InstanceIndex, InstanceRegistry, InstanceStats,
    MessageHandler, MessageRouter, PipelineError, TypedQueue,
};

use crate::config::CanConfig;
use crate::errors::{PlatformError, PlatformResult};
use crate::frame::CanFrame;
use crate::hal::{CanHardware, FilterConfig};
use crate::time::TimeSource;

/// Frames taken from the hardware FIFO per interrupt (bxCAN FIFO depth)
pub const MAX_FRAMES_PER_IRQ: usize = 3;

/// Routed frame handler
pub type FrameHandler<'a> = &'a dyn MessageHandler<CanFrame>;

/// CAN controllers, their receive queues and the shared routing table
pub struct CanBus<'a, H: CanHardware + ?Sized, const N: usize = MAX_CAN_INSTANCES> {
    registry: InstanceRegistry<'a, H, N>,
    partition: FilterPartition<N>,
    rx_queues: Vec<TypedQueue<CanFrame>, N>,
    router: MessageRouter<FrameHandler<'a>, DEFAULT_TABLE_SIZE>,
    default_handler: Option<FrameHandler<'a>>,
    clock: &'a dyn TimeSource,
    config: CanConfig,
}

impl<'a, H: CanHardware + ?Sized, const N: usize> CanBus<'a, H, N> {
    /// Register controllers and bring them up
    ///
    /// For each handle, in order: allocate its receive queue, program an
    /// accept-all filter into its primary bank (the first controller also
    /// carries the bank boundary) and start it. Handles beyond `N` are
    /// ignored.
    ///
    /// ## Errors
    /// - `InvalidParam`: bad configuration, no handles, duplicate handle,
    ///   more controllers than filter banks
    /// - `OutOfMemory`: queue storage could not be allocated
    /// - `Hal`: a controller rejected its filter or failed to start
    pub fn new(
        handles: &[&'a H],
        config: CanConfig,
        clock: &'a dyn TimeSource,
    ) -> PlatformResult<Self> {
        config.validate()?;
        let registry = InstanceRegistry::register(handles)?;
        let partition =
            FilterPartition::compute(registry.len(), config.filter_bank_pool, config.partition)?;

        let mut rx_queues = Vec::new();
        for _ in 0..registry.len() {
            let queue = TypedQueue::new(config.rx_queue_capacity)?;
            rx_queues
                .push(queue)
                .map_err(|_| PipelineError::InvalidParam)?;
        }

        let bus = Self {
            registry,
            partition,
            rx_queues,
            router: MessageRouter::new(),
            default_handler: None,
            clock,
            config,
        };

        for (index, hw) in bus.registry.iter() {
            let filter = bus.filter_for(index, 0, 0)?;
            hw.configure_filter(&filter)?;
            hw.start()?;
            log_info!(
                "can {}: started, rx queue {}, filter bank {}",
                index,
                bus.config.rx_queue_capacity,
                filter.bank
            );
        }

        Ok(bus)
    }

    // ===== INTERRUPT CONTEXT =====

    /// Receive-pending interrupt entry point
    ///
    /// Moves up to [`MAX_FRAMES_PER_IRQ`] frames from the controller FIFO
    /// into the instance's queue, stamping each with the current tick.
    /// A full queue drops the frame and counts it. Returns the instance the
    /// handle belongs to, or `None` (and does nothing) for a foreign handle.
    pub fn on_rx_interrupt(&self, hw: &H) -> Option<InstanceIndex> {
        let index = self.registry.resolve(hw)?;
        let queue = self.rx_queues.get(index.get())?;
        let counters = self.registry.counters(index)?;

        for _ in 0..MAX_FRAMES_PER_IRQ {
            match hw.receive() {
                Ok(frame) => {
                    let frame = frame.stamped(self.clock.now_ms());
                    if queue.push(&frame).is_ok() {
                        counters.record_received();
                    } else {
                        counters.record_dropped();
                        log_trace!("can {}: rx queue full, dropped {}", index, frame.id);
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => {
                    counters.record_dropped();
                    break;
                }
            }
        }

        Some(index)
    }

    // ===== TASK CONTEXT =====

    /// Drain and dispatch up to `drain_limit` frames of one instance
    ///
    /// Each frame goes to its routed handler, else the default handler,
    /// else it is discarded. Returns the number of frames taken.
    pub fn process_rx(&self, instance: usize) -> PlatformResult<usize> {
        let index = self.index(instance)?;
        let queue = self
            .rx_queues
            .get(index.get())
            .ok_or(PlatformError::NoSuchInstance(instance))?;

        let mut processed = 0;
        for frame in queue.drain(self.config.drain_limit) {
            self.dispatch(&frame);
            processed += 1;
        }
        Ok(processed)
    }

    /// [`process_rx`](Self::process_rx) for every instance
    pub fn process_all_rx(&self) -> usize {
        (0..self.registry.len())
            .filter_map(|i| self.process_rx(i).ok())
            .sum()
    }

    fn dispatch(&self, frame: &CanFrame) {
        if self.router.dispatch(u32::from(frame.id), frame) {
            return;
        }
        if let Some(handler) = self.default_handler {
            handler.handle(frame);
        }
    }

    /// Transmit a frame
    ///
    /// Counts `sent` on success, `errors` on a controller failure.
    pub fn send(&self, instance: usize, frame: &CanFrame) -> PlatformResult<()> {
        let (hw, counters) = self.parts(instance)?;
        match hw.transmit(frame) {
            Ok(()) => {
                counters.record_sent();
                Ok(())
            }
            Err(e) => {
                counters.record_error();
                Err(e.into())
            }
        }
    }

    /// Transmit `data` (at most eight bytes) under standard identifier `id`
    pub fn send_raw(&self, instance: usize, id: u16, data: &[u8]) -> PlatformResult<()> {
        let frame = CanFrame::new(id, data)?;
        self.send(instance, &frame)
    }

    /// Replace instance's primary filter with an identifier/mask pair
    ///
    /// A zero mask accepts every identifier again.
    pub fn set_filter(&self, instance: usize, id: u16, mask: u16) -> PlatformResult<()> {
        let index = self.index(instance)?;
        let (hw, counters) = self.parts(instance)?;
        let filter = self.filter_for(index, id, mask)?;

        hw.configure_filter(&filter).map_err(|e| {
            counters.record_error();
            PlatformError::from(e)
        })?;
        log_debug!(
            "can {}: filter bank {} id {} mask {}",
            index,
            filter.bank,
            id,
            mask
        );
        Ok(())
    }

    fn filter_for(&self, index: InstanceIndex, id: u16, mask: u16) -> PlatformResult<FilterConfig> {
        let bank = self
            .partition
            .primary_bank(index.get())
            .ok_or(PlatformError::NoSuchInstance(index.get()))?;
        let slave_start_bank = if index.get() == 0 {
            self.partition.boundary()
        } else {
            None
        };
        Ok(FilterConfig {
            bank,
            id,
            mask,
            slave_start_bank,
        })
    }

    // ===== ROUTING =====

    /// Route identifier `id` to `handler`
    ///
    /// ## Errors
    /// - `DuplicateKey`: `id` is already routed
    /// - `TableFull`: no free slot
    pub fn route(&mut self, id: u16, handler: FrameHandler<'a>) -> PlatformResult<()> {
        self.router.insert(u32::from(id), handler)?;
        log_debug!("can: routed {}", id);
        Ok(())
    }

    /// Route every identifier in `first..=last` to `handler`
    ///
    /// Stops at the first identifier that fails; earlier ones stay routed.
    pub fn route_range(
        &mut self,
        first: u16,
        last: u16,
        handler: FrameHandler<'a>,
    ) -> PlatformResult<usize> {
        let routed = self
            .router
            .insert_range(u32::from(first), u32::from(last), handler)?;
        log_debug!("can: routed {} ids from {}", routed, first);
        Ok(routed)
    }

    /// Remove the route for `id`
    pub fn unroute(&mut self, id: u16) -> PlatformResult<()> {
        self.router.delete(u32::from(id))?;
        log_debug!("can: unrouted {}", id);
        Ok(())
    }

    /// Handler for frames whose identifier is not routed
    pub fn on_default(&mut self, handler: FrameHandler<'a>) {
        self.default_handler = Some(handler);
    }

    /// Routing table, for inspection
    pub fn router(&self) -> &MessageRouter<FrameHandler<'a>, DEFAULT_TABLE_SIZE> {
        &self.router
    }

    // ===== STATUS =====

    /// Frames waiting in the instance's queue
    pub fn available(&self, instance: usize) -> PlatformResult<usize> {
        let index = self.index(instance)?;
        Ok(self.rx_queues.get(index.get()).map_or(0, TypedQueue::len))
    }

    /// Counter snapshot
    pub fn stats(&self, instance: usize) -> PlatformResult<InstanceStats> {
        let (_, counters) = self.parts(instance)?;
        Ok(counters.snapshot())
    }

    /// Driver-side failures plus the controller's latched error code
    pub fn error_count(&self, instance: usize) -> PlatformResult<u32> {
        let (hw, counters) = self.parts(instance)?;
        let stats = counters.snapshot();
        Ok(stats
            .errors
            .saturating_add(stats.dropped)
            .saturating_add(hw.hardware_error_count()))
    }

    /// Controller reports ready; `false` for an unknown instance
    pub fn is_ready(&self, instance: usize) -> bool {
        self.parts(instance).is_ok_and(|(hw, _)| hw.is_ready())
    }

    /// Instance `hw` is registered as
    pub fn instance_of(&self, hw: &H) -> Option<InstanceIndex> {
        self.registry.resolve(hw)
    }

    /// Receive queue of an instance
    pub fn rx_queue(&self, instance: usize) -> Option<&TypedQueue<CanFrame>> {
        self.rx_queues.get(instance)
    }

    /// Registered controller count
    pub fn instance_count(&self) -> usize {
        self.registry.len()
    }

    /// Filter bank split
    pub fn partition(&self) -> &FilterPartition<N> {
        &self.partition
    }

    /// Active configuration
    pub fn config(&self) -> &CanConfig {
        &self.config
    }

    fn index(&self, instance: usize) -> PlatformResult<InstanceIndex> {
        self.registry
            .index(instance)
            .ok_or(PlatformError::NoSuchInstance(instance))
    }

    fn parts(&self, instance: usize) -> PlatformResult<(&'a H, &InstanceCounters)> {
        let index = self.index(instance)?;
        self.registry
            .handle(index)
            .zip(self.registry.counters(index))
            .ok_or(PlatformError::NoSuchInstance(instance))
    }
}
