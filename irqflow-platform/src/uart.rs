//! Multi-instance UART byte stream
//!
//! Reception is one byte per interrupt: the completion interrupt hands the
//! byte to [`UartPort::on_rx_interrupt`], which queues it and re-arms the
//! next receive. Transmission is blocking with a per-instance timeout.

use heapless::Vec;

use irqflow_core::constants::MAX_UART_INSTANCES;
use irqflow_core::{
    InstanceCounters, InstanceIndex, InstanceRegistry, InstanceStats, PipelineError, TypedQueue,
};

use crate::config::{validate_timeout, UartConfig};
use crate::errors::{PlatformError, PlatformResult};
use crate::hal::UartHardware;

/// Line terminator appended by [`UartPort::println`]
pub const LINE_ENDING: &[u8] = b"\r\n";

/// UARTs and their receive queues
pub struct UartPort<'a, H: UartHardware + ?Sized, const N: usize = MAX_UART_INSTANCES> {
    registry: InstanceRegistry<'a, H, N>,
    rx_queues: Vec<TypedQueue<u8>, N>,
    timeouts: Vec<u32, N>,
    config: UartConfig,
}

impl<'a, H: UartHardware + ?Sized, const N: usize> UartPort<'a, H, N> {
    /// Register UARTs, allocate their queues and arm reception
    ///
    /// ## Errors
    /// - `InvalidParam`: bad configuration, no handles, duplicate handle
    /// - `OutOfMemory`: queue storage could not be allocated
    /// - `Hal`: a UART refused to arm reception
    pub fn new(handles: &[&'a H], config: UartConfig) -> PlatformResult<Self> {
        config.validate()?;
        let registry = InstanceRegistry::register(handles)?;
        if registry.is_empty() {
            return Err(PipelineError::InvalidParam.into());
        }

        let mut rx_queues = Vec::new();
        let mut timeouts = Vec::new();
        for (_index, hw) in registry.iter() {
            let queue = TypedQueue::new(config.rx_queue_capacity)?;
            rx_queues
                .push(queue)
                .map_err(|_| PipelineError::InvalidParam)?;
            timeouts
                .push(config.tx_timeout_ms)
                .map_err(|_| PipelineError::InvalidParam)?;
            hw.rearm_rx()?;
            log_info!(
                "uart {}: rx queue {}, timeout {} ms",
                _index,
                config.rx_queue_capacity,
                config.tx_timeout_ms
            );
        }

        Ok(Self {
            registry,
            rx_queues,
            timeouts,
            config,
        })
    }

    /// Receive-complete interrupt entry point
    ///
    /// Queues the received byte (counting a drop if the queue is full) and
    /// re-arms reception. `None` for a foreign handle.
    pub fn on_rx_interrupt(&self, hw: &H) -> Option<InstanceIndex> {
        let index = self.registry.resolve(hw)?;
        let queue = self.rx_queues.get(index.get())?;
        let counters = self.registry.counters(index)?;

        match hw.take_rx_byte() {
            Ok(byte) => {
                if queue.push(&byte).is_ok() {
                    counters.record_received();
                } else {
                    counters.record_dropped();
                }
            }
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(_)) => counters.record_dropped(),
        }

        if hw.rearm_rx().is_err() {
            log_trace!("uart {}: rx re-arm failed", index);
        }
        Some(index)
    }

    /// Next received byte, `None` when nothing is queued
    pub fn read(&self, instance: usize) -> Option<u8> {
        self.rx_queues.get(self.index(instance).ok()?.get())?.pop().ok()
    }

    /// Fill `buf` from the queue; returns the byte count copied
    pub fn read_bytes(&self, instance: usize, buf: &mut [u8]) -> usize {
        let Some(queue) = self
            .index(instance)
            .ok()
            .and_then(|index| self.rx_queues.get(index.get()))
        else {
            return 0;
        };

        let limit = buf.len();
        let mut count = 0;
        for (slot, byte) in buf.iter_mut().zip(queue.drain(limit)) {
            *slot = byte;
            count += 1;
        }
        count
    }

    /// Bytes waiting in the instance's queue
    pub fn available(&self, instance: usize) -> PlatformResult<usize> {
        let index = self.index(instance)?;
        Ok(self.rx_queues.get(index.get()).map_or(0, TypedQueue::len))
    }

    /// Blocking transmit
    ///
    /// `sent` counts completed writes, not bytes.
    ///
    /// ## Errors
    /// - `InvalidParam`: empty `bytes`
    /// - `Busy`: the UART is mid-transfer
    /// - `Hal`: transmit failed or timed out
    pub fn write(&self, instance: usize, bytes: &[u8]) -> PlatformResult<()> {
        if bytes.is_empty() {
            return Err(PipelineError::InvalidParam.into());
        }
        let (hw, counters) = self.parts(instance)?;
        if !hw.is_ready() {
            counters.record_error();
            return Err(PlatformError::Busy);
        }

        let timeout = self
            .timeouts
            .get(instance)
            .copied()
            .unwrap_or(self.config.tx_timeout_ms);
        match hw.write(bytes, timeout) {
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

    /// Write a pre-formatted string; an empty string is a no-op
    pub fn print(&self, instance: usize, text: &str) -> PlatformResult<()> {
        if text.is_empty() {
            self.index(instance)?;
            return Ok(());
        }
        self.write(instance, text.as_bytes())
    }

    /// [`print`](Self::print) followed by CR LF
    pub fn println(&self, instance: usize, text: &str) -> PlatformResult<()> {
        self.print(instance, text)?;
        self.write(instance, LINE_ENDING)
    }

    /// Change one instance's transmit timeout
    ///
    /// ## Errors
    /// - `InvalidParam`: `ms` outside `1..=60000`
    pub fn set_timeout(&mut self, instance: usize, ms: u32) -> PlatformResult<()> {
        validate_timeout(ms)?;
        let index = self.index(instance)?;
        if let Some(slot) = self.timeouts.get_mut(index.get()) {
            *slot = ms;
        }
        Ok(())
    }

    /// Current transmit timeout of an instance
    pub fn timeout(&self, instance: usize) -> PlatformResult<u32> {
        let index = self.index(instance)?;
        self.timeouts
            .get(index.get())
            .copied()
            .ok_or(PlatformError::NoSuchInstance(instance))
    }

    /// Counter snapshot
    pub fn stats(&self, instance: usize) -> PlatformResult<InstanceStats> {
        let (_, counters) = self.parts(instance)?;
        Ok(counters.snapshot())
    }

    /// UART reports idle; `false` for an unknown instance
    pub fn is_ready(&self, instance: usize) -> bool {
        self.parts(instance).is_ok_and(|(hw, _)| hw.is_ready())
    }

    /// Registered UART count
    pub fn instance_count(&self) -> usize {
        self.registry.len()
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
