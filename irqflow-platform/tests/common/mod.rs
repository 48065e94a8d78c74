//! Shared test harness: in-memory CAN controller and UART
//!
//! Each mock records what the driver asked of it and can be told to fail.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use irqflow_core::MessageHandler;
use irqflow_platform::{CanFrame, CanHardware, FilterConfig, HalError, UartHardware};

/// Default tick for frame stamping in tests.
pub const START_TICK: u32 = 1_000;

/// CAN controller with a software receive FIFO
#[derive(Default)]
pub struct MockCan {
    rx_fifo: RefCell<VecDeque<CanFrame>>,
    pub transmitted: RefCell<Vec<CanFrame>>,
    pub filters: RefCell<Vec<FilterConfig>>,
    pub started: Cell<bool>,
    pub fail_transmit: Cell<Option<HalError>>,
    pub fail_receive: Cell<Option<HalError>>,
    pub fail_start: Cell<Option<HalError>>,
    pub fail_filter: Cell<Option<HalError>>,
    pub latched_errors: Cell<u32>,
}

impl MockCan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a frame in the receive FIFO as if it came off the wire
    pub fn inject(&self, id: u16, data: &[u8]) {
        let frame = CanFrame::new(id, data).expect("valid test frame");
        self.rx_fifo.borrow_mut().push_back(frame);
    }

    pub fn pending(&self) -> usize {
        self.rx_fifo.borrow().len()
    }

    pub fn last_filter(&self) -> Option<FilterConfig> {
        self.filters.borrow().last().copied()
    }
}

impl CanHardware for MockCan {
    fn receive(&self) -> nb::Result<CanFrame, HalError> {
        if let Some(e) = self.fail_receive.take() {
            return Err(nb::Error::Other(e));
        }
        self.rx_fifo
            .borrow_mut()
            .pop_front()
            .ok_or(nb::Error::WouldBlock)
    }

    fn transmit(&self, frame: &CanFrame) -> Result<(), HalError> {
        if let Some(e) = self.fail_transmit.get() {
            return Err(e);
        }
        self.transmitted.borrow_mut().push(*frame);
        Ok(())
    }

    fn configure_filter(&self, filter: &FilterConfig) -> Result<(), HalError> {
        if let Some(e) = self.fail_filter.get() {
            return Err(e);
        }
        self.filters.borrow_mut().push(*filter);
        Ok(())
    }

    fn start(&self) -> Result<(), HalError> {
        if let Some(e) = self.fail_start.get() {
            return Err(e);
        }
        self.started.set(true);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.started.get()
    }

    fn hardware_error_count(&self) -> u32 {
        self.latched_errors.get()
    }
}

/// UART delivering one byte per receive-complete interrupt
pub struct MockUart {
    incoming: RefCell<VecDeque<u8>>,
    pub written: RefCell<Vec<u8>>,
    pub writes: Cell<u32>,
    pub last_timeout: Cell<u32>,
    pub rearms: Cell<u32>,
    pub ready: Cell<bool>,
    pub fail_write: Cell<Option<HalError>>,
}

impl Default for MockUart {
    fn default() -> Self {
        Self {
            incoming: RefCell::new(VecDeque::new()),
            written: RefCell::new(Vec::new()),
            writes: Cell::new(0),
            last_timeout: Cell::new(0),
            rearms: Cell::new(0),
            ready: Cell::new(true),
            fail_write: Cell::new(None),
        }
    }
}

impl MockUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a received byte for the next interrupt
    pub fn receive(&self, byte: u8) {
        self.incoming.borrow_mut().push_back(byte);
    }

    pub fn output(&self) -> Vec<u8> {
        self.written.borrow().clone()
    }
}

impl UartHardware for MockUart {
    fn take_rx_byte(&self) -> nb::Result<u8, HalError> {
        self.incoming
            .borrow_mut()
            .pop_front()
            .ok_or(nb::Error::WouldBlock)
    }

    fn rearm_rx(&self) -> Result<(), HalError> {
        self.rearms.set(self.rearms.get() + 1);
        Ok(())
    }

    fn write(&self, bytes: &[u8], timeout_ms: u32) -> Result<(), HalError> {
        self.last_timeout.set(timeout_ms);
        if let Some(e) = self.fail_write.get() {
            return Err(e);
        }
        self.written.borrow_mut().extend_from_slice(bytes);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.get()
    }
}

/// Handler that keeps every frame it is given
#[derive(Default)]
pub struct FrameLog {
    frames: RefCell<Vec<CanFrame>>,
}

impl FrameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> Vec<u16> {
        self.frames.borrow().iter().map(|f| f.id).collect()
    }

    pub fn frames(&self) -> Vec<CanFrame> {
        self.frames.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl MessageHandler<CanFrame> for FrameLog {
    fn handle(&self, frame: &CanFrame) {
        self.frames.borrow_mut().push(*frame);
    }
}
