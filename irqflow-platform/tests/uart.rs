//! UART integration tests

mod common;

use common::MockUart;
use irqflow_core::PipelineError;
use irqflow_platform::config::{DEFAULT_TX_TIMEOUT_MS, MAX_TX_TIMEOUT_MS};
use irqflow_platform::{HalError, PlatformError, UartConfig, UartPort};

/// Byte queue small enough to overflow by hand.
const SMALL_QUEUE: usize = 4;

fn port<'a>(handles: &[&'a MockUart]) -> UartPort<'a, MockUart> {
    UartPort::new(handles, UartConfig::default()).expect("uart comes up")
}

fn feed(port: &UartPort<'_, MockUart>, hw: &MockUart, bytes: &[u8]) {
    for &byte in bytes {
        hw.receive(byte);
        port.on_rx_interrupt(hw);
    }
}

#[test]
fn test_bring_up_arms_reception() {
    let uart1 = MockUart::new();
    let uart2 = MockUart::new();

    let port = port(&[&uart1, &uart2]);

    assert_eq!(port.instance_count(), 2);
    assert_eq!(uart1.rearms.get(), 1);
    assert_eq!(uart2.rearms.get(), 1);
    assert_eq!(port.timeout(0), Ok(DEFAULT_TX_TIMEOUT_MS));
}

#[test]
fn test_bytes_arrive_in_order_on_their_instance() {
    let uart1 = MockUart::new();
    let uart2 = MockUart::new();
    let port = port(&[&uart1, &uart2]);

    feed(&port, &uart2, b"AT\r");

    assert_eq!(port.available(0), Ok(0));
    assert_eq!(port.available(1), Ok(3));
    assert_eq!(uart2.rearms.get(), 4);

    assert_eq!(port.read(1), Some(b'A'));
    assert_eq!(port.read(1), Some(b'T'));
    assert_eq!(port.read(1), Some(b'\r'));
    assert_eq!(port.read(1), None);
    assert_eq!(port.stats(1).unwrap().received, 3);
}

#[test]
fn test_read_bytes_copies_what_is_available() {
    let uart1 = MockUart::new();
    let port = port(&[&uart1]);
    feed(&port, &uart1, b"hello");

    let mut buf = [0u8; 3];
    assert_eq!(port.read_bytes(0, &mut buf), 3);
    assert_eq!(&buf, b"hel");

    let mut rest = [0u8; 8];
    assert_eq!(port.read_bytes(0, &mut rest), 2);
    assert_eq!(&rest[..2], b"lo");

    assert_eq!(port.read_bytes(0, &mut rest), 0);
    assert_eq!(port.read_bytes(7, &mut rest), 0);
}

#[test]
fn test_overflow_drops_newest_bytes() {
    let uart1 = MockUart::new();
    let config = UartConfig::default().with_rx_queue_capacity(SMALL_QUEUE);
    let port: UartPort<'_, MockUart> = UartPort::new(&[&uart1], config).unwrap();

    feed(&port, &uart1, b"abcdef");

    let stats = port.stats(0).unwrap();
    assert_eq!(stats.received, 4);
    assert_eq!(stats.dropped, 2);

    let mut buf = [0u8; 8];
    let n = port.read_bytes(0, &mut buf);
    assert_eq!(&buf[..n], b"abcd");
}

#[test]
fn test_foreign_handle_is_ignored() {
    let uart1 = MockUart::new();
    let stranger = MockUart::new();
    let port = port(&[&uart1]);

    stranger.receive(0x55);
    assert!(port.on_rx_interrupt(&stranger).is_none());
    assert_eq!(stranger.rearms.get(), 0);
    assert_eq!(port.available(0), Ok(0));
}

#[test]
fn test_write_uses_instance_timeout() {
    let uart1 = MockUart::new();
    let mut port = port(&[&uart1]);

    port.write(0, b"ping").unwrap();
    assert_eq!(uart1.last_timeout.get(), DEFAULT_TX_TIMEOUT_MS);

    port.set_timeout(0, 50).unwrap();
    port.write(0, b"pong").unwrap();
    assert_eq!(uart1.last_timeout.get(), 50);

    assert_eq!(uart1.output(), b"pingpong".to_vec());
    assert_eq!(port.stats(0).unwrap().sent, 2);
}

#[test]
fn test_timeout_range_is_checked() {
    let uart1 = MockUart::new();
    let mut port = port(&[&uart1]);

    let invalid = Err(PlatformError::Pipeline(PipelineError::InvalidParam));
    assert_eq!(port.set_timeout(0, 0), invalid);
    assert_eq!(port.set_timeout(0, MAX_TX_TIMEOUT_MS + 1), invalid);
    assert_eq!(port.set_timeout(3, 10), Err(PlatformError::NoSuchInstance(3)));
    assert_eq!(port.timeout(0), Ok(DEFAULT_TX_TIMEOUT_MS));
}

#[test]
fn test_print_and_println() {
    let uart1 = MockUart::new();
    let port = port(&[&uart1]);

    port.print(0, "").unwrap();
    assert_eq!(uart1.writes.get(), 0);

    port.print(0, "temp=").unwrap();
    port.println(0, "21").unwrap();

    assert_eq!(uart1.output(), b"temp=21\r\n".to_vec());
    assert_eq!(port.print(2, ""), Err(PlatformError::NoSuchInstance(2)));
}

#[test]
fn test_write_failures() {
    let uart1 = MockUart::new();
    let port = port(&[&uart1]);

    assert_eq!(
        port.write(0, &[]),
        Err(PlatformError::Pipeline(PipelineError::InvalidParam))
    );

    uart1.ready.set(false);
    assert!(!port.is_ready(0));
    assert_eq!(port.write(0, b"x"), Err(PlatformError::Busy));

    uart1.ready.set(true);
    uart1.fail_write.set(Some(HalError::Timeout));
    assert_eq!(
        port.write(0, b"x"),
        Err(PlatformError::Hal(HalError::Timeout))
    );

    let stats = port.stats(0).unwrap();
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.sent, 0);
}

#[test]
fn test_bring_up_rejects_bad_input() {
    let uart1 = MockUart::new();

    assert_eq!(
        UartPort::<'_, MockUart>::new(&[], UartConfig::default()).err(),
        Some(PlatformError::Pipeline(PipelineError::InvalidParam))
    );
    assert_eq!(
        UartPort::<'_, MockUart>::new(&[&uart1], UartConfig::default().with_tx_timeout_ms(0))
            .err(),
        Some(PlatformError::Pipeline(PipelineError::InvalidParam))
    );
    assert_eq!(uart1.rearms.get(), 0);
}
