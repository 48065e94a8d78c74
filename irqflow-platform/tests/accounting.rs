//! Property tests: frame and byte accounting under arbitrary traffic

mod common;

use common::{FrameLog, MockCan, MockUart, START_TICK};
use irqflow_platform::{CanBus, CanConfig, FixedTime, UartConfig, UartPort};
use proptest::prelude::*;

/// Operation applied to the bus in a generated schedule.
#[derive(Debug, Clone)]
enum Step {
    /// Frames arriving on the wire before the next interrupt
    Burst(u16),
    /// Main loop pass
    Drain,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![(1u16..6).prop_map(Step::Burst), Just(Step::Drain)]
}

proptest! {
    #[test]
    fn every_frame_is_handled_or_counted(
        schedule in prop::collection::vec(step(), 1..60),
        capacity in 1usize..8,
        drain_limit in 1usize..6,
    ) {
        let can1 = MockCan::new();
        let clock = FixedTime::new(START_TICK);
        let log = FrameLog::new();
        let config = CanConfig::default()
            .with_rx_queue_capacity(capacity)
            .with_drain_limit(drain_limit);

        let mut bus: CanBus<'_, MockCan> = CanBus::new(&[&can1], config, &clock).unwrap();
        bus.on_default(&log);

        let mut next_id = 0u16;
        for step in schedule {
            match step {
                Step::Burst(n) => {
                    for _ in 0..n {
                        can1.inject(next_id, &[]);
                        next_id += 1;
                    }
                    while can1.pending() > 0 {
                        bus.on_rx_interrupt(&can1);
                    }
                }
                Step::Drain => {
                    let taken = bus.process_rx(0).unwrap();
                    prop_assert!(taken <= drain_limit);
                }
            }
            prop_assert!(bus.available(0).unwrap() <= capacity);
        }
        while bus.process_rx(0).unwrap() > 0 {}

        let stats = bus.stats(0).unwrap();
        prop_assert_eq!(u32::from(next_id), stats.received + stats.dropped);
        prop_assert_eq!(log.len() as u32, stats.received);

        // Survivors keep arrival order
        let ids = log.ids();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn uart_bytes_keep_order(
        payload in prop::collection::vec(any::<u8>(), 0..200),
        capacity in 1usize..64,
    ) {
        let uart1 = MockUart::new();
        let config = UartConfig::default().with_rx_queue_capacity(capacity);
        let port: UartPort<'_, MockUart> = UartPort::new(&[&uart1], config).unwrap();

        let mut read = Vec::new();
        for chunk in payload.chunks(capacity) {
            for &byte in chunk {
                uart1.receive(byte);
                port.on_rx_interrupt(&uart1);
            }
            while let Some(byte) = port.read(0) {
                read.push(byte);
            }
        }

        prop_assert_eq!(read, payload);
        prop_assert_eq!(port.stats(0).unwrap().dropped, 0);
    }
}
