//! Fuzz target: full ingest + dispatch path
//!
//! Feeds arbitrary bytes into a channel and services it. Protocol
//! violations are legal outcomes (returned as errors); panics are not.
//!
//! cargo fuzz run fuzz_channel_ingest

#![no_main]

// Provides the critical-section implementation for the channel's wakeup
// signal on the host.
use critical_section as _;
use libfuzzer_sys::fuzz_target;
use uartlink::link::channel::LinkChannel;
use uartlink::link::transport::NullTransport;
use uartlink::{ChecksumKind, EventTable, LinkConfig};

fuzz_target!(|data: &[u8]| {
    let config = LinkConfig {
        rx_ring_capacity: 256,
        max_packet_size: 128,
        checksum: ChecksumKind::Disabled,
        ..LinkConfig::default()
    };
    let mut channel = LinkChannel::new(config, NullTransport);
    channel.register_event_handlers(
        EventTable::new()
            .with(0x07, |payload| {
                assert!(payload.len() <= 128);
            })
            .unwrap(),
    );

    for &byte in data {
        channel.ingest(byte);
    }
    let _ = channel.service();
    assert!(usize::try_from(channel.rx_dropped()).unwrap() <= data.len());
});
