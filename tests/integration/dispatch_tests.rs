//! Deferred dispatch: command/response round trips, backlog draining,
//! fatal violations, and the end-to-end worker path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uartlink::adapters::mem::MemTransport;
use uartlink::link::worker;
use uartlink::{
    ChecksumKind, CommandTable, Error, EventTable, LinkChannel, ProtocolViolation, Transport,
};

use crate::support::{
    config, establish, feed, frame, host_bytes, parse_frames, read_host_frames, target, wait_until,
};

const KIND: ChecksumKind = ChecksumKind::Crc8Ccitt;

#[test]
fn concrete_cmd_frame_yields_one_rsp() {
    // Wire bytes from a legacy host: len=3, checksum=0, type=CMD, opcode=1,
    // no payload.
    let wire = [
        0x55, 0x41, 0x52, 0x54, 0x03, 0x00, 0x00, 0x02, 0x01, 0x00,
    ];

    let (mut channel, mut host) = target(ChecksumKind::Disabled);
    channel.register_command_handlers(CommandTable::new().with(1, |_payload| 0).unwrap());
    establish(&channel, &mut host, ChecksumKind::Disabled);

    feed(&channel, &wire);
    channel.service().unwrap();

    let frames = read_host_frames(&mut host);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ptype, 3); // RSP
    assert_eq!(frames[0].opcode, 1);
    assert_eq!(frames[0].payload, vec![0x00]);
}

#[test]
fn handler_status_is_carried_verbatim() {
    let (mut channel, mut host) = target(KIND);
    channel.register_command_handlers(CommandTable::new().with(0x10, |_| -5).unwrap());
    establish(&channel, &mut host, KIND);

    feed(&channel, &frame(KIND, 2, 0x10, &[]));
    channel.service().unwrap();

    let frames = read_host_frames(&mut host);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, vec![0xFB]); // -5 as u8
}

#[test]
fn command_payload_reaches_the_handler() {
    let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&seen);

    let (mut channel, mut host) = target(KIND);
    channel.register_command_handlers(
        CommandTable::new()
            .with(0x20, move |payload| {
                captured.lock().unwrap().extend_from_slice(payload);
                0
            })
            .unwrap(),
    );
    establish(&channel, &mut host, KIND);

    feed(&channel, &frame(KIND, 2, 0x20, &[0xDE, 0xAD, 0xBE]));
    channel.service().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0xDE, 0xAD, 0xBE]);
}

#[test]
fn backlog_of_commands_dispatches_in_order() {
    let order: Arc<Mutex<Vec<u16>>> = Arc::new(Mutex::new(Vec::new()));

    let (mut channel, mut host) = target(KIND);
    let mut table = CommandTable::new();
    for op in [0x01u16, 0x02, 0x03] {
        let order = Arc::clone(&order);
        table
            .register(op, move |_| {
                order.lock().unwrap().push(op);
                0
            })
            .unwrap();
    }
    channel.register_command_handlers(table);
    establish(&channel, &mut host, KIND);

    // All three buffered before the consumer ever runs.
    feed(&channel, &frame(KIND, 2, 0x01, &[]));
    feed(&channel, &frame(KIND, 2, 0x02, &[]));
    feed(&channel, &frame(KIND, 2, 0x03, &[]));

    // A single service pass must drain the whole backlog.
    channel.service().unwrap();

    assert_eq!(*order.lock().unwrap(), vec![0x01, 0x02, 0x03]);
    let frames = read_host_frames(&mut host);
    assert_eq!(frames.len(), 3);
    assert_eq!(
        frames.iter().map(|f| f.opcode).collect::<Vec<_>>(),
        vec![0x01, 0x02, 0x03]
    );
}

#[test]
fn events_are_fire_and_forget() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let (mut channel, mut host) = target(KIND);
    channel.register_event_handlers(
        EventTable::new()
            .with(0x07, move |payload| {
                assert_eq!(payload, &[0xAA]);
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap(),
    );

    feed(&channel, &frame(KIND, 4, 0x07, &[0xAA]));
    channel.service().unwrap();

    assert_eq!(hits.load(Ordering::Relaxed), 1);
    // No automatic response for events.
    assert_eq!(host_bytes(&mut host), 0);
}

#[test]
fn acks_are_recorded_and_ignored() {
    let (channel, mut host) = target(KIND);
    feed(&channel, &frame(KIND, 5, 0x31, &[]));
    channel.service().unwrap();
    assert_eq!(host_bytes(&mut host), 0);
}

#[test]
fn unknown_packet_type_poisons_the_channel() {
    let (channel, mut host) = target(KIND);
    establish(&channel, &mut host, KIND);

    feed(&channel, &frame(KIND, 9, 0x01, &[]));
    assert_eq!(
        channel.service(),
        Err(Error::Protocol(ProtocolViolation::UnknownPacketType(9)))
    );

    // Every later send fails hard.
    let buf = channel.alloc_buf(0).unwrap();
    assert_eq!(channel.send_event(buf, 0x42), Err(Error::ChannelDown));
}

#[test]
fn unregistered_command_is_fatal() {
    let (channel, mut host) = target(KIND);
    establish(&channel, &mut host, KIND);

    feed(&channel, &frame(KIND, 2, 0x99, &[]));
    assert_eq!(
        channel.service(),
        Err(Error::Protocol(ProtocolViolation::UnhandledCommand(0x99)))
    );
}

#[test]
fn unregistered_event_is_fatal() {
    let (channel, _host) = target(KIND);
    feed(&channel, &frame(KIND, 4, 0x55, &[]));
    assert_eq!(
        channel.service(),
        Err(Error::Protocol(ProtocolViolation::UnhandledEvent(0x55)))
    );
}

#[test]
fn inbound_rsp_is_a_direction_violation() {
    let (channel, _host) = target(KIND);
    feed(&channel, &frame(KIND, 3, 0x01, &[0x00]));
    assert!(matches!(
        channel.service(),
        Err(Error::Protocol(ProtocolViolation::UnexpectedDirection(_)))
    ));
}

#[test]
fn checksum_mismatch_drops_frame_then_recovers() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let (mut channel, _host) = target(KIND);
    channel.register_event_handlers(
        EventTable::new()
            .with(0x07, move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap(),
    );

    let mut bad = frame(KIND, 4, 0x07, &[0x01, 0x02]);
    bad[6] ^= 0xFF; // corrupt the checksum byte
    feed(&channel, &bad);
    channel.service().unwrap();
    assert_eq!(hits.load(Ordering::Relaxed), 0);

    // Header state reset cleanly; the next valid frame goes through.
    feed(&channel, &frame(KIND, 4, 0x07, &[0x01, 0x02]));
    channel.service().unwrap();
    assert_eq!(hits.load(Ordering::Relaxed), 1);
}

#[test]
fn command_before_handshake_runs_but_response_is_gated() {
    // A peer that violates ordering gets its handler run, but the RSP
    // cannot pass the gate; the channel survives.
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let (mut channel, mut host) = target(KIND);
    channel.register_command_handlers(
        CommandTable::new()
            .with(0x01, move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
                0
            })
            .unwrap(),
    );

    feed(&channel, &frame(KIND, 2, 0x01, &[]));
    channel.service().unwrap();
    assert_eq!(hits.load(Ordering::Relaxed), 1);
    assert_eq!(host_bytes(&mut host), 0);
}

#[test]
fn workers_drive_the_full_path() {
    let (dev, mut host) = MemTransport::pair();
    let dev_rx = dev.clone();

    let mut channel = LinkChannel::new(config(KIND), dev);
    channel.register_command_handlers(CommandTable::new().with(0x01, |_| 0).unwrap());
    let channel = Arc::new(channel);

    let dispatch = worker::spawn_dispatcher(Arc::clone(&channel));
    let reader = worker::spawn_reader(dev_rx, Arc::clone(&channel));

    channel.open().unwrap();
    host.write_all(&frame(KIND, 1, 0x1337, &[])).unwrap();
    assert!(wait_until(Duration::from_secs(2), || channel.is_available()));

    host.write_all(&frame(KIND, 2, 0x01, &[])).unwrap();

    // INIT (10 bytes) then RSP (11 bytes).
    let mut collected = Vec::new();
    assert!(wait_until(Duration::from_secs(2), || {
        let mut chunk = [0u8; 64];
        let n = host.read(&mut chunk).unwrap();
        collected.extend_from_slice(&chunk[..n]);
        collected.len() >= 21
    }));

    let frames = parse_frames(&collected);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].ptype, 0); // INIT
    assert_eq!(frames[1].ptype, 3); // RSP
    assert_eq!(frames[1].opcode, 0x01);
    assert_eq!(frames[1].payload, vec![0x00]);
    assert!(!dispatch.channel_failed());

    reader.stop();
    dispatch.stop();
}
