//! Handshake gating: nothing but INIT/INITRSP moves before the channel is
//! established, and a single INITRSP opens it for good.

use uartlink::{ChannelState, ChecksumKind, Error};

use crate::support::{establish, feed, frame, host_bytes, read_host_frames, target};

const KIND: ChecksumKind = ChecksumKind::Crc8Ccitt;

#[test]
fn payload_send_rejected_before_open() {
    let (channel, mut host) = target(KIND);
    let buf = channel.alloc_buf(0).unwrap();
    assert_eq!(channel.send_event(buf, 0x42), Err(Error::NotConnected));
    // A gated send puts nothing on the wire.
    assert_eq!(host_bytes(&mut host), 0);
}

#[test]
fn open_sends_init_and_enters_initializing() {
    let (channel, mut host) = target(KIND);
    assert_eq!(channel.state(), ChannelState::Uninitialized);
    channel.open().unwrap();
    assert_eq!(channel.state(), ChannelState::Initializing);
    assert!(!channel.is_available());

    let frames = read_host_frames(&mut host);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ptype, 0); // INIT
    assert_eq!(frames[0].opcode, 0x1337);
    assert!(frames[0].payload.is_empty());
}

#[test]
fn open_twice_is_a_config_error() {
    let (channel, _host) = target(KIND);
    channel.open().unwrap();
    assert!(matches!(channel.open(), Err(Error::Config(_))));
}

#[test]
fn payload_send_rejected_while_initializing() {
    let (channel, mut host) = target(KIND);
    channel.open().unwrap();
    let _ = read_host_frames(&mut host);

    let buf = channel.alloc_buf(0).unwrap();
    assert_eq!(channel.send_event(buf, 0x42), Err(Error::NotConnected));
    assert_eq!(host_bytes(&mut host), 0);
}

#[test]
fn initrsp_opens_the_channel() {
    let (channel, mut host) = target(KIND);
    establish(&channel, &mut host, KIND);
    assert_eq!(channel.state(), ChannelState::Initialized);

    // The identical send that was rejected before now succeeds.
    let buf = channel.alloc_buf(0).unwrap();
    channel.send_event(buf, 0x42).unwrap();
    let frames = read_host_frames(&mut host);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ptype, 4); // EVT
    assert_eq!(frames[0].opcode, 0x42);
}

#[test]
fn peer_initiated_init_is_answered_with_initrsp() {
    let (channel, mut host) = target(KIND);
    channel.open().unwrap();
    let _ = read_host_frames(&mut host);

    feed(&channel, &frame(KIND, 0, 0x1337, &[])); // INIT from the peer
    channel.service().unwrap();

    let frames = read_host_frames(&mut host);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ptype, 1); // INITRSP
    assert_eq!(frames[0].opcode, 0x1337);
    // Answering does not open our side; only an inbound INITRSP does.
    assert_eq!(channel.state(), ChannelState::Initializing);
}

#[test]
fn logs_are_dropped_silently_until_established() {
    let (channel, mut host) = target(KIND);
    let mut buf = channel.alloc_buf(16).unwrap();
    buf.extend_from_slice(b"boot message\n").unwrap();
    // Best-effort: no error, no bytes.
    channel.send_log(buf).unwrap();
    assert_eq!(host_bytes(&mut host), 0);

    establish(&channel, &mut host, KIND);
    let mut buf = channel.alloc_buf(16).unwrap();
    buf.extend_from_slice(b"post-handshake\n").unwrap();
    channel.send_log(buf).unwrap();
    let frames = read_host_frames(&mut host);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ptype, 7); // LOG
    assert_eq!(frames[0].opcode, 0);
    assert_eq!(frames[0].payload, b"post-handshake\n");
}

#[test]
fn ready_event_flows_once_established() {
    let (channel, mut host) = target(KIND);
    assert_eq!(channel.send_ready_event(), Err(Error::NotConnected));
    establish(&channel, &mut host, KIND);

    channel.send_ready_event().unwrap();
    let frames = read_host_frames(&mut host);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ptype, 4); // EVT
    assert_eq!(frames[0].opcode, uartlink::opcodes::EVT_READY);
    assert!(frames[0].payload.is_empty());
}
