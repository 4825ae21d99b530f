//! Fuzz target for `decode_event`
//!
//! Exercises the live-channel event dispatch with arbitrary event names and
//! payloads. Unknown names and malformed payloads must come back as typed
//! errors, never panics.

#![no_main]

use arbitrary::Arbitrary;
use driftline_proto::decode_event;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    name: &'a str,
    payload: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let _ = decode_event(input.name, input.payload, 1);
});
