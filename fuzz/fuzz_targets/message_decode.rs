//! Fuzz target for `decode_message`
//!
//! This fuzzer feeds arbitrary payload text into message decoding to find:
//! - Parser crashes or panics
//! - Timestamp conversions that overflow
//! - Attachment payloads that bypass the degrade-to-None path
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use driftline_proto::decode_message;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = std::str::from_utf8(data) {
        // This should never panic, only return Err for invalid data
        let _ = decode_message(payload, 1);
    }
});
