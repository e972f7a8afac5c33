//! Fuzz target: replay capture parser
//!
//! Arbitrary text must either parse into records or produce an error
//! naming a line; it must never panic.
//!
//! cargo fuzz run fuzz_replay_capture

#![no_main]

use homeguard::adapters::replay::parse_capture;
use homeguard::error::Error;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    match parse_capture(&text) {
        Ok(records) => assert!(records.len() <= text.lines().count()),
        Err(Error::Capture { line, .. }) => assert!(line >= 1 && line <= text.lines().count()),
        Err(other) => panic!("unexpected error kind: {other:?}"),
    }
});
