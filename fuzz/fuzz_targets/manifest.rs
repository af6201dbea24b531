//! Fuzz target for manifest parsing.
//!
//! Run with: cargo +nightly fuzz run manifest
//!
//! Anything that parses must serialize to a form that parses again to the
//! same headers.

#![no_main]

use atlas::entry::Manifest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(manifest) = Manifest::parse(data) else {
        return;
    };

    let bytes = manifest.to_bytes();
    let reparsed = Manifest::parse(&bytes).expect("serialized manifest must parse");

    for (name, value) in manifest.main_attributes().iter() {
        assert_eq!(reparsed.main_attributes().get(name), Some(value));
    }
    assert_eq!(reparsed.sections().count(), manifest.sections().count());
});
