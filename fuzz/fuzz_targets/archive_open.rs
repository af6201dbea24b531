//! Fuzz target for Archive::open with arbitrary file contents.
//!
//! Exercises the zip container parsing and entry classification with
//! malformed or adversarial input, looking for panics and hangs.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use std::io::Write;

use atlas::{Archive, WalkOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }

    // We don't care about the result - we're looking for panics or hangs
    let Ok(archive) = Archive::open(file.path()) else {
        return;
    };
    let Ok(walk) = archive.walk(WalkOptions::new()) else {
        return;
    };
    for path in walk {
        // Reading classifies the entry and parses manifests and service files
        let _ = archive.get(&path);
    }
    archive.close();
});
