//! Fuzz target for EntryPath::new with arbitrary string input.
//!
//! Run with: cargo +nightly fuzz run entry_path
//!
//! Properties checked on every accepted path:
//! - no `.` or `..` segments
//! - not absolute, no backslashes
//! - no NUL bytes
//! - classification is stable under re-parsing

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(path) = atlas::EntryPath::new(input) else {
        return;
    };
    let normalized = path.as_str();

    assert!(
        !normalized.split('/').any(|s| s == ".." || s == "." || s.is_empty()),
        "bad segment accepted: {:?}",
        normalized
    );
    assert!(!normalized.starts_with('/'), "absolute path accepted: {:?}", normalized);
    assert!(!normalized.contains('\\'), "backslash kept: {:?}", normalized);
    assert!(!normalized.contains('\0'), "NUL byte accepted: {:?}", normalized);

    let again = atlas::EntryPath::new(normalized).expect("normalized path must re-parse");
    assert_eq!(again, path);
    assert_eq!(again.kind(), path.kind());
});
