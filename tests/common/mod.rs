//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{DateTime, ZipArchive, ZipWriter};

/// The three-resource jar used by the failure aggregation tests.
pub const PROPERTIES: &[(&str, &[u8])] = &[
    ("one.properties", b"hello"),
    ("two.properties", b"world"),
    ("three.properties", b"whee"),
];

/// A minimal manifest.
pub const MANIFEST: &[u8] = b"Manifest-Version: 1.0\r\nCreated-By: tests\r\n\r\n";

/// Writes a jar at `path` holding `entries` in the given order.
///
/// Names ending in `/` become directory records.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    write_jar_at(path, entries, DateTime::default());
}

/// Writes a jar whose records all carry `time`.
pub fn write_jar_at(path: &Path, entries: &[(&str, &[u8])], time: DateTime) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        let options = SimpleFileOptions::default().last_modified_time(time);
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Creates a jar named `name` inside `dir` and returns its path.
pub fn jar(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    write_jar(&path, entries);
    path
}

/// Returns every record of the jar at `path` as `(name, bytes)`, in
/// physical order.
pub fn read_jar(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut file = zip.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_owned(), data)
        })
        .collect()
}

/// Returns the non-directory record names of the jar at `path`, sorted.
pub fn file_names(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = read_jar(path)
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| !name.ends_with('/'))
        .collect();
    names.sort();
    names
}

/// Returns the content of the record `name`, if present.
pub fn content(path: &Path, name: &str) -> Option<Vec<u8>> {
    read_jar(path)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, data)| data)
}
