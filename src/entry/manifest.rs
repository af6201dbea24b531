//! Jar manifest parsing and serialization.
//!
//! A manifest is a sequence of `Name: value` header lines. The first group is
//! the main section; each following group, separated by a blank line, starts
//! with a `Name:` header naming the entry it describes. Lines are limited to
//! 72 bytes; longer values continue on lines that begin with a single space.

use std::io::{self, Write};

use crate::{Error, Result};

/// Maximum encoded length of a manifest line, excluding the line break.
const MAX_LINE_BYTES: usize = 72;

/// Header written first in the main section when present.
pub const MANIFEST_VERSION: &str = "Manifest-Version";

/// Header that opens a per-entry section.
const SECTION_NAME: &str = "Name";

/// An ordered set of manifest headers with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a header, matching its name case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    /// Sets a header, returning the previous value.
    ///
    /// An existing header keeps its position and original spelling.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Returns `true` if the header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterates headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    fn last_value_mut(&mut self) -> Option<&mut String> {
        self.entries.last_mut().map(|(_, v)| v)
    }
}

/// A parsed jar manifest.
///
/// # Example
///
/// ```rust
/// use atlas::entry::Manifest;
///
/// let mut manifest = Manifest::parse(b"Manifest-Version: 1.0\r\nMain-Class: app.Main\r\n\r\n").unwrap();
/// assert_eq!(manifest.main_attributes().get("main-class"), Some("app.Main"));
///
/// manifest.main_attributes_mut().insert("Main-Class", "app.Launcher");
/// let text = String::from_utf8(manifest.to_bytes()).unwrap();
/// assert!(text.contains("Main-Class: app.Launcher\r\n"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    sections: Vec<(String, Attributes)>,
}

impl Manifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses manifest bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] with [`io::ErrorKind::InvalidData`] if the bytes
    /// are not UTF-8, and [`Error::InvalidManifest`] for structural problems.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut manifest = Manifest::new();
        // None while reading the main section
        let mut section: Option<(String, Attributes)> = None;
        let mut at_section_start = false;

        for (idx, line) in split_lines(text).enumerate() {
            let line_no = idx + 1;

            if line.is_empty() {
                if let Some(done) = section.take() {
                    manifest.sections.push(done);
                }
                at_section_start = true;
                continue;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                let target = match section.as_mut() {
                    Some((name, attrs)) if attrs.is_empty() => Some(name),
                    Some((_, attrs)) => attrs.last_value_mut(),
                    None if !at_section_start => manifest.main.last_value_mut(),
                    None => None,
                };
                match target {
                    Some(value) => value.push_str(rest),
                    None => {
                        return Err(Error::InvalidManifest {
                            line: line_no,
                            reason: "continuation line without a header".into(),
                        });
                    }
                }
                continue;
            }

            let (name, value) = split_header(line, line_no)?;

            if at_section_start {
                if !name.eq_ignore_ascii_case(SECTION_NAME) {
                    return Err(Error::InvalidManifest {
                        line: line_no,
                        reason: format!("section must start with '{}', found '{}'", SECTION_NAME, name),
                    });
                }
                section = Some((value.to_string(), Attributes::new()));
                at_section_start = false;
                continue;
            }

            match section.as_mut() {
                Some((_, attrs)) => attrs.insert(name, value),
                None => manifest.main.insert(name, value),
            };
        }

        if let Some(done) = section.take() {
            manifest.sections.push(done);
        }

        Ok(manifest)
    }

    /// Returns the main section headers.
    pub fn main_attributes(&self) -> &Attributes {
        &self.main
    }

    /// Returns the main section headers for modification.
    pub fn main_attributes_mut(&mut self) -> &mut Attributes {
        &mut self.main
    }

    /// Returns the headers of a named section.
    pub fn section(&self, name: &str) -> Option<&Attributes> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, attrs)| attrs)
    }

    /// Returns the headers of a named section, creating it if needed.
    pub fn section_mut(&mut self, name: &str) -> &mut Attributes {
        let idx = match self.sections.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.sections.push((name.to_string(), Attributes::new()));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx].1
    }

    /// Removes a named section.
    pub fn remove_section(&mut self, name: &str) -> Option<Attributes> {
        let idx = self.sections.iter().position(|(n, _)| n == name)?;
        Some(self.sections.remove(idx).1)
    }

    /// Iterates named sections in order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.sections.iter().map(|(n, a)| (n.as_str(), a))
    }

    /// Writes the manifest in its canonical form.
    ///
    /// `Manifest-Version` is written first when present; every other header
    /// keeps its order. Long lines are wrapped at 72 bytes.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(version) = self.main.get(MANIFEST_VERSION) {
            write_header(out, MANIFEST_VERSION, version)?;
        }
        for (name, value) in self.main.iter() {
            if !name.eq_ignore_ascii_case(MANIFEST_VERSION) {
                write_header(out, name, value)?;
            }
        }
        out.write_all(b"\r\n")?;

        for (section, attrs) in &self.sections {
            write_header(out, SECTION_NAME, section)?;
            for (name, value) in attrs.iter() {
                write_header(out, name, value)?;
            }
            out.write_all(b"\r\n")?;
        }
        Ok(())
    }

    /// Serializes the manifest to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_to(&mut out);
        out
    }
}

fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(['\r', '\n']) {
            Some(idx) => {
                let line = &rest[..idx];
                let skip = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[idx + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

fn split_header(line: &str, line_no: usize) -> Result<(&str, &str)> {
    let (name, value) = line.split_once(": ").ok_or_else(|| Error::InvalidManifest {
        line: line_no,
        reason: "missing ': ' separator".into(),
    })?;
    if name.is_empty() {
        return Err(Error::InvalidManifest {
            line: line_no,
            reason: "empty header name".into(),
        });
    }
    Ok((name, value))
}

fn write_header<W: Write>(out: &mut W, name: &str, value: &str) -> io::Result<()> {
    let line = format!("{}: {}", name, value);
    let mut rest = line.as_str();
    let mut limit = MAX_LINE_BYTES;
    loop {
        if rest.len() <= limit {
            out.write_all(rest.as_bytes())?;
            out.write_all(b"\r\n")?;
            return Ok(());
        }
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.write_all(rest[..cut].as_bytes())?;
        out.write_all(b"\r\n ")?;
        rest = &rest[cut..];
        // The leading space counts toward the limit
        limit = MAX_LINE_BYTES - 1;
    }
}
