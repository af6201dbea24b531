//! Error types for jar transformation.
//!
//! This module provides the [`Error`] enum which represents every failure mode
//! of opening, walking, transforming and repacking archives, together with the
//! aggregated [`TransformFailedError`] reported when individual entries fail.
//!
//! # Error Handling
//!
//! Infrastructure failures (a corrupt container, a full disk) surface
//! immediately as [`Error::Io`] or [`Error::Zip`]. Failures raised by
//! transformers never abort a run early; every entry is attempted and the
//! failures are reported together as [`Error::TransformFailed`]:
//!
//! ```rust,no_run
//! use atlas::{Archive, Error};
//! # use atlas::transform::EntryTransformer;
//! # struct Noop;
//! # impl EntryTransformer for Noop {}
//!
//! fn transform(input: &str, output: &str) -> atlas::Result<()> {
//!     let jar = Archive::open(input)?;
//!     match jar.transform(output, &[Noop]) {
//!         Ok(result) => println!("wrote {} entries", result.entries_written),
//!         Err(Error::TransformFailed(failed)) => {
//!             for (path, error) in failed.failed_paths() {
//!                 eprintln!("{path}: {error}");
//!             }
//!         }
//!         Err(e) => return Err(e),
//!     }
//!     jar.close();
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io;

use crate::EntryPath;

/// Boxed error type accepted from transformers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for all jar operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io], [`Zip`][Self::Zip] | File system or container problems |
/// | Input | [`InvalidEntryPath`][Self::InvalidEntryPath], [`InvalidManifest`][Self::InvalidManifest], [`EntryNotFound`][Self::EntryNotFound] | Malformed or unreadable entries |
/// | Lifecycle | [`Closed`][Self::Closed] | Archive used after `close` |
/// | Per-entry | [`Transform`][Self::Transform], [`TransformPanicked`][Self::TransformPanicked], [`DuplicateEntry`][Self::DuplicateEntry] | A transformer failed on one entry |
/// | Aggregate | [`TransformFailed`][Self::TransformFailed] | One or more entries failed in a run |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading or writing an archive.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip container could not be read or written.
    ///
    /// Returned when a file is not a zip-structured archive, or when its
    /// central directory or a record header is damaged.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An archive-internal path failed validation.
    #[error("Invalid entry path: {0}")]
    InvalidEntryPath(String),

    /// An entry listed by the archive could not be read back.
    #[error("Entry not found: {path}")]
    EntryNotFound {
        /// The record name that was looked up.
        path: String,
    },

    /// Two entries were written to the same output path.
    ///
    /// This happens when a transformer renames an entry onto a path that
    /// another entry of the same run also writes.
    #[error("Duplicate entry in output: {path}")]
    DuplicateEntry {
        /// The colliding path.
        path: String,
    },

    /// The archive was used after it was closed.
    #[error("Archive is closed")]
    Closed,

    /// A manifest could not be parsed.
    #[error("Invalid manifest at line {line}: {reason}")]
    InvalidManifest {
        /// One-based line number of the offending line.
        line: usize,
        /// Description of the problem.
        reason: String,
    },

    /// A transformer raised an error for one entry.
    #[error("{0}")]
    Transform(BoxError),

    /// A transformer panicked while processing one entry.
    #[error("Transformer panicked: {message}")]
    TransformPanicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// One or more entries failed during a run.
    #[error(transparent)]
    TransformFailed(#[from] TransformFailedError),
}

impl Error {
    /// Wraps an arbitrary error raised by a transformer.
    ///
    /// ```rust
    /// use atlas::Error;
    ///
    /// let err = Error::transform("unsupported class version");
    /// assert_eq!(err.to_string(), "unsupported class version");
    /// ```
    pub fn transform(error: impl Into<BoxError>) -> Self {
        Error::Transform(error.into())
    }

    /// Returns `true` if this is an infrastructure failure reading or writing
    /// the underlying container.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Zip(zip::result::ZipError::Io(_))
        )
    }

    /// Returns `true` if this error is the aggregated per-entry failure of a run.
    pub fn is_transform_failure(&self) -> bool {
        matches!(self, Error::TransformFailed(_))
    }

    /// Returns the failing entries if this is an aggregated transform failure.
    pub fn failed_paths(&self) -> Option<&BTreeMap<EntryPath, Error>> {
        match self {
            Error::TransformFailed(failed) => Some(failed.failed_paths()),
            _ => None,
        }
    }
}

/// The aggregated failure of a transform run.
///
/// Holds an immutable snapshot of every entry that failed, keyed by path.
/// When exactly one entry failed its error is exposed as this error's
/// [`source`](std::error::Error::source); with several failures there is no
/// single cause and the message lists each path instead.
#[derive(Debug)]
pub struct TransformFailedError {
    failures: BTreeMap<EntryPath, Error>,
}

impl TransformFailedError {
    /// Creates an aggregated failure from a set of per-entry errors.
    pub fn new(failures: BTreeMap<EntryPath, Error>) -> Self {
        Self { failures }
    }

    /// Returns every failing path with the error raised for it.
    pub fn failed_paths(&self) -> &BTreeMap<EntryPath, Error> {
        &self.failures
    }

    /// Returns the number of failed entries.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns `true` if no entry failed.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the failure if exactly one entry failed.
    pub fn single(&self) -> Option<(&EntryPath, &Error)> {
        if self.failures.len() == 1 {
            self.failures.iter().next()
        } else {
            None
        }
    }
}

impl fmt::Display for TransformFailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((path, error)) = self.single() {
            return write!(f, "{} (in entry {})", error, path);
        }

        write!(f, "Failed to transform archive:")?;
        for (path, error) in &self.failures {
            write!(f, "\n- {}: {}", path, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for TransformFailedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.single()
            .map(|(_, error)| error as &(dyn std::error::Error + 'static))
    }
}

/// A specialized [`Result`](std::result::Result) type for jar operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn path(s: &str) -> EntryPath {
        EntryPath::new(s).unwrap()
    }

    #[test]
    fn test_io_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_io());
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_transform_message_is_underlying() {
        let err = Error::transform("boom");
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_io());
    }

    #[test]
    fn test_invalid_manifest() {
        let err = Error::InvalidManifest {
            line: 3,
            reason: "missing ': ' separator".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid manifest at line 3: missing ': ' separator"
        );
    }

    #[test]
    fn test_single_failure_exposes_cause() {
        let mut failures = BTreeMap::new();
        failures.insert(path("two.properties"), Error::transform("injected failure"));
        let err: Error = TransformFailedError::new(failures).into();

        assert!(err.is_transform_failure());
        assert_eq!(
            err.to_string(),
            "injected failure (in entry two.properties)"
        );
        let cause = err.source().expect("single failure has a cause");
        assert_eq!(cause.to_string(), "injected failure");
        assert_eq!(err.failed_paths().unwrap().len(), 1);
    }

    #[test]
    fn test_multi_failure_lists_paths() {
        let mut failures = BTreeMap::new();
        failures.insert(path("two.properties"), Error::transform("second"));
        failures.insert(path("one.properties"), Error::transform("first"));
        let err: Error = TransformFailedError::new(failures).into();

        assert!(err.source().is_none());
        assert_eq!(
            err.to_string(),
            "Failed to transform archive:\n- one.properties: first\n- two.properties: second"
        );
    }

    #[test]
    fn test_failed_paths_none_for_other_errors() {
        assert!(Error::Closed.failed_paths().is_none());
        assert_eq!(Error::Closed.to_string(), "Archive is closed");
    }
}
