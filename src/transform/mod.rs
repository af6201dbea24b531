//! Entry transformers and the options of a transform run.
//!
//! A run threads every entry of an archive through an ordered chain of
//! [`EntryTransformer`]s. Each transformer sees the previous one's output and
//! may replace the entry or delete it by returning `Ok(None)`, which skips the
//! rest of the chain for that entry.
//!
//! # Example
//!
//! ```rust,no_run
//! use atlas::Archive;
//! use atlas::entry::{ManifestEntry, ResourceEntry};
//! use atlas::transform::EntryTransformer;
//!
//! /// Drops signature files and stamps the manifest.
//! struct Unsign;
//!
//! impl EntryTransformer for Unsign {
//!     fn transform_manifest(&self, mut entry: ManifestEntry) -> atlas::Result<Option<ManifestEntry>> {
//!         entry.manifest.main_attributes_mut().insert("Created-By", "atlas");
//!         Ok(Some(entry))
//!     }
//!
//!     fn transform_resource(&self, entry: ResourceEntry) -> atlas::Result<Option<ResourceEntry>> {
//!         let name = entry.path().as_str();
//!         if name.starts_with("META-INF/") && (name.ends_with(".SF") || name.ends_with(".RSA")) {
//!             return Ok(None);
//!         }
//!         Ok(Some(entry))
//!     }
//! }
//!
//! # fn main() -> atlas::Result<()> {
//! let jar = Archive::open("signed.jar")?;
//! let result = jar.transform("unsigned.jar", &[Unsign])?;
//! println!("deleted {} entries", result.entries_deleted);
//! # Ok(())
//! # }
//! ```

mod pipeline;

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::Result;
use crate::entry::{ClassEntry, ManifestEntry, ResourceEntry, ServiceConfigEntry};

/// Rewrites archive entries, one method per entry variant.
///
/// Every method defaults to passing its entry through unchanged. Returning
/// `Ok(None)` deletes the entry; returning an error fails that entry only.
/// Transformers are shared by all worker threads of a run and must not rely
/// on the order in which entries arrive.
pub trait EntryTransformer: Send + Sync {
    /// Transforms the manifest.
    fn transform_manifest(&self, entry: ManifestEntry) -> Result<Option<ManifestEntry>> {
        Ok(Some(entry))
    }

    /// Transforms a service provider configuration.
    fn transform_service_config(
        &self,
        entry: ServiceConfigEntry,
    ) -> Result<Option<ServiceConfigEntry>> {
        Ok(Some(entry))
    }

    /// Transforms a class.
    fn transform_class(&self, entry: ClassEntry) -> Result<Option<ClassEntry>> {
        Ok(Some(entry))
    }

    /// Transforms a resource.
    fn transform_resource(&self, entry: ResourceEntry) -> Result<Option<ResourceEntry>> {
        Ok(Some(entry))
    }
}

macro_rules! forward_transformer {
    ($($ty:ty),*) => {$(
        impl<T: EntryTransformer + ?Sized> EntryTransformer for $ty {
            fn transform_manifest(&self, entry: ManifestEntry) -> Result<Option<ManifestEntry>> {
                (**self).transform_manifest(entry)
            }

            fn transform_service_config(
                &self,
                entry: ServiceConfigEntry,
            ) -> Result<Option<ServiceConfigEntry>> {
                (**self).transform_service_config(entry)
            }

            fn transform_class(&self, entry: ClassEntry) -> Result<Option<ClassEntry>> {
                (**self).transform_class(entry)
            }

            fn transform_resource(&self, entry: ResourceEntry) -> Result<Option<ResourceEntry>> {
                (**self).transform_resource(entry)
            }
        }
    )*};
}

forward_transformer!(&T, Box<T>, Arc<T>);

/// Thread configuration for transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threads {
    /// One worker per available CPU.
    #[default]
    Auto,
    /// A fixed number of workers.
    Count(NonZeroUsize),
    /// Process entries on the calling thread.
    Single,
}

impl Threads {
    /// Creates a `Threads::Count` variant from a `usize`.
    ///
    /// Returns `Threads::Single` if the count is zero.
    ///
    /// ```rust
    /// use atlas::transform::Threads;
    ///
    /// assert_eq!(Threads::count_or_single(0), Threads::Single);
    /// assert_eq!(Threads::count_or_single(4).count(), 4);
    /// ```
    pub fn count_or_single(n: usize) -> Self {
        match NonZeroUsize::new(n) {
            Some(count) => Self::Count(count),
            None => Self::Single,
        }
    }

    /// Returns the actual thread count.
    ///
    /// - `Threads::Auto`: the number of available CPUs, minimum 1
    /// - `Threads::Count(n)`: `n`
    /// - `Threads::Single`: 1
    pub fn count(&self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Self::Count(n) => n.get(),
            Self::Single => 1,
        }
    }
}

/// Compression applied to records of the output archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Store records uncompressed.
    Stored,
    /// Deflate records, optionally at a specific level (0-9).
    Deflated {
        /// Compression level; `None` uses the default.
        level: Option<i64>,
    },
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Deflated { level: None }
    }
}

/// Options for a transform run.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Worker thread configuration.
    pub threads: Threads,
    /// Compression of written records.
    pub compression: Compression,
    /// Whether to move the manifest to the front of the output after writing.
    pub repack_manifest: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            threads: Threads::Auto,
            compression: Compression::default(),
            repack_manifest: true,
        }
    }
}

impl TransformOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the thread configuration.
    pub fn threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the output compression.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets whether the manifest-first repair runs after writing.
    pub fn repack_manifest(mut self, repack: bool) -> Self {
        self.repack_manifest = repack;
        self
    }
}

/// Result of a successful transform run.
#[must_use = "transform result should be checked to verify the run did what was expected"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformResult {
    /// Number of entries read from the input.
    pub entries_visited: usize,
    /// Number of entries written to the output (zero for `process`).
    pub entries_written: usize,
    /// Number of entries a transformer deleted.
    pub entries_deleted: usize,
    /// Whether the output was rewritten to put the manifest first.
    pub manifest_repacked: bool,
    /// Number of worker threads used.
    pub threads_used: usize,
}

impl TransformResult {
    /// Returns the number of entries that survived the chain.
    pub fn entries_kept(&self) -> usize {
        self.entries_visited - self.entries_deleted
    }
}
