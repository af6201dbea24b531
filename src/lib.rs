//! # atlas
//!
//! Apply a fixed set of entry transformers across jar archives.
//!
//! A jar is a zip container holding a manifest, service provider
//! configurations, compiled classes and plain resources. This crate opens
//! jars, classifies their entries, threads every entry through a chain of
//! caller-supplied [`EntryTransformer`]s on a worker pool, and writes the
//! survivors into a new jar whose manifest is the first record.
//!
//! ## Quick Start
//!
//! ### Transforming a Jar
//!
//! ```rust,no_run
//! use atlas::{Archive, EntryTransformer, Result};
//! use atlas::entry::ServiceConfigEntry;
//!
//! /// Moves service providers to a relocated package.
//! struct Relocate;
//!
//! impl EntryTransformer for Relocate {
//!     fn transform_service_config(&self, mut entry: ServiceConfigEntry) -> Result<Option<ServiceConfigEntry>> {
//!         entry
//!             .providers_mut()
//!             .map(|p| p.replacen("com.example.", "shaded.example.", 1));
//!         Ok(Some(entry))
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let jar = Archive::open("app.jar")?;
//!     let result = jar.transform("app-shaded.jar", &[Relocate])?;
//!     println!("wrote {} entries", result.entries_written);
//!     jar.close();
//!     Ok(())
//! }
//! ```
//!
//! ### Reusing a Setup Across Jars
//!
//! ```rust,no_run
//! use atlas::{Atlas, EntryTransformer, Result};
//!
//! struct Identity;
//! impl EntryTransformer for Identity {}
//!
//! fn main() -> Result<()> {
//!     let mut atlas = Atlas::new();
//!     atlas.use_jar("libs/dependency.jar")?;
//!     atlas.install(|_ctx| Box::new(Identity));
//!
//!     for name in ["a", "b"] {
//!         atlas.run(format!("{name}.jar"), format!("{name}-out.jar"))?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`. A failing transformer never aborts a
//! run: every entry is attempted, and the run then reports every failing
//! path at once through [`Error::TransformFailed`].
//!
//! ```rust,no_run
//! use atlas::{Archive, EntryTransformer, Error};
//!
//! fn run(jar: &Archive, chain: &[Box<dyn EntryTransformer>]) -> atlas::Result<()> {
//!     match jar.process(chain) {
//!         Ok(result) => {
//!             println!("visited {} entries", result.entries_visited);
//!             Ok(())
//!         }
//!         Err(Error::TransformFailed(failed)) => {
//!             for (path, error) in failed.failed_paths() {
//!                 eprintln!("{}: {}", path, error);
//!             }
//!             Err(Error::TransformFailed(failed))
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! # fn main() {}
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `parallel` | Yes | Transform entries on a rayon thread pool |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod archive;
pub mod classpath;
pub mod context;
pub mod entry;
pub mod entry_path;
pub mod error;
pub mod repack;
pub mod runner;
mod shared_file;
pub mod timestamp;
pub mod transform;

pub use archive::{Archive, WalkOptions};
pub use classpath::{ClassProvider, Classpath};
pub use context::{InheritanceProvider, TransformContext};
pub use entry::Entry;
pub use entry_path::{EntryKind, EntryPath};
pub use error::{Error, Result, TransformFailedError};
pub use runner::Atlas;
pub use timestamp::Timestamp;
pub use transform::{EntryTransformer, Threads, TransformOptions, TransformResult};
