//! The [`Atlas`] runner: a reusable transformer setup applied to many jars.
//!
//! An `Atlas` holds auxiliary classpath archives and transformer
//! constructors. Each run builds a fresh [`TransformContext`] from the input
//! archive plus the auxiliaries, constructs every transformer once from that
//! context, and hands the chain to [`Archive::transform_with`] or
//! [`Archive::process_with`].
//!
//! # Example
//!
//! ```rust,no_run
//! use atlas::{Atlas, EntryTransformer};
//! use atlas::entry::ResourceEntry;
//!
//! struct StripLicenses;
//!
//! impl EntryTransformer for StripLicenses {
//!     fn transform_resource(&self, entry: ResourceEntry) -> atlas::Result<Option<ResourceEntry>> {
//!         if entry.path().as_str().starts_with("META-INF/LICENSE") {
//!             Ok(None)
//!         } else {
//!             Ok(Some(entry))
//!         }
//!     }
//! }
//!
//! # fn main() -> atlas::Result<()> {
//! let mut atlas = Atlas::new();
//! atlas.use_jar("libs/runtime.jar")?;
//! atlas.install(|_ctx| Box::new(StripLicenses));
//! atlas.run("app.jar", "app-stripped.jar")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::classpath::{ClassProvider, Classpath};
use crate::context::{InheritanceFactory, InheritanceProvider, TransformContext};
use crate::transform::{EntryTransformer, TransformOptions, TransformResult};
use crate::{Archive, Result};

/// Builds one transformer for one run.
pub type TransformerConstructor =
    dyn Fn(&TransformContext) -> Box<dyn EntryTransformer> + Send + Sync;

/// Applies a fixed chain of transformers to jar archives.
///
/// Auxiliary archives registered with [`use_jar`](Self::use_jar) stay open
/// until [`close`](Self::close) is called or the runner is dropped.
pub struct Atlas {
    classpath: Vec<Archive>,
    constructors: Vec<Box<TransformerConstructor>>,
    inheritance: Option<Box<InheritanceFactory>>,
    options: TransformOptions,
}

impl Default for Atlas {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Atlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atlas")
            .field("classpath", &self.classpath)
            .field("transformers", &self.constructors.len())
            .field("inheritance", &self.inheritance.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl Atlas {
    /// Creates a runner with default [`TransformOptions`].
    pub fn new() -> Self {
        Self::with_options(TransformOptions::default())
    }

    /// Creates a runner that uses `options` for every run.
    pub fn with_options(options: TransformOptions) -> Self {
        Self {
            classpath: Vec::new(),
            constructors: Vec::new(),
            inheritance: None,
            options,
        }
    }

    /// Returns the options used for every run.
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Replaces the options used for every run.
    pub fn set_options(&mut self, options: TransformOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Opens the jar at `path` and appends it to the classpath.
    ///
    /// Auxiliary archives are consulted after the archive being transformed,
    /// in registration order.
    pub fn use_jar(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let archive = Archive::open(path)?;
        Ok(self.use_archive(archive))
    }

    /// Appends an already open archive to the classpath.
    ///
    /// The runner closes it in [`close`](Self::close), which also closes every
    /// other clone of the handle.
    pub fn use_archive(&mut self, archive: Archive) -> &mut Self {
        log::debug!("added {} to the classpath", archive.name().display());
        self.classpath.push(archive);
        self
    }

    /// Returns the auxiliary classpath archives in lookup order.
    pub fn classpath(&self) -> &[Archive] {
        &self.classpath
    }

    /// Registers a transformer constructor.
    ///
    /// Constructors run once per run, in registration order, and the
    /// transformers they build are chained in that order.
    pub fn install<F>(&mut self, constructor: F) -> &mut Self
    where
        F: Fn(&TransformContext) -> Box<dyn EntryTransformer> + Send + Sync + 'static,
    {
        self.constructors.push(Box::new(constructor));
        self
    }

    /// Installs the factory that builds each run's inheritance analysis.
    pub fn inheritance<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(Classpath) -> Arc<dyn InheritanceProvider> + Send + Sync + 'static,
    {
        self.inheritance = Some(Box::new(factory));
        self
    }

    /// Transforms the jar at `input` into a new jar at `output`.
    ///
    /// The input is opened for the duration of the run and closed afterwards,
    /// whether or not the run succeeded.
    pub fn run(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<TransformResult> {
        let archive = Archive::open(input)?;
        let result = self.run_archive(&archive, output);
        archive.close();
        result
    }

    /// Transforms a caller-owned archive into a new jar at `output`.
    pub fn run_archive(&self, archive: &Archive, output: impl AsRef<Path>) -> Result<TransformResult> {
        let transformers = self.build_chain(archive);
        archive.transform_with(output, &transformers, &self.options)
    }

    /// Runs the transformers over a caller-owned archive without writing
    /// any output.
    pub fn process_archive(&self, archive: &Archive) -> Result<TransformResult> {
        let transformers = self.build_chain(archive);
        archive.process_with(&transformers, &self.options)
    }

    /// Closes and forgets every auxiliary archive.
    pub fn close(&mut self) {
        for archive in self.classpath.drain(..) {
            archive.close();
        }
    }

    fn build_chain(&self, archive: &Archive) -> Vec<Box<dyn EntryTransformer>> {
        let classpath: Classpath = std::iter::once(archive)
            .chain(&self.classpath)
            .map(|a| Arc::new(a.clone()) as Arc<dyn ClassProvider>)
            .collect();
        let context = TransformContext::new(classpath, self.inheritance.as_deref());

        log::debug!(
            "building {} transformer(s) for {}",
            self.constructors.len(),
            archive.name().display()
        );
        self.constructors
            .iter()
            .map(|construct| construct(&context))
            .collect()
    }
}

impl Drop for Atlas {
    fn drop(&mut self) {
        self.close();
    }
}
