//! The classified contents of a jar.
//!
//! Every record of an archive is read as one of four [`Entry`] variants,
//! chosen by [`EntryKind::of`] from its path alone:
//!
//! | Variant | Path | Payload |
//! |---------|------|---------|
//! | [`Entry::Manifest`] | `META-INF/MANIFEST.MF` | parsed [`Manifest`] |
//! | [`Entry::ServiceConfig`] | `META-INF/services/*` | parsed [`ServiceProviderConfiguration`] |
//! | [`Entry::Class`] | `*.class` | raw class bytes |
//! | [`Entry::Resource`] | anything else | raw bytes |

mod manifest;
mod service;

pub use manifest::{Attributes, MANIFEST_VERSION, Manifest};
pub use service::ServiceProviderConfiguration;

use std::borrow::Cow;
use std::sync::Arc;

use crate::transform::EntryTransformer;
use crate::{EntryKind, EntryPath, Result, Timestamp};

/// The jar manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Last-modified time.
    pub time: Timestamp,
    /// The parsed manifest.
    pub manifest: Manifest,
}

impl ManifestEntry {
    /// Creates a manifest entry.
    pub fn new(time: Timestamp, manifest: Manifest) -> Self {
        Self { time, manifest }
    }

    /// Returns the manifest path.
    pub fn path(&self) -> EntryPath {
        EntryPath::manifest()
    }
}

/// A service provider configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfigEntry {
    path: EntryPath,
    /// Last-modified time.
    pub time: Timestamp,
    config: ServiceProviderConfiguration,
}

impl ServiceConfigEntry {
    /// Creates an entry for `config`, stored under its service's path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryPath`](crate::Error::InvalidEntryPath) if
    /// the service name does not form a valid path.
    pub fn new(time: Timestamp, config: ServiceProviderConfiguration) -> Result<Self> {
        let path = EntryPath::for_service(config.service())?;
        Ok(Self { path, time, config })
    }

    /// Returns the entry path.
    pub fn path(&self) -> &EntryPath {
        &self.path
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServiceProviderConfiguration {
        &self.config
    }

    /// Returns the configuration for editing its providers.
    ///
    /// The service name, and therefore the path, cannot change through this
    /// handle; build a new entry to move a configuration.
    pub fn providers_mut(&mut self) -> ProvidersMut<'_> {
        ProvidersMut(&mut self.config)
    }

    /// Consumes the entry, returning the configuration.
    pub fn into_config(self) -> ServiceProviderConfiguration {
        self.config
    }
}

/// Provider-list access to a [`ServiceConfigEntry`].
#[derive(Debug)]
pub struct ProvidersMut<'a>(&'a mut ServiceProviderConfiguration);

impl ProvidersMut<'_> {
    /// See [`ServiceProviderConfiguration::add_provider`].
    pub fn add(&mut self, provider: impl Into<String>) -> bool {
        self.0.add_provider(provider)
    }

    /// See [`ServiceProviderConfiguration::remove_provider`].
    pub fn remove(&mut self, provider: &str) -> bool {
        self.0.remove_provider(provider)
    }

    /// See [`ServiceProviderConfiguration::map_providers`].
    pub fn map(&mut self, f: impl FnMut(&str) -> String) {
        self.0.map_providers(f)
    }
}

/// A compiled class file.
///
/// The bytes are shared, so cloning an entry (or handing it out of an
/// archive's class cache) does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    path: EntryPath,
    /// Last-modified time.
    pub time: Timestamp,
    data: Arc<[u8]>,
}

impl ClassEntry {
    /// Creates a class entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryPath`](crate::Error::InvalidEntryPath) if
    /// `path` does not end in `.class` or lies under `META-INF/services/`.
    pub fn new(path: EntryPath, time: Timestamp, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        if path.kind() != EntryKind::Class {
            return Err(crate::Error::InvalidEntryPath(format!(
                "'{}' is not a class path",
                path
            )));
        }
        Ok(Self {
            path,
            time,
            data: data.into(),
        })
    }

    /// Returns the entry path.
    pub fn path(&self) -> &EntryPath {
        &self.path
    }

    /// Returns the internal type name, e.g. `org/example/Main`.
    pub fn name(&self) -> &str {
        // Construction guarantees the suffix
        self.path.class_name().unwrap_or(self.path.as_str())
    }

    /// Returns the class bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a shared handle to the class bytes.
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// Returns a copy of this entry with different bytes.
    pub fn with_data(&self, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            path: self.path.clone(),
            time: self.time,
            data: data.into(),
        }
    }
}

/// Any other file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    path: EntryPath,
    /// Last-modified time.
    pub time: Timestamp,
    /// File contents.
    pub data: Vec<u8>,
}

impl ResourceEntry {
    /// Creates a resource entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryPath`](crate::Error::InvalidEntryPath) if
    /// the path would classify as another kind of entry.
    pub fn new(path: EntryPath, time: Timestamp, data: impl Into<Vec<u8>>) -> Result<Self> {
        if path.kind() != EntryKind::Resource {
            return Err(crate::Error::InvalidEntryPath(format!(
                "'{}' is a {} path, not a resource path",
                path,
                path.kind()
            )));
        }
        Ok(Self {
            path,
            time,
            data: data.into(),
        })
    }

    /// Returns the entry path.
    pub fn path(&self) -> &EntryPath {
        &self.path
    }
}

/// One classified archive record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// The jar manifest.
    Manifest(ManifestEntry),
    /// A service provider configuration.
    ServiceConfig(ServiceConfigEntry),
    /// A compiled class.
    Class(ClassEntry),
    /// Any other file.
    Resource(ResourceEntry),
}

impl Entry {
    /// Builds an entry from a record's path and raw contents.
    ///
    /// Manifests and service configurations are parsed; class and resource
    /// bytes are kept as-is.
    pub fn from_bytes(path: EntryPath, time: Timestamp, data: Vec<u8>) -> Result<Self> {
        Ok(match path.kind() {
            EntryKind::Manifest => Entry::Manifest(ManifestEntry::new(time, Manifest::parse(&data)?)),
            EntryKind::ServiceConfig => {
                let service = path.service_name().unwrap_or_default().to_string();
                let config = ServiceProviderConfiguration::parse(service, &data)?;
                Entry::ServiceConfig(ServiceConfigEntry { path, time, config })
            }
            EntryKind::Class => Entry::Class(ClassEntry {
                path,
                time,
                data: data.into(),
            }),
            EntryKind::Resource => Entry::Resource(ResourceEntry { path, time, data }),
        })
    }

    /// Returns the entry's kind.
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Manifest(_) => EntryKind::Manifest,
            Entry::ServiceConfig(_) => EntryKind::ServiceConfig,
            Entry::Class(_) => EntryKind::Class,
            Entry::Resource(_) => EntryKind::Resource,
        }
    }

    /// Returns the entry's path.
    pub fn path(&self) -> Cow<'_, EntryPath> {
        match self {
            Entry::Manifest(e) => Cow::Owned(e.path()),
            Entry::ServiceConfig(e) => Cow::Borrowed(e.path()),
            Entry::Class(e) => Cow::Borrowed(e.path()),
            Entry::Resource(e) => Cow::Borrowed(e.path()),
        }
    }

    /// Returns the entry's last-modified time.
    pub fn time(&self) -> Timestamp {
        match self {
            Entry::Manifest(e) => e.time,
            Entry::ServiceConfig(e) => e.time,
            Entry::Class(e) => e.time,
            Entry::Resource(e) => e.time,
        }
    }

    /// Returns the serialized contents to store in an archive.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Entry::Manifest(e) => Cow::Owned(e.manifest.to_bytes()),
            Entry::ServiceConfig(e) => Cow::Owned(e.config.to_bytes()),
            Entry::Class(e) => Cow::Borrowed(e.data()),
            Entry::Resource(e) => Cow::Borrowed(&e.data),
        }
    }

    /// Passes the entry through the transformer method for its variant.
    ///
    /// Returns `Ok(None)` when the transformer deletes the entry.
    pub fn accept<T: EntryTransformer + ?Sized>(self, transformer: &T) -> Result<Option<Entry>> {
        Ok(match self {
            Entry::Manifest(e) => transformer.transform_manifest(e)?.map(Entry::Manifest),
            Entry::ServiceConfig(e) => transformer
                .transform_service_config(e)?
                .map(Entry::ServiceConfig),
            Entry::Class(e) => transformer.transform_class(e)?.map(Entry::Class),
            Entry::Resource(e) => transformer.transform_resource(e)?.map(Entry::Resource),
        })
    }
}
