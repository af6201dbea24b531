//! Jar archives opened for reading.
//!
//! An [`Archive`] wraps a zip container on disk. Entries are read and
//! classified on demand; class entries are additionally cached, because an
//! archive used as a classpath source is mostly consulted for a handful of
//! supertypes and eager loading would read classes nobody asks for.
//!
//! # Example
//!
//! ```rust,no_run
//! use atlas::{Archive, EntryKind};
//! use atlas::archive::WalkOptions;
//!
//! fn list_resources(path: &str) -> atlas::Result<()> {
//!     let jar = Archive::open(path)?;
//!     let options = WalkOptions::new()
//!         .skip(EntryKind::Class)
//!         .skip(EntryKind::Manifest);
//!     for entry_path in jar.walk(options)? {
//!         println!("{}", entry_path);
//!     }
//!     jar.close();
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use zip::ZipArchive;

use crate::classpath::ClassProvider;
use crate::entry::{ClassEntry, Entry};
use crate::shared_file::SharedFile;
use crate::{EntryKind, EntryPath, Error, Result, Timestamp};

type ZipReader = ZipArchive<SharedFile>;

/// Categories of entries to leave out of [`Archive::walk`].
///
/// Each kind can be skipped independently. The default skips nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    skipped: u8,
}

impl WalkOptions {
    /// Creates options that visit every entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips entries of `kind`.
    pub fn skip(mut self, kind: EntryKind) -> Self {
        self.skipped |= kind.bit();
        self
    }

    /// Skips the manifest.
    pub fn skip_manifests(self) -> Self {
        self.skip(EntryKind::Manifest)
    }

    /// Skips service provider configurations.
    pub fn skip_service_configs(self) -> Self {
        self.skip(EntryKind::ServiceConfig)
    }

    /// Skips classes.
    pub fn skip_classes(self) -> Self {
        self.skip(EntryKind::Class)
    }

    /// Skips resources.
    pub fn skip_resources(self) -> Self {
        self.skip(EntryKind::Resource)
    }

    /// Returns `true` if entries of `kind` are visited.
    pub fn includes(&self, kind: EntryKind) -> bool {
        self.skipped & kind.bit() == 0
    }
}

/// Cache slot for one class path.
#[derive(Debug, Default)]
enum ClassSlot {
    #[default]
    Unread,
    Absent,
    Present(Arc<ClassEntry>),
}

struct Shared {
    path: PathBuf,
    /// Entry paths in central directory order, directory records excluded.
    entries: Vec<EntryPath>,
    /// Record index by stored name.
    stored: HashMap<String, usize>,
    /// Record index by normalized path; the first record wins.
    normalized: HashMap<EntryPath, usize>,
    /// Cloned per read; `None` once closed.
    zip: Mutex<Option<ZipReader>>,
    classes: Mutex<HashMap<EntryPath, Arc<Mutex<ClassSlot>>>>,
}

/// A jar opened for reading.
///
/// `Archive` is a cheap handle: clones share the same open container and
/// class cache, and closing any clone closes them all. All methods take
/// `&self` and may be called from several threads at once.
#[derive(Clone)]
pub struct Archive {
    shared: Arc<Shared>,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.shared.path)
            .field("entries", &self.shared.entries.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Archive {
    /// Opens the jar at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened and [`Error::Zip`]
    /// if it is not a zip-structured archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let zip = ZipArchive::new(SharedFile::open(path)?)?;

        let mut entries = Vec::new();
        let mut stored = HashMap::new();
        let mut normalized = HashMap::new();
        for index in 0..zip.len() {
            let Some(name) = zip.name_for_index(index) else {
                continue;
            };
            if name.ends_with('/') {
                continue;
            }
            let entry_path = EntryPath::from_record(name);
            stored.entry(name.to_owned()).or_insert(index);
            normalized.entry(entry_path.clone()).or_insert(index);
            entries.push(entry_path);
        }

        log::debug!(
            "opened {} ({} records, {} entries)",
            path.display(),
            zip.len(),
            entries.len()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                path: path.to_path_buf(),
                entries,
                stored,
                normalized,
                zip: Mutex::new(Some(zip)),
                classes: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Returns the location of the jar on disk.
    pub fn name(&self) -> &Path {
        &self.shared.path
    }

    /// Returns the number of entries (directory records excluded).
    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    /// Returns `true` if the jar holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        lock(&self.shared.zip).is_none()
    }

    /// Reads and classifies the entry at `path`.
    ///
    /// Class entries are served from the cache; every other kind is read
    /// fresh on each call. Returns `Ok(None)` if there is no such entry.
    pub fn get(&self, path: &EntryPath) -> Result<Option<Entry>> {
        if path.kind() == EntryKind::Class {
            return Ok(self.class(path)?.map(|class| Entry::Class((*class).clone())));
        }

        match self.read_record(path)? {
            Some((time, data)) => Entry::from_bytes(path.clone(), time, data).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the cached class entry at `path`, reading it on first use.
    ///
    /// Concurrent first requests for the same path read the record once;
    /// every caller receives the same `Arc`. A failed read is not cached.
    /// Returns `Ok(None)` without touching the archive if `path` is not a
    /// class path.
    pub fn class(&self, path: &EntryPath) -> Result<Option<Arc<ClassEntry>>> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        if path.kind() != EntryKind::Class {
            return Ok(None);
        }

        let cell = {
            let mut classes = lock(&self.shared.classes);
            Arc::clone(classes.entry(path.clone()).or_default())
        };

        let mut slot = lock(&cell);
        match &*slot {
            ClassSlot::Present(class) => return Ok(Some(Arc::clone(class))),
            ClassSlot::Absent => return Ok(None),
            ClassSlot::Unread => {}
        }

        let loaded = match self.read_record(path)? {
            Some((time, data)) => Some(Arc::new(ClassEntry::new(path.clone(), time, data)?)),
            None => None,
        };
        log::trace!("cached class {} from {}", path, self.shared.path.display());
        *slot = match &loaded {
            Some(class) => ClassSlot::Present(Arc::clone(class)),
            None => ClassSlot::Absent,
        };
        Ok(loaded)
    }

    /// Returns the cached class entry for an internal type name.
    pub fn class_by_name(&self, type_name: &str) -> Result<Option<Arc<ClassEntry>>> {
        self.class(&EntryPath::for_class(type_name)?)
    }

    /// Enumerates entry paths in the archive's own order, leaving out the
    /// kinds `options` skips.
    ///
    /// Each call starts a fresh enumeration. Directory records are never
    /// yielded. Every other record is yielded exactly once, including
    /// records whose stored name is not in normalized form (see
    /// [`EntryPath::stored_name`]).
    pub fn walk(&self, options: WalkOptions) -> Result<Walk<'_>> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(Walk {
            entries: self.shared.entries.iter(),
            options,
        })
    }

    /// Closes the archive.
    ///
    /// Releases the file handle and drops the class cache. Further lookups
    /// fail with [`Error::Closed`]. Calling `close` again does nothing.
    pub fn close(&self) {
        if lock(&self.shared.zip).take().is_some() {
            log::debug!("closed {}", self.shared.path.display());
        }
        lock(&self.shared.classes).clear();
    }

    fn read_record(&self, path: &EntryPath) -> Result<Option<(Timestamp, Vec<u8>)>> {
        let mut zip = lock(&self.shared.zip).clone().ok_or(Error::Closed)?;

        let index = self
            .shared
            .stored
            .get(path.stored_name())
            .or_else(|| self.shared.normalized.get(path));
        let Some(&index) = index else {
            return Ok(None);
        };

        let mut file = zip.by_index(index)?;
        if file.is_dir() {
            return Ok(None);
        }

        let time = file
            .last_modified()
            .and_then(Timestamp::from_zip)
            .unwrap_or_default();
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut data)?;
        Ok(Some((time, data)))
    }
}

impl ClassProvider for Archive {
    fn class_bytes(&self, name: &str) -> Option<Arc<[u8]>> {
        match self.class_by_name(name) {
            Ok(class) => class.map(|c| c.shared_data()),
            Err(e) => {
                log::warn!(
                    "failed to read class {} from {}: {}",
                    name,
                    self.shared.path.display(),
                    e
                );
                None
            }
        }
    }
}

/// Iterator returned by [`Archive::walk`].
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    entries: std::slice::Iter<'a, EntryPath>,
    options: WalkOptions,
}

impl Iterator for Walk<'_> {
    type Item = EntryPath;

    fn next(&mut self) -> Option<Self::Item> {
        let options = self.options;
        self.entries
            .by_ref()
            .find(|path| options.includes(path.kind()))
            .cloned()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.entries.size_hint().1)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("archive lock was poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}
