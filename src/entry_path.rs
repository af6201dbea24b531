//! Archive-internal entry paths and their classification.

use crate::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Maximum length for entry paths (in bytes).
const MAX_PATH_LENGTH: usize = 32768;

/// Path of the jar manifest.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Directory record that conventionally precedes the manifest.
pub const META_INF_DIR: &str = "META-INF/";

/// Prefix of service provider configuration files.
pub const SERVICES_PREFIX: &str = "META-INF/services/";

/// Suffix of compiled class files.
pub const CLASS_SUFFIX: &str = ".class";

/// The category an entry belongs to, decided solely by its path.
///
/// Classification is total: every path is exactly one kind.
///
/// ```
/// use atlas::{EntryKind, EntryPath};
///
/// let kind = |s| EntryPath::new(s).unwrap().kind();
/// assert_eq!(kind("META-INF/MANIFEST.MF"), EntryKind::Manifest);
/// assert_eq!(kind("META-INF/services/java.sql.Driver"), EntryKind::ServiceConfig);
/// assert_eq!(kind("org/example/Main.class"), EntryKind::Class);
/// assert_eq!(kind("logback.xml"), EntryKind::Resource);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    /// `META-INF/MANIFEST.MF`.
    Manifest,
    /// Anything under `META-INF/services/`.
    ServiceConfig,
    /// Any other path ending in `.class`.
    Class,
    /// Everything else.
    Resource,
}

impl EntryKind {
    /// All kinds, in classification precedence order.
    pub const ALL: [EntryKind; 4] = [
        EntryKind::Manifest,
        EntryKind::ServiceConfig,
        EntryKind::Class,
        EntryKind::Resource,
    ];

    /// Classifies a normalized entry name.
    pub fn of(name: &str) -> Self {
        if name == MANIFEST_PATH {
            EntryKind::Manifest
        } else if name.starts_with(SERVICES_PREFIX) {
            EntryKind::ServiceConfig
        } else if name.ends_with(CLASS_SUFFIX) {
            EntryKind::Class
        } else {
            EntryKind::Resource
        }
    }

    pub(crate) const fn bit(self) -> u8 {
        match self {
            EntryKind::Manifest => 1,
            EntryKind::ServiceConfig => 1 << 1,
            EntryKind::Class => 1 << 2,
            EntryKind::Resource => 1 << 3,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::Manifest => "manifest",
            EntryKind::ServiceConfig => "service provider configuration",
            EntryKind::Class => "class",
            EntryKind::Resource => "resource",
        };
        f.write_str(name)
    }
}

/// A validated path of an entry inside a jar.
///
/// Paths are normalized on construction: backslashes become `/` and leading
/// slashes are dropped, so `"/a/b.txt"` and `"a\\b.txt"` both name `a/b.txt`.
/// Equality, ordering and hashing use the normalized form.
///
/// After normalization the path must:
/// - be non-empty and free of NUL bytes
/// - not end with `/` (directory records are never entries)
/// - contain no empty, `.` or `..` segments
///
/// Paths enumerated from an archive also remember the record name they were
/// stored under when it differs from the normalized form, so the record can
/// be read back and rewritten under its original name. A stored name that
/// fails validation is kept verbatim as the path itself.
///
/// # Examples
///
/// ```
/// use atlas::EntryPath;
///
/// let path = EntryPath::new("/org/example/Main.class").unwrap();
/// assert_eq!(path.as_str(), "org/example/Main.class");
/// assert_eq!(path.class_name(), Some("org/example/Main"));
///
/// assert!(EntryPath::new("../escape.txt").is_err());
/// assert!(EntryPath::new("META-INF/").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct EntryPath {
    name: String,
    /// Record name in the source archive, when it differs from `name` or
    /// could not be normalized.
    stored: Option<Box<str>>,
}

impl EntryPath {
    /// Creates a new `EntryPath`, normalizing and validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryPath`] if the normalized path is empty,
    /// names a directory, or contains NUL bytes or empty, `.` or `..` segments.
    pub fn new(s: &str) -> Result<Self> {
        let normalized = Self::normalize(s);
        Self::validate(&normalized)?;
        Ok(Self {
            name: normalized,
            stored: None,
        })
    }

    /// Creates the path of a record named `stored` in an archive.
    ///
    /// Never fails: a name that normalizes to a valid path keeps the stored
    /// form alongside, and any other name is taken verbatim.
    pub(crate) fn from_record(stored: &str) -> Self {
        match Self::new(stored) {
            Ok(path) if path.name == stored => path,
            Ok(path) => Self {
                stored: Some(stored.into()),
                ..path
            },
            Err(e) => {
                log::debug!("keeping record name {:?} verbatim: {}", stored, e);
                Self {
                    name: stored.to_owned(),
                    stored: Some(stored.into()),
                }
            }
        }
    }

    /// Returns the path of the class file for an internal type name.
    ///
    /// ```
    /// use atlas::EntryPath;
    ///
    /// let path = EntryPath::for_class("java/lang/Object").unwrap();
    /// assert_eq!(path.as_str(), "java/lang/Object.class");
    /// ```
    pub fn for_class(type_name: &str) -> Result<Self> {
        Self::new(&format!("{}{}", type_name, CLASS_SUFFIX))
    }

    /// Returns the path of the configuration file for a service interface.
    pub fn for_service(service: &str) -> Result<Self> {
        Self::new(&format!("{}{}", SERVICES_PREFIX, service))
    }

    /// Returns the manifest path.
    pub fn manifest() -> Self {
        Self {
            name: MANIFEST_PATH.to_string(),
            stored: None,
        }
    }

    fn normalize(s: &str) -> String {
        let replaced = s.replace('\\', "/");
        replaced.trim_start_matches('/').to_string()
    }

    fn validate(s: &str) -> Result<()> {
        if s.contains('\0') {
            return Err(Error::InvalidEntryPath("contains NUL byte".into()));
        }

        if s.is_empty() {
            return Err(Error::InvalidEntryPath("empty path".into()));
        }

        if s.len() > MAX_PATH_LENGTH {
            return Err(Error::InvalidEntryPath(format!(
                "path exceeds maximum length of {} bytes",
                MAX_PATH_LENGTH
            )));
        }

        if s.ends_with('/') {
            return Err(Error::InvalidEntryPath(format!(
                "'{}' names a directory",
                s
            )));
        }

        for segment in s.split('/') {
            if segment.is_empty() {
                return Err(Error::InvalidEntryPath(
                    "empty segment (consecutive slashes)".into(),
                ));
            }
            if segment == "." {
                return Err(Error::InvalidEntryPath("'.' segment not allowed".into()));
            }
            if segment == ".." {
                return Err(Error::InvalidEntryPath(
                    "'..' segment not allowed (path traversal)".into(),
                ));
            }
        }

        Ok(())
    }

    /// Returns the path as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Returns the name this entry is written under: the record name it was
    /// read from, or the normalized path for paths built by hand.
    ///
    /// ```
    /// use atlas::EntryPath;
    ///
    /// let path = EntryPath::new("\\a\\b.txt").unwrap();
    /// assert_eq!(path.stored_name(), "a/b.txt");
    /// ```
    pub fn stored_name(&self) -> &str {
        self.stored.as_deref().unwrap_or(&self.name)
    }

    /// Returns `true` if this path carries a record name other than its
    /// normalized form.
    pub fn is_verbatim(&self) -> bool {
        self.stored.is_some()
    }

    /// Returns the category of the entry at this path.
    pub fn kind(&self) -> EntryKind {
        EntryKind::of(&self.name)
    }

    /// Returns the internal type name for a class path (the path without
    /// its `.class` suffix), or `None` if this is not a class path.
    pub fn class_name(&self) -> Option<&str> {
        match self.kind() {
            EntryKind::Class => self.name.strip_suffix(CLASS_SUFFIX),
            _ => None,
        }
    }

    /// Returns the service interface name for a service configuration path.
    pub fn service_name(&self) -> Option<&str> {
        self.name.strip_prefix(SERVICES_PREFIX)
    }

    /// Returns the file name (last segment) of this path.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Returns the directories containing this entry, outermost first, each
    /// with a trailing slash.
    ///
    /// ```
    /// use atlas::EntryPath;
    ///
    /// let path = EntryPath::new("a/b/c.txt").unwrap();
    /// let dirs: Vec<_> = path.parent_dirs().collect();
    /// assert_eq!(dirs, vec!["a/", "a/b/"]);
    /// ```
    pub fn parent_dirs(&self) -> impl Iterator<Item = &str> {
        self.name
            .match_indices('/')
            .map(move |(idx, _)| &self.name[..=idx])
    }
}

impl PartialEq for EntryPath {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntryPath {}

impl PartialOrd for EntryPath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryPath {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for EntryPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl AsRef<str> for EntryPath {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<&str> for EntryPath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntryPath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(&s)
    }
}
