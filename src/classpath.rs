//! Class lookup across several archives.
//!
//! A [`ClassProvider`] maps an internal type name (`org/example/Main`) to the
//! bytes of its class file. Providers compose in order: the first one that
//! knows a class wins, so nearer archives shadow further ones the same way a
//! JVM classpath does.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use atlas::classpath::{Classpath, ClassProvider, provider_fn};
//!
//! let primary = provider_fn(|name| (name == "a/A").then(|| Arc::from(&b"primary"[..])));
//! let library = provider_fn(|name| Some(Arc::from(name.as_bytes())));
//!
//! let mut classpath = Classpath::new();
//! classpath.push(Arc::new(primary));
//! classpath.push(Arc::new(library));
//!
//! assert_eq!(classpath.class_bytes("a/A").as_deref(), Some(&b"primary"[..]));
//! assert_eq!(classpath.class_bytes("b/B").as_deref(), Some(&b"b/B"[..]));
//! ```

use std::fmt;
use std::sync::Arc;

/// Resolves internal type names to class file bytes.
///
/// Implementations are shared across worker threads, and each one is
/// responsible for its own caching.
pub trait ClassProvider: Send + Sync {
    /// Returns the bytes of the class file for `name`, if known.
    fn class_bytes(&self, name: &str) -> Option<Arc<[u8]>>;
}

impl<P: ClassProvider + ?Sized> ClassProvider for &P {
    fn class_bytes(&self, name: &str) -> Option<Arc<[u8]>> {
        (**self).class_bytes(name)
    }
}

impl<P: ClassProvider + ?Sized> ClassProvider for Box<P> {
    fn class_bytes(&self, name: &str) -> Option<Arc<[u8]>> {
        (**self).class_bytes(name)
    }
}

impl<P: ClassProvider + ?Sized> ClassProvider for Arc<P> {
    fn class_bytes(&self, name: &str) -> Option<Arc<[u8]>> {
        (**self).class_bytes(name)
    }
}

/// A provider backed by a closure.
///
/// Created with [`provider_fn`].
pub struct FnProvider<F>(F);

impl<F> ClassProvider for FnProvider<F>
where
    F: Fn(&str) -> Option<Arc<[u8]>> + Send + Sync,
{
    fn class_bytes(&self, name: &str) -> Option<Arc<[u8]>> {
        (self.0)(name)
    }
}

impl<F> fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider").finish_non_exhaustive()
    }
}

/// Wraps a closure as a [`ClassProvider`].
pub fn provider_fn<F>(f: F) -> FnProvider<F>
where
    F: Fn(&str) -> Option<Arc<[u8]>> + Send + Sync,
{
    FnProvider(f)
}

/// Queries `providers` in order and returns the first hit.
pub fn first_match<'a, I, P>(providers: I, name: &str) -> Option<Arc<[u8]>>
where
    I: IntoIterator<Item = &'a P>,
    P: ClassProvider + ?Sized + 'a,
{
    providers
        .into_iter()
        .find_map(|provider| provider.class_bytes(name))
}

/// The ordered classpath of one run.
///
/// The archive being transformed comes first, followed by auxiliary archives
/// in registration order. This is the view handed to the inheritance analysis.
#[derive(Clone, Default)]
pub struct Classpath {
    providers: Vec<Arc<dyn ClassProvider>>,
}

impl Classpath {
    /// Creates an empty classpath.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider at the lowest precedence.
    pub fn push(&mut self, provider: Arc<dyn ClassProvider>) {
        self.providers.push(provider);
    }

    /// Returns the number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if there are no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterates providers in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ClassProvider>> {
        self.providers.iter()
    }
}

impl ClassProvider for Classpath {
    fn class_bytes(&self, name: &str) -> Option<Arc<[u8]>> {
        first_match(&self.providers, name)
    }
}

impl FromIterator<Arc<dyn ClassProvider>> for Classpath {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ClassProvider>>>(iter: I) -> Self {
        Self {
            providers: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for Classpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classpath")
            .field("providers", &self.providers.len())
            .finish()
    }
}

/// A provider over a homogeneous list of providers, queried in order.
///
/// Behaves exactly like [`Classpath`] but owns its providers directly, for
/// callers composing lookups outside of a run.
#[derive(Debug, Clone, Default)]
pub struct CompositeClassProvider<P> {
    providers: Vec<P>,
}

impl<P: ClassProvider> CompositeClassProvider<P> {
    /// Creates a provider over `providers`, highest precedence first.
    pub fn new(providers: Vec<P>) -> Self {
        Self { providers }
    }

    /// Returns the underlying providers.
    pub fn providers(&self) -> &[P] {
        &self.providers
    }
}

impl<P: ClassProvider> ClassProvider for CompositeClassProvider<P> {
    fn class_bytes(&self, name: &str) -> Option<Arc<[u8]>> {
        first_match(&self.providers, name)
    }
}
