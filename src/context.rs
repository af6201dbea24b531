//! Per-run context handed to transformer constructors.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::classpath::Classpath;

/// Type-hierarchy information built on top of a run's [`Classpath`].
///
/// The analysis itself lives outside this crate; a run only constructs one
/// through the factory installed with
/// [`Atlas::inheritance`](crate::Atlas::inheritance) and hands it to
/// transformers through the [`TransformContext`].
pub trait InheritanceProvider: Send + Sync {
    /// Returns the direct supertypes of `class` (internal names, superclass
    /// first), or `None` if the class cannot be resolved.
    fn supertypes(&self, class: &str) -> Option<Vec<String>>;

    /// Returns `true` if `class` is `ancestor` or inherits from it, following
    /// [`supertypes`](Self::supertypes) transitively.
    fn is_subtype(&self, class: &str, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![class.to_string()];
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.supertypes(&current) {
                pending.extend(parents);
            }
        }
        false
    }
}

impl<P: InheritanceProvider + ?Sized> InheritanceProvider for Arc<P> {
    fn supertypes(&self, class: &str) -> Option<Vec<String>> {
        (**self).supertypes(class)
    }
}

/// The provider used when no inheritance analysis is installed; it resolves
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnresolvedInheritance;

impl InheritanceProvider for UnresolvedInheritance {
    fn supertypes(&self, _class: &str) -> Option<Vec<String>> {
        None
    }
}

/// Builds the inheritance analysis for one run from its classpath.
pub type InheritanceFactory = dyn Fn(Classpath) -> Arc<dyn InheritanceProvider> + Send + Sync;

/// Everything a transformer constructor may need about the current run.
///
/// One context exists per run; it is dropped together with the run's
/// transformers.
#[derive(Clone)]
pub struct TransformContext {
    classpath: Classpath,
    inheritance: Arc<dyn InheritanceProvider>,
}

impl TransformContext {
    /// Creates a context, building the inheritance analysis with `factory`
    /// or falling back to [`UnresolvedInheritance`].
    pub fn new(classpath: Classpath, factory: Option<&InheritanceFactory>) -> Self {
        let inheritance = match factory {
            Some(build) => build(classpath.clone()),
            None => Arc::new(UnresolvedInheritance),
        };
        Self {
            classpath,
            inheritance,
        }
    }

    /// Returns the inheritance analysis for the archive being processed.
    pub fn inheritance(&self) -> &Arc<dyn InheritanceProvider> {
        &self.inheritance
    }

    /// Returns the run's classpath: the archive being processed, then every
    /// auxiliary archive.
    pub fn classpath(&self) -> &Classpath {
        &self.classpath
    }
}

impl fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field("classpath", &self.classpath)
            .finish_non_exhaustive()
    }
}
