//! The `Atlas` runner: classpath composition and per-run construction.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use atlas::context::InheritanceProvider;
use atlas::entry::{ClassEntry, ResourceEntry};
use atlas::{
    Archive, Atlas, ClassProvider, Classpath, EntryTransformer, Threads, TransformContext,
    TransformOptions,
};
use common::{MANIFEST, PROPERTIES, content, file_names, jar};

/// Replaces every resource with the bytes the classpath resolves for `name`.
struct Lookup {
    context: TransformContext,
    name: &'static str,
}

impl EntryTransformer for Lookup {
    fn transform_resource(&self, mut entry: ResourceEntry) -> atlas::Result<Option<ResourceEntry>> {
        entry.data = self
            .context
            .classpath()
            .class_bytes(self.name)
            .map(|bytes| bytes.to_vec())
            .unwrap_or_default();
        Ok(Some(entry))
    }
}

/// Answers supertypes from a fixed table and records which classes the
/// classpath resolved while it was built.
struct TableInheritance {
    resolved: Vec<String>,
}

impl InheritanceProvider for TableInheritance {
    fn supertypes(&self, class: &str) -> Option<Vec<String>> {
        if !self.resolved.iter().any(|r| r == class) {
            return None;
        }
        match class {
            "x/Child" => Some(vec!["x/Parent".into()]),
            "x/Parent" => Some(vec!["java/lang/Object".into()]),
            _ => None,
        }
    }
}

#[test]
fn test_primary_archive_wins_over_auxiliary() {
    let dir = tempfile::tempdir().unwrap();
    let primary = jar(
        dir.path(),
        "a.jar",
        &[("x/X.class", b"from-a"), ("probe.txt", b"")],
    );
    let auxiliary = jar(
        dir.path(),
        "b.jar",
        &[("x/X.class", b"from-b"), ("x/OnlyB.class", b"only-b")],
    );
    let output = dir.path().join("out.jar");

    let mut atlas = Atlas::new();
    atlas.use_jar(&auxiliary).unwrap();
    atlas.install(|ctx| {
        Box::new(Lookup {
            context: ctx.clone(),
            name: "x/X",
        })
    });
    let _ = atlas.run(&primary, &output).unwrap();
    assert_eq!(content(&output, "probe.txt").unwrap(), b"from-a");

    let mut atlas = Atlas::new();
    atlas.use_jar(&auxiliary).unwrap();
    atlas.install(|ctx| {
        Box::new(Lookup {
            context: ctx.clone(),
            name: "x/OnlyB",
        })
    });
    let _ = atlas.run(&primary, &output).unwrap();
    assert_eq!(content(&output, "probe.txt").unwrap(), b"only-b");
}

#[test]
fn test_auxiliaries_are_consulted_in_registration_order() {
    let dir = tempfile::tempdir().unwrap();
    let primary = jar(dir.path(), "p.jar", &[("probe.txt", b"")]);
    let first = jar(dir.path(), "1.jar", &[("x/Y.class", b"first")]);
    let second = jar(dir.path(), "2.jar", &[("x/Y.class", b"second")]);
    let output = dir.path().join("out.jar");

    let mut atlas = Atlas::new();
    atlas.use_jar(&first).unwrap().use_jar(&second).unwrap();
    atlas.install(|ctx| {
        Box::new(Lookup {
            context: ctx.clone(),
            name: "x/Y",
        })
    });
    let _ = atlas.run(&primary, &output).unwrap();

    assert_eq!(content(&output, "probe.txt").unwrap(), b"first");
    assert_eq!(atlas.classpath().len(), 2);
}

#[test]
fn test_constructors_run_once_per_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = jar(dir.path(), "in.jar", PROPERTIES);
    let calls = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    struct Tag(&'static str);
    impl EntryTransformer for Tag {
        fn transform_resource(&self, mut e: ResourceEntry) -> atlas::Result<Option<ResourceEntry>> {
            e.data.extend_from_slice(self.0.as_bytes());
            Ok(Some(e))
        }
    }

    let mut atlas = Atlas::with_options(TransformOptions::new().threads(Threads::count_or_single(4)));
    for tag in ["-1", "-2"] {
        let calls = Arc::clone(&calls);
        let order = Arc::clone(&order);
        atlas.install(move |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            order.lock().unwrap().push(tag);
            Box::new(Tag(tag))
        });
    }

    let output = dir.path().join("out.jar");
    let _ = atlas.run(&input, &output).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(content(&output, "one.properties").unwrap(), b"hello-1-2");

    let archive = Archive::open(&input).unwrap();
    let _ = atlas.process_archive(&archive).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(*order.lock().unwrap(), ["-1", "-2", "-1", "-2"]);
    assert!(!archive.is_closed());
}

#[test]
fn test_inheritance_factory_sees_the_run_classpath() {
    let dir = tempfile::tempdir().unwrap();
    let primary = jar(dir.path(), "p.jar", &[("x/Child.class", b"child")]);
    let auxiliary = jar(dir.path(), "lib.jar", &[("x/Parent.class", b"parent")]);
    let observed = Arc::new(Mutex::new(None));

    struct Check {
        context: TransformContext,
        observed: Arc<Mutex<Option<bool>>>,
    }
    impl EntryTransformer for Check {
        fn transform_class(&self, e: ClassEntry) -> atlas::Result<Option<ClassEntry>> {
            let ok = self.context.inheritance().is_subtype(e.name(), "java/lang/Object");
            *self.observed.lock().unwrap() = Some(ok);
            Ok(Some(e))
        }
    }

    let mut atlas = Atlas::new();
    atlas.use_jar(&auxiliary).unwrap();
    atlas.inheritance(|classpath: Classpath| {
        let resolved = ["x/Child", "x/Parent"]
            .into_iter()
            .filter(|name| classpath.class_bytes(name).is_some())
            .map(str::to_owned)
            .collect();
        Arc::new(TableInheritance { resolved }) as Arc<dyn InheritanceProvider>
    });
    let seen = Arc::clone(&observed);
    atlas.install(move |ctx| {
        Box::new(Check {
            context: ctx.clone(),
            observed: Arc::clone(&seen),
        })
    });

    let archive = Archive::open(&primary).unwrap();
    let _ = atlas.process_archive(&archive).unwrap();
    assert_eq!(*observed.lock().unwrap(), Some(true));
}

#[test]
fn test_without_factory_inheritance_is_unresolved() {
    let dir = tempfile::tempdir().unwrap();
    let primary = jar(dir.path(), "p.jar", &[("x/A.class", b"a")]);
    let observed = Arc::new(Mutex::new(None));

    struct Probe(TransformContext, Arc<Mutex<Option<Option<Vec<String>>>>>);
    impl EntryTransformer for Probe {
        fn transform_class(&self, e: ClassEntry) -> atlas::Result<Option<ClassEntry>> {
            *self.1.lock().unwrap() = Some(self.0.inheritance().supertypes(e.name()));
            Ok(Some(e))
        }
    }

    let mut atlas = Atlas::new();
    let seen = Arc::clone(&observed);
    atlas.install(move |ctx| Box::new(Probe(ctx.clone(), Arc::clone(&seen))));
    let _ = atlas.process_archive(&Archive::open(&primary).unwrap()).unwrap();

    assert_eq!(*observed.lock().unwrap(), Some(None));
}

#[test]
fn test_run_closes_input_and_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    let input = jar(
        dir.path(),
        "in.jar",
        &[("a.txt", b"a"), ("META-INF/MANIFEST.MF", MANIFEST)],
    );
    let output = dir.path().join("out.jar");

    struct Identity;
    impl EntryTransformer for Identity {}

    let mut atlas = Atlas::new();
    atlas.install(|_| Box::new(Identity));
    let result = atlas.run(&input, &output).unwrap();

    assert_eq!(result.entries_visited, 2);
    assert_eq!(result.entries_written, 2);
    assert_eq!(file_names(&output), ["META-INF/MANIFEST.MF", "a.txt"]);
}

#[test]
fn test_run_without_transformers_copies_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = jar(dir.path(), "in.jar", PROPERTIES);
    let output = dir.path().join("out.jar");

    let result = Atlas::new().run(&input, &output).unwrap();

    assert_eq!(result.entries_written, 3);
    assert_eq!(content(&output, "two.properties").unwrap(), b"world");
}

#[test]
fn test_close_and_drop_release_classpath_archives() {
    let dir = tempfile::tempdir().unwrap();
    let lib = Archive::open(jar(dir.path(), "lib.jar", &[("x/A.class", b"a")])).unwrap();
    let other = Archive::open(jar(dir.path(), "other.jar", &[("x/B.class", b"b")])).unwrap();

    let mut atlas = Atlas::new();
    atlas.use_archive(lib.clone());
    atlas.close();
    assert!(lib.is_closed());
    assert!(atlas.classpath().is_empty());

    {
        let mut atlas = Atlas::new();
        atlas.use_archive(other.clone());
    }
    assert!(other.is_closed());
}
