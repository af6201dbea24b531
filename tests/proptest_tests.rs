//! Property-based tests using proptest.
//!
//! These tests verify invariants of paths, payload formats, timestamps and
//! archive enumeration using randomly generated inputs.

mod common;

use proptest::prelude::*;

use atlas::entry::{Manifest, ServiceProviderConfiguration};
use atlas::{Archive, EntryKind, EntryPath, Timestamp, WalkOptions};

/// Strategy for generating valid entry path strings.
///
/// - 1-4 path components separated by '/'
/// - Each component is 1-10 alphanumeric characters with optional underscores/dots/dashes
/// - Excludes "." and ".." segments
fn valid_path_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z0-9][a-zA-Z0-9_.-]{0,9}", 1..4)
        .prop_map(|parts| parts.join("/"))
        .prop_filter("must not contain invalid segments", |s| {
            !s.split('/').any(|seg| seg == "." || seg == "..")
        })
}

/// Strategy for manifest header names as the jar format allows them.
fn header_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9_-]{0,20}".prop_filter("reserved", |s| {
        !s.eq_ignore_ascii_case("Name") && !s.eq_ignore_ascii_case("Manifest-Version")
    })
}

proptest! {
    /// Valid paths should always parse to themselves.
    #[test]
    fn valid_paths_parse_successfully(path in valid_path_strategy()) {
        let result = EntryPath::new(&path);
        prop_assert!(result.is_ok(), "Valid path '{}' failed to parse: {:?}", path, result);
        let parsed = result.unwrap();
        prop_assert_eq!(parsed.as_str(), &path);
    }

    /// Leading slashes and backslashes are normalized away.
    #[test]
    fn separators_are_normalized(path in valid_path_strategy()) {
        let windows = format!("\\{}", path.replace('/', "\\"));
        let parsed = EntryPath::new(&windows).unwrap();
        prop_assert_eq!(parsed.as_str(), &path);
    }

    /// Paths with NUL bytes should always be rejected.
    #[test]
    fn nul_bytes_rejected(
        prefix in "[a-zA-Z0-9]{0,5}",
        suffix in "[a-zA-Z0-9]{0,5}"
    ) {
        let path = format!("{}\0{}", prefix, suffix);
        prop_assert!(EntryPath::new(&path).is_err(), "Path with NUL byte should be rejected");
    }

    /// Paths with ".." as a complete segment should always be rejected.
    #[test]
    fn traversal_paths_rejected(
        prefix in "[a-zA-Z0-9]{1,5}",
        suffix in "[a-zA-Z0-9]{1,5}"
    ) {
        let path = format!("{}/../{}", prefix, suffix);
        prop_assert!(EntryPath::new(&path).is_err(), "Traversal path '{}' should be rejected", path);
    }

    /// Empty segments (double slashes) should be rejected.
    #[test]
    fn empty_segments_rejected(
        part1 in "[a-zA-Z0-9]{1,5}",
        part2 in "[a-zA-Z0-9]{1,5}"
    ) {
        let path = format!("{}//{}", part1, part2);
        prop_assert!(EntryPath::new(&path).is_err(), "Path with empty segment '{}' should be rejected", path);
    }

    /// A type name maps to a class path and back.
    #[test]
    fn class_names_map_to_class_paths(name in valid_path_strategy()) {
        let path = EntryPath::for_class(&name).unwrap();
        prop_assert_eq!(path.kind(), EntryKind::Class);
        prop_assert_eq!(path.class_name(), Some(name.as_str()));
    }

    /// Classification of a path agrees with classification of its name.
    #[test]
    fn kind_matches_name(path in valid_path_strategy()) {
        let parsed = EntryPath::new(&path).unwrap();
        prop_assert_eq!(parsed.kind(), EntryKind::of(&path));
    }

    /// Manifest headers survive serialization, including values long enough
    /// to be wrapped over several lines.
    #[test]
    fn manifest_headers_survive_serialization(
        headers in proptest::collection::vec(
            (header_name_strategy(), "[ -~]{0,200}"),
            0..8,
        )
    ) {
        let mut manifest = Manifest::new();
        for (name, value) in &headers {
            manifest.main_attributes_mut().insert(name.clone(), value.trim().to_string());
        }

        let bytes = manifest.to_bytes();
        for line in bytes.split(|b| *b == b'\n') {
            prop_assert!(line.len() <= 73, "line too long: {:?}", String::from_utf8_lossy(line));
        }

        let parsed = Manifest::parse(&bytes).unwrap();
        for (name, value) in manifest.main_attributes().iter() {
            prop_assert_eq!(parsed.main_attributes().get(name), Some(value));
        }
    }

    /// Parsed provider lists never contain blanks, comments or duplicates.
    #[test]
    fn service_providers_are_clean(
        lines in proptest::collection::vec("[ #a-zA-Z.]{0,12}", 0..12)
    ) {
        let text = lines.join("\n");
        let config = ServiceProviderConfiguration::parse("x.Service", text.as_bytes()).unwrap();
        let providers = config.providers();

        let mut seen = std::collections::HashSet::new();
        for provider in providers {
            prop_assert!(!provider.is_empty());
            prop_assert!(!provider.contains('#'));
            prop_assert_eq!(provider.trim(), provider.as_str());
            prop_assert!(seen.insert(provider.clone()), "duplicate {}", provider);
        }
    }

    /// Converting to zip time loses at most the two-second resolution.
    #[test]
    fn zip_time_truncates_to_two_seconds(secs in 315_532_800i64..4_354_819_198i64) {
        let original = Timestamp::from_millis(secs * 1000);
        let back = Timestamp::from_zip(original.to_zip()).unwrap();
        let delta = original.as_millis() - back.as_millis();
        prop_assert!((0..2000).contains(&delta), "delta {} for {}", delta, secs);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Walking with a set of skipped kinds yields exactly the entries of the
    /// remaining kinds.
    #[test]
    fn walk_flags_partition_entries(skips in proptest::collection::vec(any::<bool>(), 4)) {
        let dir = tempfile::tempdir().unwrap();
        let path = common::jar(
            dir.path(),
            "walk.jar",
            &[
                ("META-INF/MANIFEST.MF", common::MANIFEST),
                ("META-INF/services/a.B", b"a.C\n"),
                ("a/C.class", b"\xca\xfe"),
                ("a/d.txt", b"d"),
                ("e.txt", b"e"),
            ],
        );
        let archive = Archive::open(&path).unwrap();

        let mut options = WalkOptions::new();
        for (kind, skip) in EntryKind::ALL.into_iter().zip(&skips) {
            if *skip {
                options = options.skip(kind);
            }
        }

        let walked: Vec<EntryPath> = archive.walk(options).unwrap().collect();
        let expected = archive
            .walk(WalkOptions::new())
            .unwrap()
            .filter(|p| options.includes(p.kind()))
            .count();
        prop_assert_eq!(walked.len(), expected);
        for p in &walked {
            prop_assert!(options.includes(p.kind()));
        }
    }
}
