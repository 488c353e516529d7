//! Property-based tests for path manipulation and the chain checks built on
//! top of it.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::error::Error;
    use crate::filesystem::MemoryFs;
    use crate::git::FixedDirCloner;
    use crate::loader::FileLoader;
    use crate::path::{clean, encode_url_path, has_prefix};
    use crate::restrictor::LoadRestrictor;
    use crate::validator::PermissiveValidator;
    use proptest::prelude::*;
    use std::path::{Component, Path, PathBuf};

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(".".to_string()),
            Just("..".to_string()),
            "[a-z]{1,6}",
        ]
    }

    fn absolute_path() -> impl Strategy<Value = PathBuf> {
        prop::collection::vec(segment(), 0..8).prop_map(|segs| {
            let mut path = PathBuf::from("/");
            for seg in segs {
                path.push(seg);
            }
            path
        })
    }

    // ============================================================================
    // encode_url_path property tests
    // ============================================================================

    proptest! {
        /// Property: encode_url_path never produces filesystem-unsafe characters
        #[test]
        fn encode_url_path_never_produces_unsafe_chars(input in ".*") {
            let result = encode_url_path(&input);
            let unsafe_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
            for ch in unsafe_chars {
                prop_assert!(
                    !result.contains(ch),
                    "encode_url_path produced unsafe character '{}' from input '{}'",
                    ch,
                    input
                );
            }
        }

        /// Property: encode_url_path preserves alphanumeric characters
        #[test]
        fn encode_url_path_preserves_alphanumeric(input in "[a-zA-Z0-9]+") {
            let result = encode_url_path(&input);
            prop_assert_eq!(result, input);
        }

        /// Property: characters are replaced 1:1
        #[test]
        fn encode_url_path_preserves_char_count(input in ".+") {
            let result = encode_url_path(&input);
            prop_assert_eq!(result.chars().count(), input.chars().count());
        }
    }

    // ============================================================================
    // clean / has_prefix property tests
    // ============================================================================

    proptest! {
        /// Property: cleaning twice is the same as cleaning once
        #[test]
        fn clean_is_idempotent(path in absolute_path()) {
            let once = clean(&path);
            prop_assert_eq!(clean(&once), once);
        }

        /// Property: a cleaned absolute path has no `.` or `..` components
        #[test]
        fn clean_absolute_has_no_dot_components(path in absolute_path()) {
            let cleaned = clean(&path);
            prop_assert!(cleaned.is_absolute());
            for component in cleaned.components() {
                prop_assert!(
                    !matches!(component, Component::CurDir | Component::ParentDir),
                    "'{}' cleaned to '{}'",
                    path.display(),
                    cleaned.display()
                );
            }
        }

        /// Property: every path has itself and `/` as a prefix
        #[test]
        fn has_prefix_reflexive_and_rooted(path in absolute_path()) {
            let cleaned = clean(&path);
            prop_assert!(has_prefix(&cleaned, &cleaned));
            prop_assert!(has_prefix(&cleaned, Path::new("/")));
        }

        /// Property: joining a plain name always lands below the original
        #[test]
        fn joined_child_has_parent_prefix(path in absolute_path(), name in "[a-z]{1,6}") {
            let parent = clean(&path);
            let child = clean(&parent.join(&name));
            prop_assert!(has_prefix(&child, &parent));
            prop_assert!(!has_prefix(&parent, &child));
        }

        /// Property: a name that merely shares a string prefix is not below
        #[test]
        fn has_prefix_respects_component_boundaries(
            path in absolute_path(),
            name in "[a-z]{1,6}",
            suffix in "[a-z]{1,3}",
        ) {
            let parent = clean(&path);
            let dir = parent.join(&name);
            let lookalike = parent.join(format!("{}{}", name, suffix));
            prop_assert!(!has_prefix(&lookalike, &dir));
        }
    }

    // ============================================================================
    // loader chain property tests
    // ============================================================================

    proptest! {
        /// Property: a base made only of `.` and `..` always resolves to the
        /// root or an ancestor of it, and is always refused
        #[test]
        fn upward_bases_are_always_cycles(segs in prop::collection::vec(
            prop_oneof![Just("."), Just("..")], 1..6,
        )) {
            let fs = MemoryFs::new();
            fs.add_dir("/r/a/b/c").unwrap();
            let cloner = FixedDirCloner::new("/clone");
            let loader = FileLoader::new(
                LoadRestrictor::RootOnly,
                &PermissiveValidator,
                &fs,
                &cloner,
                Path::new("/r/a/b/c"),
            )
            .unwrap();

            let base = segs.join("/");
            let err = loader.new_child(&base).unwrap_err();
            prop_assert!(
                matches!(err, Error::DirectoryCycle { .. }),
                "'{}' gave {:?}",
                base,
                err
            );
        }

        /// Property: a base strictly below the root is always accepted
        #[test]
        fn downward_bases_are_accepted(names in prop::collection::vec("[a-z]{1,6}", 1..4)) {
            let fs = MemoryFs::new();
            let relative = names.join("/");
            fs.add_dir(format!("/r/{}", relative)).unwrap();
            let cloner = FixedDirCloner::new("/clone");
            let loader = FileLoader::new(
                LoadRestrictor::RootOnly,
                &PermissiveValidator,
                &fs,
                &cloner,
                Path::new("/r"),
            )
            .unwrap();

            let child = loader.new_child(&relative).unwrap();
            let expected = Path::new("/r").join(&relative);
            prop_assert_eq!(child.root(), expected.as_path());
        }
    }
}
