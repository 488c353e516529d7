//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures, helper functions, and overlay
//! snippets to reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_overlay("base", overlays::EMPTY);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::env;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::overlays;
    #[allow(unused_imports)]
    pub use super::should_skip_network_tests;
    pub use super::TestFixture;
}

/// Common overlay file snippets for testing.
#[allow(dead_code)]
pub mod overlays {
    /// Overlay with nothing in it.
    pub const EMPTY: &str = "";

    /// Overlay with one file resource.
    pub const DEPLOYMENT: &str = r#"
resources:
  - deployment.yaml
"#;

    /// Overlay pointing at a sibling `base` directory.
    pub const ON_BASE: &str = r#"
namespace: prod
bases:
  - ../base
resources:
  - patch.yaml
"#;

    /// Overlay that points back at its own parent.
    pub const CYCLE_UP: &str = r#"
bases:
  - ..
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "bases: [unclosed";
}

/// Check if network tests should be skipped.
///
/// Returns `true` if the `SKIP_NETWORK_TESTS` environment variable is set.
#[allow(dead_code)]
pub fn should_skip_network_tests() -> bool {
    env::var("SKIP_NETWORK_TESTS").is_ok()
}

/// A test fixture that provides a temporary directory of overlays.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_overlay("base", overlays::DEPLOYMENT)
///     .with_file("base/deployment.yaml", "kind: Deployment");
///
/// let mut cmd = fixture.command();
/// cmd.arg("tree").arg("--root").arg(fixture.root().join("base"))
///     .assert()
///     .success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `dir/kustomization.yaml` with the given content.
    pub fn with_overlay(self, dir: &str, content: &str) -> Self {
        self.temp_dir
            .child(dir)
            .child("kustomization.yaml")
            .write_str(content)
            .expect("Failed to write overlay file");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Create an empty directory.
    #[allow(dead_code)]
    pub fn with_dir(self, path: &str) -> Self {
        self.temp_dir
            .child(path)
            .create_dir_all()
            .expect("Failed to create directory");
        self
    }

    /// Get the path to the temporary directory.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The temporary directory with symlinks resolved, as loaders report it.
    pub fn root(&self) -> PathBuf {
        self.temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp directory")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Create a command configured to run in this fixture's directory.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("overlay-loader");
        cmd.current_dir(self.path());
        cmd.env_remove("OVERLAY_LOAD_RESTRICTOR");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_overlay() {
        let fixture = TestFixture::new().with_overlay("base", overlays::EMPTY);
        assert!(fixture.path().join("base/kustomization.yaml").exists());
    }

    #[test]
    fn test_overlays_are_valid_yaml() {
        for overlay in [overlays::DEPLOYMENT, overlays::ON_BASE, overlays::CYCLE_UP] {
            serde_yaml::from_str::<serde_yaml::Value>(overlay).expect("Overlay should be valid YAML");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(overlays::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
