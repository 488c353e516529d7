//! Default values for overlay-loader.
//!
//! This module provides centralized default values used by the library and
//! the command-line tool.

use crate::restrictor::LoadRestrictor;

/// File names recognized as an overlay file, in lookup order.
pub const OVERLAY_FILE_NAMES: [&str; 3] = ["kustomization.yaml", "kustomization.yml", "Kustomization"];

/// Prefix for temp directories created by `GitExecCloner`.
pub const CLONE_DIR_PREFIX: &str = "overlay-loader-";

/// Environment variable consulted for `--load-restrictor`.
pub const LOAD_RESTRICTOR_ENV: &str = "OVERLAY_LOAD_RESTRICTOR";

/// Returns the restriction policy used when none is requested.
pub fn default_load_restrictor() -> LoadRestrictor {
    LoadRestrictor::RootOnly
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_load_restrictor_is_root_only() {
        assert_eq!(default_load_restrictor(), LoadRestrictor::RootOnly);
    }

    #[test]
    fn test_overlay_file_names_prefer_yaml() {
        assert_eq!(OVERLAY_FILE_NAMES[0], "kustomization.yaml");
    }
}
