//! # Load Restriction Policies
//!
//! A [`LoadRestrictor`] decides whether `FileLoader::load` may read a path.
//! It is picked once at the origin of a loader tree and inherited by local
//! children. Loaders rooted in a cloned repository always use
//! [`LoadRestrictor::RootOnly`], whatever their referrer uses.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::filesystem::{ConfirmedDir, FileSystem};

/// Restriction policy applied by `FileLoader::load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadRestrictor {
    /// Only files in or below the loader root may be read.
    #[default]
    RootOnly,
    /// Any path is passed through unchanged.
    Unrestricted,
}

impl LoadRestrictor {
    /// Check `path` against `root`, returning the path to read.
    ///
    /// `RootOnly` resolves the path through `fs` first, so `..` components
    /// and symlinks cannot smuggle a read out of the root.
    pub fn apply(self, fs: &dyn FileSystem, root: &ConfirmedDir, path: &Path) -> Result<PathBuf> {
        match self {
            LoadRestrictor::Unrestricted => Ok(path.to_path_buf()),
            LoadRestrictor::RootOnly => {
                let (dir, file) = fs.clean_abs(path)?;
                let Some(file) = file else {
                    return Err(Error::NotAFile {
                        path: path.to_path_buf(),
                    });
                };
                if !dir.has_prefix(root) {
                    return Err(Error::Restricted {
                        path: path.to_path_buf(),
                        root: root.as_path().to_path_buf(),
                    });
                }
                Ok(dir.join(file))
            }
        }
    }

    /// Name accepted by `FromStr` and shown by `Display`.
    pub fn as_str(self) -> &'static str {
        match self {
            LoadRestrictor::RootOnly => "root-only",
            LoadRestrictor::Unrestricted => "none",
        }
    }
}

impl fmt::Display for LoadRestrictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadRestrictor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "root-only" | "rootOnly" | "LoadRestrictionsRootOnly" => Ok(LoadRestrictor::RootOnly),
            "none" | "LoadRestrictionsNone" => Ok(LoadRestrictor::Unrestricted),
            other => Err(Error::Validation {
                field: "load restrictor".to_string(),
                value: other.to_string(),
                message: "expected 'root-only' or 'none'".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFs;

    fn setup() -> (MemoryFs, ConfirmedDir) {
        let fs = MemoryFs::new();
        fs.add_file_string("/app/overlay/patch.yaml", "patch").unwrap();
        fs.add_file_string("/app/secret.yaml", "secret").unwrap();
        let root = ConfirmedDir::from_resolved(PathBuf::from("/app/overlay"));
        (fs, root)
    }

    #[test]
    fn test_root_only_allows_file_under_root() {
        let (fs, root) = setup();
        let path = LoadRestrictor::RootOnly
            .apply(&fs, &root, Path::new("/app/overlay/./patch.yaml"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/app/overlay/patch.yaml"));
    }

    #[test]
    fn test_root_only_rejects_file_above_root() {
        let (fs, root) = setup();
        let err = LoadRestrictor::RootOnly
            .apply(&fs, &root, Path::new("/app/overlay/../secret.yaml"))
            .unwrap_err();
        assert!(matches!(err, Error::Restricted { .. }));
        assert!(err.to_string().contains("is not in or below '/app/overlay'"));
    }

    #[test]
    fn test_root_only_rejects_directory() {
        let (fs, root) = setup();
        let err = LoadRestrictor::RootOnly
            .apply(&fs, &root, Path::new("/app/overlay"))
            .unwrap_err();
        assert!(matches!(err, Error::NotAFile { .. }));
    }

    #[test]
    fn test_unrestricted_passes_through() {
        let (fs, root) = setup();
        let path = LoadRestrictor::Unrestricted
            .apply(&fs, &root, Path::new("/app/secret.yaml"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/app/secret.yaml"));
    }

    #[test]
    fn test_from_str_round_trips_display() {
        for restrictor in [LoadRestrictor::RootOnly, LoadRestrictor::Unrestricted] {
            assert_eq!(restrictor.to_string().parse::<LoadRestrictor>().unwrap(), restrictor);
        }
        assert_eq!(
            "LoadRestrictionsNone".parse::<LoadRestrictor>().unwrap(),
            LoadRestrictor::Unrestricted
        );
        assert!("sometimes".parse::<LoadRestrictor>().is_err());
    }
}
