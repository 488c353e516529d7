//! Path manipulation utilities for overlay-loader

use std::path::{Component, Path, PathBuf};

/// Lexically clean a path.
///
/// Drops `.` components and folds each `..` into the preceding normal
/// component. A `..` directly under the filesystem root is discarded, a
/// leading `..` on a relative path is kept. Symlinks are not consulted.
/// An empty result becomes `.`.
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// True if `path` is `prefix` or lies below it, compared component-wise.
///
/// `/a/bc` is not below `/a/b`.
pub fn has_prefix(path: &Path, prefix: &Path) -> bool {
    path.starts_with(prefix)
}

/// Encode a repository reference to be filesystem-safe
///
/// Used to build recognizable temp directory names for clones.
pub fn encode_url_path(url: &str) -> String {
    url.chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect()
}
