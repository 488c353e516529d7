//! # Filesystem Collaborator
//!
//! The loader chain never touches the disk directly. Every path it needs
//! resolved, read, or removed goes through the [`FileSystem`] trait, so the
//! same chain logic runs against the real disk ([`DiskFs`]) or against a
//! virtual tree ([`MemoryFs`]) in tests and benchmarks.
//!
//! A [`ConfirmedDir`] is the only way a loader holds a root: an absolute,
//! cleaned directory path that a `FileSystem` has vouched for.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::path::{clean, has_prefix};

/// An absolute, cleaned path to a directory that existed when it was
/// confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfirmedDir(PathBuf);

impl ConfirmedDir {
    /// Wrap a path the caller has already resolved to an existing directory.
    ///
    /// Only [`FileSystem`] implementations should need this.
    pub fn from_resolved(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Join a path onto this directory and clean the result lexically.
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        clean(&self.0.join(path))
    }

    /// True if this directory is `other` or lies below it.
    pub fn has_prefix<P: AsRef<Path>>(&self, other: P) -> bool {
        has_prefix(&self.0, other.as_ref())
    }
}

impl AsRef<Path> for ConfirmedDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ConfirmedDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Path resolution and byte access used by the loader chain.
///
/// Implementations are shared by every loader in a tree and must be safe to
/// call from several threads.
pub trait FileSystem: Send + Sync {
    /// Resolve `path` to an absolute, cleaned, symlink-free directory plus an
    /// optional file name inside it.
    ///
    /// If `path` names a directory the file name is `None`. Otherwise the
    /// parent must exist and the final component is returned as the file
    /// name, whether or not that file exists.
    fn clean_abs(&self, path: &Path) -> Result<(ConfirmedDir, Option<String>)>;

    /// Read the bytes of the file at an absolute path.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Remove a file or directory tree. Removing a missing path succeeds.
    fn remove_all(&self, path: &Path) -> Result<()>;
}

/// [`FileSystem`] backed by the host disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

impl DiskFs {
    pub fn new() -> Self {
        Self
    }
}

fn split_file(path: &Path) -> Result<(&Path, String)> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok((parent, name.to_string_lossy().into_owned())),
        _ => Err(Error::Filesystem {
            message: format!("'{}' has no parent directory", path.display()),
        }),
    }
}

impl FileSystem for DiskFs {
    fn clean_abs(&self, path: &Path) -> Result<(ConfirmedDir, Option<String>)> {
        let absolute = if path.is_absolute() {
            clean(path)
        } else {
            clean(&std::env::current_dir()?.join(path))
        };

        if absolute.exists() {
            // Resolve the whole path so a symlinked file reports where it
            // actually lives.
            let real = absolute.canonicalize()?;
            if real.is_dir() {
                return Ok((ConfirmedDir(real), None));
            }
            let (dir, name) = split_file(&real)?;
            return Ok((ConfirmedDir(dir.to_path_buf()), Some(name)));
        }

        let (dir, name) = split_file(&absolute)?;
        if !dir.is_dir() {
            return Err(Error::Filesystem {
                message: format!("'{}' does not exist", dir.display()),
            });
        }
        Ok((ConfirmedDir(dir.canonicalize()?), Some(name)))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Represents a file held by [`MemoryFs`]
#[derive(Debug, Clone)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug)]
struct Entries {
    files: HashMap<PathBuf, File>,
    dirs: BTreeSet<PathBuf>,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            files: HashMap::new(),
            dirs: BTreeSet::from([PathBuf::from("/")]),
        }
    }
}

impl Entries {
    fn add_dir_all(&mut self, dir: &Path) {
        for ancestor in dir.ancestors() {
            if !self.dirs.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }
}

/// In-memory [`FileSystem`] rooted at `/`.
///
/// Relative paths are taken relative to `/`. Adding a file creates its
/// parent directories. There are no symlinks, so `clean_abs` is purely
/// lexical.
#[derive(Debug, Default)]
pub struct MemoryFs {
    entries: RwLock<Entries>,
}

impl MemoryFs {
    /// Create a new filesystem holding only `/`
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(path: &Path) -> PathBuf {
        clean(&Path::new("/").join(path))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>> {
        self.entries.read().map_err(|_| Error::LockPoisoned {
            context: "memory filesystem".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>> {
        self.entries.write().map_err(|_| Error::LockPoisoned {
            context: "memory filesystem".to_string(),
        })
    }

    /// Add or replace a file, creating its parent directories
    pub fn add_file<P: AsRef<Path>>(&self, path: P, file: File) -> Result<()> {
        let path = Self::normalize(path.as_ref());
        let mut entries = self.write()?;
        if entries.dirs.contains(&path) {
            return Err(Error::Filesystem {
                message: format!("'{}' is a directory", path.display()),
            });
        }
        if let Some(parent) = path.parent() {
            entries.add_dir_all(parent);
        }
        entries.files.insert(path, file);
        Ok(())
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&self, path: P, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Create a directory and its parents
    pub fn add_dir<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = Self::normalize(path.as_ref());
        let mut entries = self.write()?;
        if entries.files.contains_key(&path) {
            return Err(Error::Filesystem {
                message: format!("'{}' is a file", path.display()),
            });
        }
        entries.add_dir_all(&path);
        Ok(())
    }

    /// Check if a file or directory exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = Self::normalize(path.as_ref());
        self.read()
            .map(|e| e.files.contains_key(&path) || e.dirs.contains(&path))
            .unwrap_or(false)
    }

    /// Check if a directory exists
    pub fn is_dir<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = Self::normalize(path.as_ref());
        self.read().map(|e| e.dirs.contains(&path)).unwrap_or(false)
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.read().map(|e| e.files.len()).unwrap_or(0)
    }

    /// Check if the filesystem holds no files
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileSystem for MemoryFs {
    fn clean_abs(&self, path: &Path) -> Result<(ConfirmedDir, Option<String>)> {
        let path = Self::normalize(path);
        let entries = self.read()?;
        if entries.dirs.contains(&path) {
            return Ok((ConfirmedDir(path), None));
        }
        let (dir, name) = split_file(&path)?;
        if !entries.dirs.contains(dir) {
            return Err(Error::Filesystem {
                message: format!("'{}' does not exist", dir.display()),
            });
        }
        Ok((ConfirmedDir(dir.to_path_buf()), Some(name)))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let path = Self::normalize(path);
        let entries = self.read()?;
        match entries.files.get(&path) {
            Some(file) => Ok(file.content.clone()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )
            .into()),
        }
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let path = Self::normalize(path);
        let mut entries = self.write()?;
        entries.files.retain(|p, _| !p.starts_with(&path));
        entries.dirs.retain(|p| !p.starts_with(&path));
        entries.dirs.insert(PathBuf::from("/"));
        Ok(())
    }
}
