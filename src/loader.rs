//! # Loader Chain
//!
//! A [`FileLoader`] is an overlay's only way to reach files. The directory
//! holding an overlay file is that loader's _root_. Every loader has an
//! immutable root and offers two operations:
//!
//! - [`FileLoader::load`] reads a supplemental file (patch, resource,
//!   generator input). The loader's [`LoadRestrictor`] decides which paths
//!   are reachable.
//! - [`FileLoader::new_child`] derives a loader for a declared base. A base
//!   is either a directory relative to the current root, or a remote Git
//!   reference. A remote base is cloned and the new loader is rooted in the
//!   clone.
//!
//! Each child keeps a borrowed link to the loader that made it. Walking that
//! chain rejects:
//!
//! - A remote base whose repository was already seen higher up (a cycle).
//! - A local base equal to or above any root on the chain. `../foo` is
//!   fine. `.`, `..`, `../..` and so on are refused.
//! - A local base that climbs out of the cloned repository it was declared
//!   in.
//!
//! Together these keep overlays self-contained and relocatable, and keep a
//! remote overlay from reading host files such as `/etc/passwd`.
//!
//! The referrer is a plain borrow of an already-built loader, so a node can
//! never appear twice on its own chain and dropping a child never touches
//! its parent. Releasing a clone is explicit through [`FileLoader::cleanup`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::filesystem::{ConfirmedDir, FileSystem};
use crate::git::Cloner;
use crate::repospec::{Cleaner, RepoSpec};
use crate::restrictor::LoadRestrictor;
use crate::validator::Validator;

/// Root used by [`FileLoader::at_cwd`].
pub const CWD: &str = ".";

/// A node in the loader chain.
pub struct FileLoader<'a> {
    /// Loader that spawned this one, `None` at the tree origin.
    referrer: Option<&'a FileLoader<'a>>,

    /// Absolute, cleaned directory that relative `load` paths start from.
    root: ConfirmedDir,

    /// Restricts what `load` may read.
    restrictor: LoadRestrictor,

    validator: &'a dyn Validator,

    /// Set when this root is (inside) a clone of a remote repository.
    repo_spec: Option<RepoSpec>,

    fs: &'a dyn FileSystem,

    cloner: &'a dyn Cloner,

    /// Taken on the first `cleanup`.
    cleaner: Mutex<Option<Cleaner>>,
}

/// Check that `path` names a directory and return it confirmed.
///
/// Every root, at the tree origin or inside `new_child`, is admitted here.
pub fn demand_directory_root(fs: &dyn FileSystem, path: &Path) -> Result<ConfirmedDir> {
    if path.as_os_str().is_empty() {
        return Err(Error::EmptyPath { what: "loader root" });
    }
    let (dir, file) = fs.clean_abs(path)?;
    if let Some(file) = file {
        return Err(Error::NotADirectory {
            path: path.display().to_string(),
            file,
        });
    }
    Ok(dir)
}

/// Reject a clone root that does not lie in or below its clone directory.
fn err_if_outside_clone(repo_spec: &RepoSpec, root: ConfirmedDir) -> Result<ConfirmedDir> {
    match repo_spec.clone_dir() {
        Some(clone_dir) if !root.has_prefix(clone_dir) => Err(Error::ContainmentViolation {
            base: root.as_path().to_path_buf(),
            clone_dir: clone_dir.as_path().to_path_buf(),
        }),
        _ => Ok(root),
    }
}

impl<'a> FileLoader<'a> {
    /// Create the origin loader of a tree, rooted at `path`.
    pub fn new(
        restrictor: LoadRestrictor,
        validator: &'a dyn Validator,
        fs: &'a dyn FileSystem,
        cloner: &'a dyn Cloner,
        path: &Path,
    ) -> Result<Self> {
        let root = demand_directory_root(fs, path)?;
        Ok(Self::at_confirmed_dir(
            restrictor, validator, root, fs, None, cloner,
        ))
    }

    /// Origin loader at the current working directory, restricted to it.
    pub fn at_cwd(
        validator: &'a dyn Validator,
        fs: &'a dyn FileSystem,
        cloner: &'a dyn Cloner,
    ) -> Result<Self> {
        Self::new(
            LoadRestrictor::RootOnly,
            validator,
            fs,
            cloner,
            Path::new(CWD),
        )
    }

    /// Origin loader at the filesystem root, restricted to it.
    pub fn at_fs_root(
        validator: &'a dyn Validator,
        fs: &'a dyn FileSystem,
        cloner: &'a dyn Cloner,
    ) -> Result<Self> {
        Self::new(
            LoadRestrictor::RootOnly,
            validator,
            fs,
            cloner,
            Path::new(std::path::MAIN_SEPARATOR_STR),
        )
    }

    fn at_confirmed_dir(
        restrictor: LoadRestrictor,
        validator: &'a dyn Validator,
        root: ConfirmedDir,
        fs: &'a dyn FileSystem,
        referrer: Option<&'a FileLoader<'a>>,
        cloner: &'a dyn Cloner,
    ) -> Self {
        Self {
            referrer,
            root,
            restrictor,
            validator,
            repo_spec: None,
            fs,
            cloner,
            cleaner: Mutex::new(None),
        }
    }

    /// Absolute path that relative `load` paths are joined onto.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn referrer(&self) -> Option<&FileLoader<'a>> {
        self.referrer
    }

    /// The remote repository this loader was cloned from, if any.
    pub fn repo_spec(&self) -> Option<&RepoSpec> {
        self.repo_spec.as_ref()
    }

    pub fn restrictor(&self) -> LoadRestrictor {
        self.restrictor
    }

    pub fn validator(&self) -> &'a dyn Validator {
        self.validator
    }

    /// This loader followed by each referrer up to the tree origin.
    pub fn lineage(&self) -> impl Iterator<Item = &FileLoader<'a>> {
        std::iter::successors(Some(self), |loader| loader.referrer)
    }

    /// Number of referrers above this loader.
    pub fn depth(&self) -> usize {
        self.lineage().count() - 1
    }

    /// Derive a loader for the base declared as `path`.
    ///
    /// Remote references are cloned through the cloner. Anything else is a
    /// directory relative to this root.
    pub fn new_child(&self, path: &str) -> Result<FileLoader<'_>> {
        if path.is_empty() {
            return Err(Error::EmptyPath { what: "new root" });
        }
        if let Some(repo_spec) = RepoSpec::parse(path) {
            trace!("'{}' is a remote base", path);
            self.err_if_repo_cycle(&repo_spec)?;
            return self.new_at_git_clone(repo_spec);
        }
        trace!("'{}' is a local base", path);
        if Path::new(path).is_absolute() {
            return Err(Error::AbsoluteBase {
                path: path.to_string(),
            });
        }
        let root = demand_directory_root(self.fs, &self.root.join(path))?;
        self.err_if_git_containment_violation(&root)?;
        self.err_if_arg_equal_or_higher(&root)?;
        debug!("new loader at {} (from {})", root, self.root);
        Ok(FileLoader::at_confirmed_dir(
            self.restrictor,
            self.validator,
            root,
            self.fs,
            Some(self),
            self.cloner,
        ))
    }

    /// Clone `repo_spec` and root a new loader in the clone.
    fn new_at_git_clone(&self, mut repo_spec: RepoSpec) -> Result<FileLoader<'_>> {
        debug!("cloning '{}' for {}", repo_spec.clone_url(), self.root);
        self.cloner.clone_repo(&mut repo_spec, self.fs)?;

        // The reference may name a file inside the repo, or climb out of it
        // with `..`; either only shows up after cloning.
        let root = match repo_spec
            .resolved_path()
            .and_then(|path| demand_directory_root(self.fs, &path))
            .and_then(|root| err_if_outside_clone(&repo_spec, root))
        {
            Ok(root) => root,
            Err(e) => {
                if let Err(cleanup_err) = (repo_spec.cleaner())(self.fs) {
                    warn!(
                        "failed to release clone of '{}': {}",
                        repo_spec.raw(),
                        cleanup_err
                    );
                }
                return Err(e);
            }
        };

        debug!("new loader at {} (clone of '{}')", root, repo_spec.raw());
        let cleaner = repo_spec.cleaner();
        Ok(FileLoader {
            referrer: Some(self),
            root,
            // Clones never read outside their own root.
            restrictor: LoadRestrictor::RootOnly,
            validator: self.validator,
            repo_spec: Some(repo_spec),
            fs: self.fs,
            cloner: self.cloner,
            cleaner: Mutex::new(Some(cleaner)),
        })
    }

    /// The nearest repository on the chain, starting with this loader.
    fn containing_repo(&self) -> Option<&RepoSpec> {
        self.lineage().find_map(|loader| loader.repo_spec.as_ref())
    }

    fn err_if_git_containment_violation(&self, base: &ConfirmedDir) -> Result<()> {
        let Some(clone_dir) = self.containing_repo().and_then(RepoSpec::clone_dir) else {
            return Ok(());
        };
        if !base.has_prefix(clone_dir) {
            return Err(Error::ContainmentViolation {
                base: base.as_path().to_path_buf(),
                clone_dir: clone_dir.as_path().to_path_buf(),
            });
        }
        Ok(())
    }

    /// Fail if `candidate` is equal to or above any root on the chain.
    fn err_if_arg_equal_or_higher(&self, candidate: &ConfirmedDir) -> Result<()> {
        match self.lineage().find(|loader| loader.root.has_prefix(candidate)) {
            Some(visited) => Err(Error::DirectoryCycle {
                candidate: candidate.as_path().to_path_buf(),
                visited: visited.root.as_path().to_path_buf(),
            }),
            None => Ok(()),
        }
    }

    // TODO: distinguish refs once identities carry them, so the same repo
    // path at two tags can be composed.
    fn err_if_repo_cycle(&self, new_spec: &RepoSpec) -> Result<()> {
        let seen = self
            .lineage()
            .filter_map(|loader| loader.repo_spec.as_ref())
            .find(|seen| seen.overlaps(new_spec));
        match seen {
            Some(seen) => Err(Error::RepoCycle {
                uri: new_spec.identity(),
                previous: seen.identity(),
            }),
            None => Ok(()),
        }
    }

    /// Read the file at `path`.
    ///
    /// Relative paths are taken relative to the root. The restriction policy
    /// sees the joined path and its errors come back unchanged, as do read
    /// errors from the filesystem.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let path: PathBuf = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let path = self.restrictor.apply(self.fs, &self.root, &path)?;
        self.fs.read_file(&path)
    }

    /// Release what this loader owns (a clone directory, if any).
    ///
    /// Runs the release action at most once. Later calls, and calls on
    /// loaders that own nothing, return `Ok(())`. Referrers and children
    /// are not touched.
    pub fn cleanup(&self) -> Result<()> {
        let cleaner = self
            .cleaner
            .lock()
            .map_err(|_| Error::LockPoisoned {
                context: format!("cleaner for {}", self.root),
            })?
            .take();
        match cleaner {
            Some(cleaner) => cleaner(self.fs),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for FileLoader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLoader")
            .field("root", &self.root)
            .field("restrictor", &self.restrictor)
            .field("repo", &self.repo_spec.as_ref().map(RepoSpec::raw))
            .field("depth", &self.depth())
            .finish()
    }
}
