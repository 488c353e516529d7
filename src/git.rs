//! # Cloners
//!
//! A [`Cloner`] materializes a [`RepoSpec`] into a local directory and
//! records that directory on it. The loader chain treats cloning as opaque:
//! it calls the cloner once per remote base and propagates any error
//! unchanged.
//!
//! - [`GitExecCloner`] shells out to the system `git`, which picks up SSH
//!   keys, credential helpers and `~/.gitconfig` on its own.
//! - [`FixedDirCloner`] points every spec at an already-populated directory,
//!   for offline resolution and tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, warn};

use crate::defaults::CLONE_DIR_PREFIX;
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::path::encode_url_path;
use crate::repospec::RepoSpec;

/// Trait for clone operations - allows mocking in tests
pub trait Cloner: Send + Sync {
    /// Clone `spec` and record the clone directory on it.
    ///
    /// On failure the clone directory is removed; a removal that fails is
    /// logged and the clone error returned.
    fn clone_repo(&self, spec: &mut RepoSpec, fs: &dyn FileSystem) -> Result<()>;
}

/// Clones with the system `git` executable into a fresh temp directory.
#[derive(Debug, Clone, Default)]
pub struct GitExecCloner {
    temp_root: Option<PathBuf>,
}

impl GitExecCloner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place clone directories under `dir` instead of the system temp dir.
    pub fn with_temp_root(dir: PathBuf) -> Self {
        Self {
            temp_root: Some(dir),
        }
    }

    fn make_clone_dir(&self, spec: &RepoSpec) -> Result<PathBuf> {
        let prefix = format!("{}{}-", CLONE_DIR_PREFIX, encode_url_path(spec.org_repo()));
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        // Ownership moves to the loader's cleaner.
        Ok(dir.keep())
    }

    fn run_git(&self, spec: &RepoSpec, dir: &Path, args: &[&str]) -> Result<()> {
        debug!("git {} (in {})", args.join(" "), dir.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| Error::GitClone {
                url: spec.clone_url(),
                r#ref: ref_or_head(spec).to_string(),
                message: e.to_string(),
                hint: Some("Make sure git is installed and on PATH".to_string()),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            return Err(Error::GitClone {
                url: spec.clone_url(),
                r#ref: ref_or_head(spec).to_string(),
                message: stderr,
                hint: Some(
                    "For private repos, ensure an SSH key is loaded in ssh-agent, \
                     git credentials are configured, or a personal access token is set up"
                        .to_string(),
                ),
            });
        }
        Err(Error::GitCommand {
            command: args.join(" "),
            url: spec.clone_url(),
            stderr,
        })
    }

    fn fetch_into(&self, spec: &RepoSpec, dir: &Path) -> Result<()> {
        let url = spec.clone_url();
        self.run_git(spec, dir, &["init", "--quiet"])?;
        self.run_git(spec, dir, &["remote", "add", "origin", &url])?;
        self.run_git(
            spec,
            dir,
            &["fetch", "--quiet", "--depth=1", "origin", ref_or_head(spec)],
        )?;
        self.run_git(spec, dir, &["reset", "--quiet", "--hard", "FETCH_HEAD"])?;
        self.run_git(
            spec,
            dir,
            &["submodule", "update", "--init", "--recursive", "--depth=1"],
        )
    }
}

fn ref_or_head(spec: &RepoSpec) -> &str {
    spec.git_ref().unwrap_or("HEAD")
}

impl Cloner for GitExecCloner {
    fn clone_repo(&self, spec: &mut RepoSpec, fs: &dyn FileSystem) -> Result<()> {
        let dir = self.make_clone_dir(spec)?;
        debug!("cloning '{}' into {}", spec.clone_url(), dir.display());

        let confirmed = self
            .fetch_into(spec, &dir)
            .and_then(|()| fs.clean_abs(&dir))
            .and_then(|(confirmed, file)| match file {
                None => Ok(confirmed),
                Some(file) => Err(Error::NotADirectory {
                    path: dir.display().to_string(),
                    file,
                }),
            });
        match confirmed {
            Ok(confirmed) => {
                spec.set_clone_dir(confirmed);
                Ok(())
            }
            Err(e) => {
                // The clone error is what the caller needs.
                if let Err(cleanup_err) = fs.remove_all(&dir) {
                    warn!("failed to remove {}: {}", dir.display(), cleanup_err);
                }
                Err(e)
            }
        }
    }
}

/// Cloner that does no fetching and points every spec at one directory.
#[derive(Debug, Clone)]
pub struct FixedDirCloner {
    dir: PathBuf,
}

impl FixedDirCloner {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

impl Cloner for FixedDirCloner {
    fn clone_repo(&self, spec: &mut RepoSpec, fs: &dyn FileSystem) -> Result<()> {
        let (dir, file) = fs.clean_abs(&self.dir)?;
        if let Some(file) = file {
            return Err(Error::NotADirectory {
                path: self.dir.display().to_string(),
                file,
            });
        }
        spec.set_clone_dir(dir);
        Ok(())
    }
}
