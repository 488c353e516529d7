//! # Overlay Resolution
//!
//! A minimal caller of the loader chain. Starting from one loader it reads
//! the overlay file under the root, then follows every declared base:
//!
//! - each `bases` entry becomes a child loader through `new_child`;
//! - each `resources` entry becomes a child loader when it names a
//!   directory or remote reference, and is read through `load` otherwise.
//!
//! Only the `bases`, `resources`, `namespace` and `commonLabels` fields are
//! read; the content of resource files is not interpreted. Every child loader is
//! released with `cleanup` before this module returns, on success and on
//! error alike.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use log::{debug, warn};
use serde::Deserialize;

use crate::defaults::OVERLAY_FILE_NAMES;
use crate::error::{Error, Result};
use crate::loader::FileLoader;
use crate::repospec::RepoSpec;

/// The fields of an overlay file this crate cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayFile {
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub common_labels: BTreeMap<String, String>,
}

impl OverlayFile {
    /// Parse overlay YAML. An empty document is an empty overlay.
    pub fn parse(content: &[u8]) -> Result<Self> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let parsed: Option<Self> = serde_yaml::from_slice(content)?;
        Ok(parsed.unwrap_or_default())
    }
}

/// A supplemental file read through `load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    /// The path as declared in the overlay.
    pub path: String,
    pub size: usize,
}

/// One resolved overlay and everything it pulls in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayNode {
    pub root: PathBuf,
    /// Identity of the remote repository this root was cloned from.
    pub remote: Option<String>,
    pub namespace: Option<String>,
    pub common_labels: BTreeMap<String, String>,
    pub files: Vec<LoadedFile>,
    pub bases: Vec<OverlayNode>,
}

impl OverlayNode {
    /// Number of overlays in this tree, including this one.
    pub fn overlay_count(&self) -> usize {
        1 + self.bases.iter().map(OverlayNode::overlay_count).sum::<usize>()
    }
}

/// Read the overlay file under the loader's root.
pub fn read_overlay_file(loader: &FileLoader<'_>) -> Result<OverlayFile> {
    for name in OVERLAY_FILE_NAMES {
        match loader.load(name) {
            Ok(content) => return OverlayFile::parse(&content),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }
    Err(Error::MissingOverlayFile {
        root: loader.root().to_path_buf(),
        names: OVERLAY_FILE_NAMES.iter().map(|n| n.to_string()).collect(),
    })
}

/// Resolve the overlay rooted at `loader` and, recursively, all its bases.
pub fn resolve(loader: &FileLoader<'_>) -> Result<OverlayNode> {
    let overlay = read_overlay_file(loader)?;
    if let Some(namespace) = &overlay.namespace {
        loader.validator().validate_namespace(namespace)?;
    }
    for (key, value) in &overlay.common_labels {
        loader.validator().validate_label(key, value)?;
    }

    let mut node = OverlayNode {
        root: loader.root().to_path_buf(),
        remote: loader.repo_spec().map(RepoSpec::identity),
        namespace: overlay.namespace.clone(),
        common_labels: overlay.common_labels.clone(),
        files: Vec::new(),
        bases: Vec::new(),
    };

    for base in &overlay.bases {
        let child = loader.new_child(base)?;
        node.bases.push(resolve_and_release(child)?);
    }

    for resource in &overlay.resources {
        match loader.new_child(resource) {
            Ok(child) => node.bases.push(resolve_and_release(child)?),
            // A remote reference is never a local file; its error stands.
            Err(e @ Error::NotADirectory { .. }) if RepoSpec::parse(resource).is_some() => {
                return Err(e)
            }
            Err(Error::NotADirectory { .. }) | Err(Error::AbsoluteBase { .. }) => {
                let content = loader.load(resource)?;
                debug!(
                    "loaded '{}' ({} bytes) in {}",
                    resource,
                    content.len(),
                    node.root.display()
                );
                node.files.push(LoadedFile {
                    path: resource.clone(),
                    size: content.len(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(node)
}

fn resolve_and_release(child: FileLoader<'_>) -> Result<OverlayNode> {
    let resolved = resolve(&child);
    let released = child.cleanup();
    match (resolved, released) {
        (Ok(node), Ok(())) => Ok(node),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!("failed to release {}: {}", child.root().display(), cleanup_err);
            Err(e)
        }
    }
}
