//! # Overlay Loader Library
//!
//! This library provides the loader chain used to resolve layered
//! configuration overlays. An overlay lives in a directory (its _root_),
//! declares other overlays as bases, and reads supplemental files. Bases are
//! local directories or remote Git repositories.
//!
//! ## Quick Example
//!
//! ```
//! use std::path::Path;
//! use overlay_loader::filesystem::MemoryFs;
//! use overlay_loader::git::FixedDirCloner;
//! use overlay_loader::loader::FileLoader;
//! use overlay_loader::restrictor::LoadRestrictor;
//! use overlay_loader::validator::PermissiveValidator;
//!
//! let fs = MemoryFs::new();
//! fs.add_file_string("/app/overlay/patch.yaml", "replicas: 2").unwrap();
//! fs.add_file_string("/app/base/deploy.yaml", "kind: Deployment").unwrap();
//!
//! let cloner = FixedDirCloner::new("/clones");
//! let overlay = FileLoader::new(
//!     LoadRestrictor::RootOnly,
//!     &PermissiveValidator,
//!     &fs,
//!     &cloner,
//!     Path::new("/app/overlay"),
//! )
//! .unwrap();
//!
//! assert_eq!(overlay.load("patch.yaml").unwrap(), b"replicas: 2");
//!
//! let base = overlay.new_child("../base").unwrap();
//! assert_eq!(base.root(), Path::new("/app/base"));
//!
//! // A base may not point back at any root on the chain, or above one.
//! assert!(base.new_child("../overlay").is_err());
//! assert!(base.new_child("..").is_err());
//! ```
//!
//! ## Core Concepts
//!
//! - **Loader chain (`loader`)**: [`loader::FileLoader`] nodes, each linked
//!   to the loader that created it. Creating a child enforces cycle and
//!   containment rules against the whole chain.
//! - **Restrictions (`restrictor`)**: Policies deciding which paths `load`
//!   may read.
//! - **Remote references (`repospec`, `git`)**: Parsing Git references and
//!   cloning them into temporary directories.
//! - **Filesystem (`filesystem`)**: The [`filesystem::FileSystem`] trait
//!   with a disk implementation and an in-memory one for tests.
//! - **Resolution (`overlay`)**: A walk over overlay files that drives the
//!   chain end to end and releases every clone it makes.

pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod loader;
pub mod overlay;
pub mod path;
pub mod repospec;
pub mod restrictor;
pub mod validator;

#[cfg(test)]
mod path_proptest;
