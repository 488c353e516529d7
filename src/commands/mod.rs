//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `overlay-loader` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic.
//!
//! Both commands start from an origin loader described by [`LoaderArgs`].

pub mod load;
pub mod tree;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use overlay_loader::defaults::{default_load_restrictor, LOAD_RESTRICTOR_ENV};
use overlay_loader::filesystem::FileSystem;
use overlay_loader::git::Cloner;
use overlay_loader::loader::FileLoader;
use overlay_loader::restrictor::LoadRestrictor;
use overlay_loader::validator::{Dns1123Validator, PermissiveValidator, Validator};

/// Options describing the origin loader of a tree.
#[derive(Args, Debug, Clone)]
pub struct LoaderArgs {
    /// Directory holding the overlay to start from.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Which files `load` may read: `root-only` or `none`.
    ///
    /// Loaders rooted in a remote clone are always `root-only`.
    #[arg(
        long,
        value_name = "POLICY",
        env = LOAD_RESTRICTOR_ENV,
        default_value_t = default_load_restrictor()
    )]
    pub load_restrictor: LoadRestrictor,

    /// Reject namespaces that are not RFC 1123 labels.
    #[arg(long)]
    pub strict: bool,
}

impl LoaderArgs {
    pub fn validator(&self) -> Result<Box<dyn Validator>> {
        if self.strict {
            Ok(Box::new(Dns1123Validator::new()?))
        } else {
            Ok(Box::new(PermissiveValidator))
        }
    }

    /// Build the origin loader at `--root`.
    pub fn origin<'a>(
        &self,
        validator: &'a dyn Validator,
        fs: &'a dyn FileSystem,
        cloner: &'a dyn Cloner,
    ) -> Result<FileLoader<'a>> {
        FileLoader::new(
            self.load_restrictor,
            validator,
            fs,
            cloner,
            &self.root,
        )
        .with_context(|| format!("Failed to open overlay root {}", self.root.display()))
    }
}
