//! # Load Command Implementation
//!
//! This module implements the `load` subcommand, which reads one file
//! through an origin loader and writes its bytes to stdout unchanged. The
//! restriction policy applies exactly as it does for an overlay reading a
//! patch or resource.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use overlay_loader::filesystem::DiskFs;
use overlay_loader::git::GitExecCloner;

use super::LoaderArgs;

/// Read one file through an overlay's loader
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// File to read, relative to `--root` unless absolute.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub loader: LoaderArgs,
}

/// Execute the `load` command.
pub fn execute(args: LoadArgs) -> Result<()> {
    let bytes = read(&args)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.flush()?;
    Ok(())
}

fn read(args: &LoadArgs) -> Result<Vec<u8>> {
    let fs = DiskFs::new();
    let cloner = GitExecCloner::new();
    let validator = args.loader.validator()?;
    let loader = args.loader.origin(validator.as_ref(), &fs, &cloner)?;
    loader
        .load(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))
}
