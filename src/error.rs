//! # Error Handling
//!
//! This module defines the centralized error type for `overlay-loader`. It
//! uses the `thiserror` library to build a single `Error` enum whose variants
//! name every way a loader request can be refused or fail.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries the offending path or
//!   repository identity so a caller can print a diagnostic without extra
//!   bookkeeping.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The variants fall into a few groups:
//!
//! - Invalid input (`EmptyPath`, `AbsoluteBase`).
//! - Root admission (`NotADirectory`).
//! - Chain security checks (`ContainmentViolation`, `DirectoryCycle`,
//!   `RepoCycle`).
//! - Restriction policy rejections (`Restricted`, `NotAFile`).
//! - Collaborator failures (`Filesystem`, `Io`, `GitClone`, `GitCommand`),
//!   which are passed through unchanged and never retried.
//! - Support for the overlay resolution engine (`MissingOverlayFile`,
//!   `Validation`, `Yaml`).

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for overlay-loader operations
#[derive(Error, Debug)]
pub enum Error {
    /// A root or base path was the empty string.
    #[error("{what} cannot be empty")]
    EmptyPath { what: &'static str },

    /// A local base was declared with an absolute path.
    ///
    /// Bases must be relative to the referring root so overlays stay
    /// relocatable.
    #[error("new root '{path}' cannot be absolute")]
    AbsoluteBase { path: String },

    /// A root candidate resolved to a file instead of a directory.
    #[error("got file '{file}', but '{path}' must be a directory to be a root")]
    NotADirectory { path: String, file: String },

    /// A base inside a cloned repository, or a remote sub-path, resolved
    /// outside the clone.
    #[error(
        "security; bases in overlays found in cloned repos must be within the repo, \
         but base '{base}' is outside '{clone_dir}'"
    )]
    ContainmentViolation { base: PathBuf, clone_dir: PathBuf },

    /// A candidate base is equal to, or contains, a root already on the chain.
    #[error("cycle detected: candidate root '{candidate}' contains visited root '{visited}'")]
    DirectoryCycle { candidate: PathBuf, visited: PathBuf },

    /// A remote base matches a repository already on the chain.
    #[error("cycle detected: URI '{uri}' referenced by previous URI '{previous}'")]
    RepoCycle { uri: String, previous: String },

    /// The restriction policy refused a path outside the loader root.
    #[error("security; file '{path}' is not in or below '{root}'")]
    Restricted { path: PathBuf, root: PathBuf },

    /// The restriction policy expected a file but found a directory.
    #[error("'{path}' must resolve to a file")]
    NotAFile { path: PathBuf },

    /// A remote descriptor was asked for its local path before being cloned.
    #[error("repository '{uri}' has not been cloned")]
    NotCloned { uri: String },

    /// No overlay file was found under a loader root.
    #[error("no overlay file ({}) found in '{root}'", names.join(", "))]
    MissingOverlayFile { root: PathBuf, names: Vec<String> },

    /// The validator rejected a value declared in an overlay.
    #[error("Validation error: {field} '{value}': {message}")]
    Validation {
        field: String,
        value: String,
        message: String,
    },

    /// An error occurred while cloning a Git repository.
    ///
    /// Includes the clone URL, ref, error message, and an optional hint for
    /// resolution.
    #[error("Git clone error for {url}@{r#ref}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// A filesystem collaborator could not resolve a path.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

impl Error {
    /// True for the errors raised by the chain security checks.
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Error::ContainmentViolation { .. }
                | Error::DirectoryCycle { .. }
                | Error::RepoCycle { .. }
                | Error::Restricted { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
