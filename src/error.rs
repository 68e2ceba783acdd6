//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `hg-subtree` application. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors that can
//!   occur within the application. Each variant corresponds to a specific
//!   type of error and includes contextual information to aid in debugging.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the application to simplify function signatures.
//!
//! The taxonomy mirrors the failure modes of a sync run:
//!
//! - A dirty working copy before any mutation (`Precondition`).
//! - Malformed configuration or destination rule syntax (`Config`).
//! - A requested subtree name missing from the configuration (`NotFound`).
//! - Illegal flag combinations such as a source override in batch mode
//!   (`InvalidArgument`).
//! - A failing VCS primitive: pull, checkout, commit, merge, bookmark or
//!   strip (`Vcs`).
//! - Wrapped I/O, YAML and glob errors.
//!
//! A failed history prune after a successful collapse commit is *not* an
//! error: the graft is already durable history at that point, so the
//! failure travels as a warning on the sync outcome instead of aborting
//! the run.

use thiserror::Error;

/// Main error type for hg-subtree operations
#[derive(Error, Debug)]
pub enum Error {
    /// The working copy was not clean when a sync run started.
    ///
    /// A sync rewrites the working copy wholesale, so this aborts the whole
    /// invocation before any mutation.
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    /// An error occurred while parsing the configuration file or a
    /// destination rule block.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A subtree name was requested that the configuration does not define.
    #[error("Cannot find {name} in {config}")]
    NotFound { name: String, config: String },

    /// An illegal combination of command-line arguments.
    #[error("Invalid arguments: {message}")]
    InvalidArgument { message: String },

    /// A VCS primitive failed.
    ///
    /// Includes the command that was run and whatever the VCS printed to
    /// stderr. A merge conflict surfaces here: the working copy is left
    /// mid-merge for manual resolution.
    #[error("VCS operation failed: {command} - {message}{}", if stderr.is_empty() { String::new() } else { format!("\n  stderr: {}", stderr.trim_end()) })]
    Vcs {
        command: String,
        message: String,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
