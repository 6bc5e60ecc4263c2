//! Error types for the runner module.

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The Ninja build directory does not exist.
    #[error("build directory not found: {path}")]
    #[diagnostic(
        code(zbuild::runner::build_dir_not_found),
        help("run `zbuild configure` to generate the build directory first")
    )]
    BuildDirNotFound {
        /// The directory that was attempted.
        path: Utf8PathBuf,
    },
}
