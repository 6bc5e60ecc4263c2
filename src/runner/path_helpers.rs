//! Path resolution helpers for the runner module.
//!
//! Centralises the `-C/--directory` handling so the main runner module
//! stays focused on command dispatch.

use crate::cli::Cli;
use camino::{Utf8Path, Utf8PathBuf};
use std::borrow::Cow;

/// Resolve a CLI-supplied path against the `-C/--directory` option.
///
/// The option behaves like a working-directory change for every filesystem
/// path supplied on the command line: a relative `path` is joined onto the
/// configured directory, an absolute one is used as-is.
#[must_use]
pub(super) fn resolve_path<'a>(cli: &Cli, path: &'a Utf8Path) -> Cow<'a, Utf8Path> {
    if path.is_relative() {
        cli.directory
            .as_deref()
            .map_or(Cow::Borrowed(path), |dir| Cow::Owned(dir.join(path)))
    } else {
        Cow::Borrowed(path)
    }
}

/// The project root that relative configure paths hang off.
///
/// This is the `--directory` option when given, otherwise the current
/// directory expressed explicitly as `.` so no ambient state leaks into
/// the assembled command lines.
#[must_use]
pub(super) fn project_root(cli: &Cli) -> Utf8PathBuf {
    cli.directory
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}
