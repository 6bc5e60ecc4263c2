//! File helpers for the runner: capability-based writes, stdout output,
//! and the rewriter's backup lifecycle.

use anyhow::{Context, Result as AnyResult, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs as cap_fs};
use std::io::{self, Write};
use tracing::info;

/// Return `true` when `path` is the CLI sentinel indicating "write to stdout".
#[must_use]
pub fn is_stdout_path(path: &Utf8Path) -> bool {
    path.as_str() == "-"
}

/// Write `content` into `dir` at `path`, creating parent directories.
pub(crate) fn write_text_file_in(
    dir: &cap_fs::Dir,
    path: &Utf8Path,
    content: &str,
) -> AnyResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        dir.create_dir_all(parent.as_str())
            .with_context(|| format!("create parent directory {parent}"))?;
    }
    let mut file = dir
        .create(path.as_str())
        .with_context(|| format!("create output file {path}"))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("write output file {path}"))?;
    file.flush()
        .with_context(|| format!("flush output file {path}"))?;
    file.sync_all()
        .with_context(|| format!("sync output file {path}"))?;
    Ok(())
}

fn derive_dir_and_relative(path: &Utf8Path) -> AnyResult<(cap_fs::Dir, Utf8PathBuf)> {
    if path.is_relative() {
        let dir = cap_fs::Dir::open_ambient_dir(".", ambient_authority())
            .context("open current directory")?;
        return Ok((dir, path.to_owned()));
    }

    let mut ancestors = path.ancestors();
    ancestors.next();
    let (base, dir) = ancestors
        .find_map(|candidate| {
            cap_fs::Dir::open_ambient_dir(candidate.as_str(), ambient_authority())
                .ok()
                .map(|handle| (candidate.to_owned(), handle))
        })
        .ok_or_else(|| anyhow!("no existing ancestor directory for {path}"))?;
    let relative = path
        .strip_prefix(&base)
        .with_context(|| format!("derive path of {path} relative to {base}"))?
        .to_owned();
    Ok((dir, relative))
}

/// Write `content` to `path`, creating intermediate directories as needed.
///
/// The write opens the nearest existing ancestor directory and works
/// relative to it, overwriting any existing file. A failure mid-write can
/// leave a truncated file; there is no rollback.
///
/// # Errors
///
/// Returns an error when no ancestor of `path` exists or when creating or
/// writing the file fails.
pub fn write_text_file(path: &Utf8Path, content: &str) -> AnyResult<()> {
    let (dir, relative) = derive_dir_and_relative(path)?;
    write_text_file_in(&dir, &relative, content)?;
    info!("Wrote {path}");
    Ok(())
}

fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

fn write_all_ignoring_broken_pipe(writer: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    match writer.write_all(buf) {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

fn flush_ignoring_broken_pipe(writer: &mut impl Write) -> io::Result<()> {
    match writer.flush() {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Write `content` to stdout, tolerating a closed pipe.
///
/// # Errors
///
/// Returns an error for I/O failures other than a broken pipe.
pub fn write_stdout(content: &str) -> AnyResult<()> {
    let mut stdout = io::stdout().lock();
    write_all_ignoring_broken_pipe(&mut stdout, content.as_bytes())
        .context("write to stdout")?;
    flush_ignoring_broken_pipe(&mut stdout).context("flush stdout")?;
    Ok(())
}

/// The sibling `.bak` path for `path`.
#[must_use]
pub fn backup_path(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}.bak"))
}

/// Copy `path` to its sibling `.bak` file before in-place modification.
///
/// # Errors
///
/// Fails when the copy cannot be made; in-place rewriting must not
/// proceed without the operator's recovery copy.
pub fn create_backup(path: &Utf8Path) -> AnyResult<Utf8PathBuf> {
    let backup = backup_path(path);
    std::fs::copy(path.as_std_path(), backup.as_std_path())
        .with_context(|| format!("create backup {backup}"))?;
    Ok(backup)
}

/// Delete a backup created by [`create_backup`] after a no-op pass.
///
/// # Errors
///
/// Returns an error when the backup file cannot be removed.
pub fn remove_backup(path: &Utf8Path) -> AnyResult<()> {
    std::fs::remove_file(path.as_std_path())
        .with_context(|| format!("remove backup {path}"))?;
    Ok(())
}
