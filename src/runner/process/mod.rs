//! Process helpers for the CMake and Ninja subprocesses.
//! Internal to `runner`; the public API is defined in `runner/mod.rs`.

use super::BuildTargets;
use crate::cli::Cli;
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    env,
    ffi::OsString,
    io::{self, BufReader, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
};
use tracing::info;

pub(super) mod file_io;

/// Default Ninja executable to invoke.
pub const NINJA_PROGRAM: &str = "ninja";
/// Default CMake executable to invoke.
pub const CMAKE_PROGRAM: &str = "cmake";
/// Environment variable overriding the Ninja executable.
pub const NINJA_ENV: &str = "ZBUILD_NINJA";
/// Environment variable overriding the CMake executable.
pub const CMAKE_ENV: &str = "ZBUILD_CMAKE";

fn resolve_program_with<F>(mut read_env: F, key: &str, default: &str) -> Utf8PathBuf
where
    F: FnMut(&str) -> Option<OsString>,
{
    read_env(key)
        .and_then(|value| Utf8PathBuf::from_path_buf(value.into()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from(default))
}

/// Resolve the Ninja executable from the environment override, falling
/// back to `ninja` on the search path.
#[must_use]
pub fn resolve_ninja_program() -> Utf8PathBuf {
    resolve_program_with(|key| env::var_os(key), NINJA_ENV, NINJA_PROGRAM)
}

/// Resolve the CMake executable from the environment override, falling
/// back to `cmake` on the search path.
#[must_use]
pub fn resolve_cmake_program() -> Utf8PathBuf {
    resolve_program_with(|key| env::var_os(key), CMAKE_ENV, CMAKE_PROGRAM)
}

/// Specifies whether Ninja should run a build or invoke a tool subcommand.
enum NinjaCommandType<'a> {
    /// Standard build invocation with optional targets.
    Build(&'a BuildTargets<'a>),
    /// Tool invocation via `ninja -t <tool>`.
    Tool(&'a str),
}

/// Configure the base Ninja command with build directory, job count, and
/// verbosity, and set up piped streams for forwarding.
fn configure_ninja_base(cmd: &mut Command, cli: &Cli, build_dir: &Utf8Path) {
    cmd.arg("-C").arg(build_dir.as_std_path());
    if let Some(jobs) = cli.jobs {
        cmd.arg("-j").arg(jobs.to_string());
    }
    if cli.verbose {
        cmd.arg("-v");
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
}

fn configure_ninja_command(
    cmd: &mut Command,
    cli: &Cli,
    build_dir: &Utf8Path,
    command_type: &NinjaCommandType<'_>,
) {
    configure_ninja_base(cmd, cli, build_dir);
    match command_type {
        NinjaCommandType::Build(targets) => {
            cmd.args(targets.as_slice());
        }
        NinjaCommandType::Tool(tool) => {
            cmd.arg("-t").arg(tool);
        }
    }
}

fn log_command_execution(cmd: &Command) {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let args: Vec<String> = cmd
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    info!("Running command: {} {}", program, args.join(" "));
}

/// Invoke the Ninja executable with the provided CLI settings.
///
/// The function forwards the job count and verbosity to Ninja, points it at
/// the build directory, and streams its standard output and error back to
/// the user.
///
/// # Errors
///
/// Returns an [`io::Error`] if the Ninja process fails to spawn, the
/// standard streams are unavailable, or when Ninja reports a non-zero exit
/// status.
pub fn run_ninja(
    program: &Utf8Path,
    cli: &Cli,
    build_dir: &Utf8Path,
    targets: &BuildTargets<'_>,
) -> io::Result<()> {
    let mut cmd = Command::new(program.as_std_path());
    configure_ninja_command(&mut cmd, cli, build_dir, &NinjaCommandType::Build(targets));
    run_streaming(cmd, NINJA_PROGRAM)
}

/// Invoke a Ninja tool (e.g. `ninja -t clean`) with the provided CLI
/// settings.
///
/// # Errors
///
/// Returns an [`io::Error`] if the Ninja process fails to spawn, the
/// standard streams are unavailable, or when Ninja reports a non-zero exit
/// status.
pub fn run_ninja_tool(
    program: &Utf8Path,
    cli: &Cli,
    build_dir: &Utf8Path,
    tool: &str,
) -> io::Result<()> {
    let mut cmd = Command::new(program.as_std_path());
    configure_ninja_command(&mut cmd, cli, build_dir, &NinjaCommandType::Tool(tool));
    run_streaming(cmd, NINJA_PROGRAM)
}

/// Invoke the CMake executable with the assembled argument list.
///
/// The child runs from the project root so `-B` and the application path
/// resolve the way the operator expects, with `Zephyr_DIR` exported for
/// the Zephyr package lookup.
///
/// # Errors
///
/// Returns an [`io::Error`] if the CMake process fails to spawn, the
/// standard streams are unavailable, or when CMake reports a non-zero exit
/// status.
pub fn run_cmake(
    program: &Utf8Path,
    root: &Utf8Path,
    args: &[String],
    zephyr_dir: &Utf8Path,
) -> io::Result<()> {
    let mut cmd = Command::new(program.as_std_path());
    cmd.args(args);
    cmd.current_dir(root.as_std_path());
    cmd.env("Zephyr_DIR", zephyr_dir.as_std_path());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    run_streaming(cmd, CMAKE_PROGRAM)
}

fn run_streaming(mut cmd: Command, program_label: &'static str) -> io::Result<()> {
    log_command_execution(&cmd);
    let child = cmd.spawn()?;
    let status = stream_child_output(child)?;
    check_exit_status(program_label, status)
}

fn stream_child_output(mut child: Child) -> io::Result<ExitStatus> {
    let Some(stdout) = child.stdout.take() else {
        terminate_child(&mut child, "stdout pipe unavailable");
        return Err(io::Error::other("child process missing stdout pipe"));
    };
    let Some(stderr) = child.stderr.take() else {
        terminate_child(&mut child, "stderr pipe unavailable");
        return Err(io::Error::other("child process missing stderr pipe"));
    };

    let out_handle = thread::spawn(move || {
        let mut lock = io::stdout().lock();
        forward_child_output(BufReader::new(stdout), &mut lock, "stdout")
    });
    let err_handle = thread::spawn(move || {
        let mut lock = io::stderr().lock();
        forward_child_output(BufReader::new(stderr), &mut lock, "stderr")
    });

    let status = child.wait()?;
    join_forwarder(out_handle, "stdout");
    join_forwarder(err_handle, "stderr");
    Ok(status)
}

fn join_forwarder(handle: thread::JoinHandle<bool>, stream_name: &str) {
    match handle.join() {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!("{stream_name} forwarding hit a closed pipe; output truncated");
        }
        Err(err) => {
            tracing::warn!("{stream_name} forwarding thread panicked: {err:?}");
        }
    }
}

fn terminate_child(child: &mut Child, context: &str) {
    if let Err(err) = child.kill() {
        tracing::debug!("failed to kill child after {context}: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::debug!("failed to reap child after {context}: {err}");
    }
}

/// Copy a child stream to the parent, draining the child on write failure
/// so it never blocks on a full pipe. Returns `false` when the parent side
/// closed before the stream was exhausted.
fn forward_child_output<R, W>(mut reader: R, writer: &mut W, stream_name: &'static str) -> bool
where
    R: Read,
    W: Write,
{
    if let Err(err) = io::copy(&mut reader, writer) {
        tracing::debug!(
            "failed to forward child {stream_name}: {err}; discarding remaining bytes"
        );
        if let Err(drain_err) = io::copy(&mut reader, &mut io::sink()) {
            tracing::debug!("failed to drain child {stream_name}: {drain_err}");
        }
        return false;
    }
    true
}

fn check_exit_status(program_label: &str, status: ExitStatus) -> io::Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "{program_label} exited with {status}"
        )))
    }
}
