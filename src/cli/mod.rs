//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands: the CMake
//! configuration step, the Ninja build step, and the two build-graph
//! utilities (flag extraction and dependency rewriting).

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

mod parsing;

/// Maximum number of parallel jobs accepted by the CLI.
const MAX_JOBS: usize = 64;

/// Build helpers for a Zephyr firmware application: CMake and Ninja
/// wrappers plus build-graph flag extraction and library rewriting.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if started in this directory.
    ///
    /// Relative input, output, and build-directory paths resolve against it.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<Utf8PathBuf>,

    /// Set the number of parallel build jobs.
    ///
    /// Values must be between 1 and 64.
    #[arg(short, long, value_name = "N", value_parser = parsing::parse_jobs)]
    pub jobs: Option<usize>,

    /// Enable verbose diagnostic logging; also forwarded to Ninja as `-v`.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `build` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::default_build());
        }
        self
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            directory: None,
            jobs: None,
            verbose: false,
            command: None,
        }
        .with_default_command()
    }
}

/// Available top-level commands for zbuild.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Configure the CMake build directory for the firmware application.
    Configure(ConfigureArgs),

    /// Invoke Ninja on the configured build directory.
    Build(BuildArgs),

    /// Extract the application's compiler flags into a GN config file.
    ExtractFlags(ExtractArgs),

    /// Replace a library dependency throughout a build graph.
    ReplaceLib(ReplaceArgs),
}

impl Commands {
    /// The `build` command with its default arguments.
    #[must_use]
    pub fn default_build() -> Self {
        Self::Build(BuildArgs {
            build_dir: default_build_dir(),
            clean: false,
            targets: Vec::new(),
        })
    }
}

/// Arguments accepted by the `configure` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct ConfigureArgs {
    /// Zephyr board identifier passed to CMake.
    #[arg(long, value_name = "BOARD", default_value = "robokit1")]
    pub board: String,

    /// Application source directory.
    #[arg(long, value_name = "DIR", default_value = "app")]
    pub app: Utf8PathBuf,

    /// Directory for CMake to generate the Ninja build into.
    #[arg(long, value_name = "DIR", default_value = "build_cmake")]
    pub build_dir: Utf8PathBuf,

    /// Zephyr module root; repeat the flag for each module.
    ///
    /// Defaults to the Atmel and CMSIS HALs under `modules/hal`.
    #[arg(long = "module", value_name = "PATH")]
    pub modules: Vec<Utf8PathBuf>,

    /// Zephyr installation directory exported as `Zephyr_DIR`.
    ///
    /// Defaults to `zephyr` under the project root.
    #[arg(long, value_name = "DIR")]
    pub zephyr_base: Option<Utf8PathBuf>,
}

/// Arguments accepted by the `build` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct BuildArgs {
    /// Directory containing the generated `build.ninja` file.
    #[arg(long, value_name = "DIR", default_value = "build_cmake")]
    pub build_dir: Utf8PathBuf,

    /// Run the Ninja clean tool before building.
    #[arg(long)]
    pub clean: bool,

    /// A list of specific targets to build.
    pub targets: Vec<String>,
}

/// Arguments accepted by the `extract-flags` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct ExtractArgs {
    /// Path to the input `build.ninja` build graph.
    #[arg(short = 'n', long = "graph", value_name = "FILE")]
    pub graph: Utf8PathBuf,

    /// Source-file stem whose compilation rule carries the flags.
    #[arg(short = 'a', long, value_name = "NAME", default_value = "main")]
    pub app: String,

    /// Explicit rule-identification regex, overriding the stem template.
    #[arg(long, value_name = "REGEX")]
    pub rule_pattern: Option<String>,

    /// Path to write the GN configuration to; use `-` for stdout.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        default_value = "app_flags.gn"
    )]
    pub output: Utf8PathBuf,
}

/// Arguments accepted by the `replace-lib` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct ReplaceArgs {
    /// Path to the input `build.ninja` build graph.
    #[arg(short = 'n', long = "graph", value_name = "FILE")]
    pub graph: Utf8PathBuf,

    /// The exact library token to replace, as it appears in the graph.
    #[arg(
        short = 'l',
        long = "old-lib",
        value_name = "LIB",
        value_parser = parsing::parse_token
    )]
    pub old: String,

    /// The library token to substitute in.
    #[arg(short = 'a', long = "new-lib", value_name = "LIB")]
    pub new: String,

    /// Source-file stem whose compilation block is echoed, not rewritten.
    #[arg(long, value_name = "NAME", default_value = "main.cc")]
    pub skip_source: String,

    /// Explicit skip-pattern regex, overriding the stem template.
    #[arg(long, value_name = "REGEX")]
    pub rule_pattern: Option<String>,

    /// Path to write the modified graph to.
    ///
    /// When omitted the input file is modified in place and a `.bak`
    /// backup is created beside it.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,
}

/// Return the default build directory when none is provided.
fn default_build_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("build_cmake")
}
