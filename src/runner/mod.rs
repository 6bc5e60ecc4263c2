//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution: configuring CMake, delegating builds to the
//! Ninja subprocess, and running the two build-graph passes (flag
//! extraction and dependency rewriting).

mod error;

pub use error::RunnerError;

mod path_helpers;
mod process;

pub use process::{
    CMAKE_ENV, CMAKE_PROGRAM, NINJA_ENV, NINJA_PROGRAM, resolve_cmake_program,
    resolve_ninja_program, run_cmake, run_ninja, run_ninja_tool,
};

use crate::cli::{BuildArgs, Cli, Commands, ConfigureArgs, ExtractArgs, ReplaceArgs};
use crate::extract::AppFlags;
use crate::gn_gen;
use crate::graph::{self, GraphError, RulePattern};
use crate::rewrite::{self, Rewrite, SubstitutionTally};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use path_helpers::{project_root, resolve_path};
use process::file_io;
use std::io::{self, Write};
use tracing::{debug, info};

/// Zephyr module roots used when `configure` receives no `--module` flags,
/// relative to the project root.
const DEFAULT_MODULES: [&str; 2] = ["modules/hal/atmel", "modules/hal/cmsis"];

/// Wrapper around generated GN configuration text.
#[derive(Debug, Clone)]
pub struct GnContent(String);
impl GnContent {
    /// Store the provided GN configuration string.
    #[must_use]
    pub const fn new(content: String) -> Self {
        Self(content)
    }
    /// Borrow the underlying configuration text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// Consume the wrapper returning the owned configuration string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Target list passed through to Ninja.
/// An empty slice means "use the defaults" configured by the meta-build
/// step (default targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTargets<'a>(&'a [String]);
impl<'a> BuildTargets<'a> {
    /// Wrap a borrowed list of command-line target names.
    #[must_use]
    pub const fn new(targets: &'a [String]) -> Self {
        Self(targets)
    }
    /// Return the underlying slice of target names.
    #[must_use]
    pub const fn as_slice(&self) -> &'a [String] {
        self.0
    }
    /// Indicate whether no explicit targets were provided.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Execute the parsed [`Cli`] commands.
///
/// # Errors
///
/// Returns an error if a subprocess fails or one of the build-graph passes
/// cannot read or write its files.
pub fn run(cli: &Cli) -> Result<()> {
    let command = cli
        .command
        .clone()
        .unwrap_or_else(Commands::default_build);
    match command {
        Commands::Configure(args) => handle_configure(cli, &args),
        Commands::Build(args) => handle_build(cli, &args),
        Commands::ExtractFlags(args) => handle_extract(cli, &args),
        Commands::ReplaceLib(args) => handle_replace(cli, &args),
    }
}

/// Build the rule matcher from an explicit regex or the stem template.
fn rule_pattern(explicit: Option<&str>, stem: &str) -> Result<RulePattern, GraphError> {
    match explicit {
        Some(expr) => RulePattern::new(expr),
        None => RulePattern::for_object(stem),
    }
}

/// Run the CMake configuration step for the firmware application.
fn handle_configure(cli: &Cli, args: &ConfigureArgs) -> Result<()> {
    let root = project_root(cli);
    let zephyr_dir = args
        .zephyr_base
        .clone()
        .unwrap_or_else(|| root.join("zephyr"));
    let zephyr_modules = module_list(&root, &args.modules);

    let cmake_args = vec![
        format!("-B{}", args.build_dir),
        String::from("-GNinja"),
        format!("-DZEPHYR_MODULES={zephyr_modules}"),
        format!("-DBOARD={}", args.board),
        args.app.to_string(),
    ];
    let program = process::resolve_cmake_program();
    process::run_cmake(program.as_path(), &root, &cmake_args, &zephyr_dir)
        .with_context(|| format!("running {program} in {root}"))?;
    info!("CMake configuration complete in {}", args.build_dir);
    Ok(())
}

/// Join the module roots into the `;`-separated list CMake expects,
/// resolving relative entries against the project root.
fn module_list(root: &Utf8Path, modules: &[Utf8PathBuf]) -> String {
    let resolved: Vec<Utf8PathBuf> = if modules.is_empty() {
        DEFAULT_MODULES.iter().map(|m| root.join(m)).collect()
    } else {
        modules
            .iter()
            .map(|m| {
                if m.is_relative() {
                    root.join(m)
                } else {
                    m.clone()
                }
            })
            .collect()
    };
    let parts: Vec<&str> = resolved.iter().map(|p| p.as_str()).collect();
    parts.join(";")
}

/// Invoke Ninja on the configured build directory, cleaning first when
/// requested.
fn handle_build(cli: &Cli, args: &BuildArgs) -> Result<()> {
    let build_dir = resolve_path(cli, &args.build_dir);
    if !build_dir.as_std_path().is_dir() {
        return Err(RunnerError::BuildDirNotFound {
            path: build_dir.into_owned(),
        }
        .into());
    }
    let program = process::resolve_ninja_program();
    if args.clean {
        process::run_ninja_tool(program.as_path(), cli, build_dir.as_ref(), "clean")
            .with_context(|| {
                format!("running {program} -t clean in {}", build_dir.as_ref())
            })?;
    }
    let targets = BuildTargets::new(&args.targets);
    process::run_ninja(program.as_path(), cli, build_dir.as_ref(), &targets)
        .with_context(|| format!("running {program} in {}", build_dir.as_ref()))?;
    Ok(())
}

/// Extract the application's compiler flags into a GN configuration file.
fn handle_extract(cli: &Cli, args: &ExtractArgs) -> Result<()> {
    let graph_path = resolve_path(cli, &args.graph);
    let pattern = rule_pattern(args.rule_pattern.as_deref(), &args.app)?;
    let lines = graph::load(graph_path.as_ref())?;
    let flags = AppFlags::from_graph(&lines, &pattern);
    debug!(
        defines = flags.defines.len(),
        flags = flags.flags.len(),
        includes = flags.includes.len(),
        "extracted application flags"
    );
    let gn = GnContent::new(gn_gen::generate(&flags));
    if file_io::is_stdout_path(&args.output) {
        file_io::write_stdout(gn.as_str())?;
    } else {
        let output = resolve_path(cli, &args.output);
        file_io::write_text_file(output.as_ref(), gn.as_str())
            .with_context(|| format!("writing GN config to {}", output.as_ref()))?;
    }
    Ok(())
}

/// Rewrite a library dependency across the build graph, in place or to an
/// explicit output path.
fn handle_replace(cli: &Cli, args: &ReplaceArgs) -> Result<()> {
    let graph_path = resolve_path(cli, &args.graph);
    let pattern = rule_pattern(args.rule_pattern.as_deref(), &args.skip_source)?;
    let lines = graph::load(graph_path.as_ref())?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "Processing '{}'...", graph_path.as_ref())?;
    writeln!(
        stdout,
        "Replacing all occurrences of '{}' with '{}'",
        args.old, args.new
    )?;

    // In-place mode backs the original up before any modification; a
    // failure here aborts the whole operation.
    let backup = match &args.output {
        Some(_) => None,
        None => {
            let created = file_io::create_backup(graph_path.as_ref())?;
            writeln!(
                stdout,
                "Backed up original file '{}' to '{created}'",
                graph_path.as_ref()
            )?;
            Some(created)
        }
    };

    let rewrite =
        rewrite::scan_and_substitute(&lines, &args.old, &args.new, &pattern, &mut stdout)
            .context("writing rewrite transcript")?;
    report_tally(&mut stdout, &rewrite.tally, &args.old)?;

    match &args.output {
        Some(path) => {
            let output = resolve_path(cli, path);
            finish_output_path(&mut stdout, &rewrite, output.as_ref())
        }
        None => finish_in_place(&mut stdout, &rewrite, graph_path.as_ref(), backup),
    }
}

/// Report the substitution counts on the transcript.
fn report_tally(out: &mut impl Write, tally: &SubstitutionTally, old: &str) -> io::Result<()> {
    if tally.changed() {
        writeln!(
            out,
            "\nTotal occurrences replaced: {} across {} line(s).",
            tally.occurrences, tally.lines_changed
        )
    } else {
        writeln!(
            out,
            "\nNo occurrences of '{old}' found for replacement in the file."
        )
    }
}

/// Output-path mode always writes, so the destination reflects the pass
/// even when nothing was substituted.
fn finish_output_path(out: &mut impl Write, rewrite: &Rewrite, output: &Utf8Path) -> Result<()> {
    if rewrite.tally.changed() {
        writeln!(out, "Writing modified content to '{output}'...")?;
    } else {
        writeln!(
            out,
            "Output file '{output}' will be identical to input as no replacements occurred."
        )?;
    }
    file_io::write_text_file(output, &rewrite.lines.concat())
        .with_context(|| format!("writing rewritten graph to {output}"))?;
    if rewrite.tally.changed() {
        writeln!(out, "Modification complete.")?;
    }
    Ok(())
}

/// In-place mode rewrites the original only when something was
/// substituted; a no-op pass removes the backup and leaves the file
/// untouched.
fn finish_in_place(
    out: &mut impl Write,
    rewrite: &Rewrite,
    graph_path: &Utf8Path,
    backup: Option<Utf8PathBuf>,
) -> Result<()> {
    if rewrite.tally.changed() {
        writeln!(out, "Writing modified content to '{graph_path}'...")?;
        file_io::write_text_file(graph_path, &rewrite.lines.concat())
            .with_context(|| format!("writing rewritten graph to {graph_path}"))?;
        writeln!(out, "Modification complete.")?;
    } else if let Some(bak) = backup {
        writeln!(out, "No changes made, removing backup file: '{bak}'")?;
        file_io::remove_backup(&bak)?;
    }
    Ok(())
}
