//! Build-graph line scanning.
//!
//! The generated `build.ninja` file is treated as a flat, ordered sequence
//! of text lines; no parse tree is built. This module loads the document
//! with line terminators preserved, compiles the rule-identification
//! matcher, and locates the rule block describing a designated compilation
//! step.

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use regex::Regex;
use std::io;
use std::ops::Range;
use thiserror::Error;

/// Marker introducing the preprocessor-definition attribute line.
pub const DEFINES_MARKER: &str = "DEFINES = ";
/// Marker introducing the compiler-flag attribute line.
pub const FLAGS_MARKER: &str = "FLAGS = ";
/// Marker introducing the include-directory attribute line.
pub const INCLUDES_MARKER: &str = "INCLUDES =";

/// Errors raised while loading or matching a build graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// The input build-graph file does not exist.
    #[error("input build graph not found: {path}")]
    #[diagnostic(
        code(zbuild::graph::missing_input),
        help("pass the path of a generated build.ninja file with --graph")
    )]
    MissingInput {
        /// The path that was attempted.
        path: Utf8PathBuf,
    },

    /// The input build-graph file could not be read.
    #[error("failed to read build graph {path}")]
    #[diagnostic(code(zbuild::graph::read))]
    Read {
        /// The path that was being read.
        path: Utf8PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A rule-identification pattern failed to compile.
    #[error("invalid rule pattern {pattern:?}")]
    #[diagnostic(code(zbuild::graph::invalid_pattern))]
    InvalidPattern {
        /// The rejected pattern text.
        pattern: String,
        /// The regex compilation failure.
        #[source]
        source: regex::Error,
    },
}

/// Matcher identifying the first line of a rule block.
///
/// Supplied by the caller rather than baked into the scan, so both the flag
/// extractor and the dependency rewriter can target arbitrary compilation
/// rules.
#[derive(Debug, Clone)]
pub struct RulePattern(Regex);

impl RulePattern {
    /// Compile an explicit regular expression supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidPattern`] when `pattern` is not a valid
    /// regular expression.
    pub fn new(pattern: &str) -> Result<Self, GraphError> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|source| GraphError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })
    }

    /// Build the matcher for the compilation rule of `stem`'s object file.
    ///
    /// The stem is escaped, so `main.cc` matches literally inside a rule
    /// line such as `build CMakeFiles/app.dir/main.cc.obj: CXX_COMPILER`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidPattern`] when the composed expression
    /// fails to compile.
    pub fn for_object(stem: &str) -> Result<Self, GraphError> {
        Self::new(&format!(
            r"build\s.*CMakeFiles.*{}.*\.obj",
            regex::escape(stem)
        ))
    }

    /// Report whether `line` opens a matching rule block.
    #[must_use]
    pub fn is_match(&self, line: &str) -> bool {
        self.0.is_match(line)
    }
}

/// Read the build graph at `path` as lines with terminators preserved.
///
/// Terminators stay attached (`split_inclusive`) so untouched lines
/// round-trip byte-identically when the document is written back out.
///
/// # Errors
///
/// Returns [`GraphError::MissingInput`] when the file does not exist, so
/// callers abort before creating any output, and [`GraphError::Read`] when
/// reading fails.
pub fn load(path: &Utf8Path) -> Result<Vec<String>, GraphError> {
    if !path.as_std_path().exists() {
        return Err(GraphError::MissingInput {
            path: path.to_owned(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| GraphError::Read {
        path: path.to_owned(),
        source,
    })?;
    Ok(contents.split_inclusive('\n').map(str::to_owned).collect())
}

/// Report whether a line carries nothing but its terminator.
#[must_use]
pub fn is_blank(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '\r' | '\n'))
}

/// Locate the first rule block matched by `pattern`.
///
/// The block starts at the first matching line and ends before the next
/// blank line, or at the end of the document when none follows. Only the
/// first match is honoured; later occurrences of the pattern are not
/// reprocessed. Returns `None` when no line matches, which callers treat as
/// an empty extraction rather than an error.
#[must_use]
pub fn locate_rule_block(lines: &[String], pattern: &RulePattern) -> Option<Range<usize>> {
    let start = lines.iter().position(|line| pattern.is_match(line))?;
    let end = lines
        .iter()
        .enumerate()
        .skip(start)
        .find_map(|(index, line)| is_blank(line).then_some(index))
        .unwrap_or(lines.len());
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result, ensure};
    use rstest::rstest;

    fn lines(raw: &str) -> Vec<String> {
        raw.split_inclusive('\n').map(str::to_owned).collect()
    }

    #[rstest]
    #[case("main", "build CMakeFiles/app.dir/main.cc.obj: CXX_COMPILER", true)]
    #[case("main.cc", "build CMakeFiles/app.dir/main.cc.obj: CXX_COMPILER", true)]
    #[case("main.cc", "build CMakeFiles/app.dir/main_shim.c.obj: C_COMPILER", false)]
    #[case("main", "build zephyr/kernel.a: AR", false)]
    fn for_object_targets_the_compilation_rule(
        #[case] stem: &str,
        #[case] line: &str,
        #[case] expected: bool,
    ) -> Result<()> {
        let pattern = RulePattern::for_object(stem).context("compile pattern")?;
        ensure!(
            pattern.is_match(line) == expected,
            "unexpected match result for stem {stem} against {line}"
        );
        Ok(())
    }

    #[test]
    fn for_object_escapes_the_stem() -> Result<()> {
        let pattern = RulePattern::for_object("main.cc").context("compile pattern")?;
        ensure!(
            !pattern.is_match("build CMakeFiles/app.dir/mainXcc.obj:"),
            "dot in the stem must not match arbitrary characters"
        );
        Ok(())
    }

    #[test]
    fn new_rejects_invalid_expressions() {
        let result = RulePattern::new("build [unclosed");
        assert!(matches!(result, Err(GraphError::InvalidPattern { .. })));
    }

    #[test]
    fn locate_rule_block_ends_at_blank_line() -> Result<()> {
        let doc = lines(concat!(
            "rule CXX_COMPILER\n",
            "  command = g++\n",
            "\n",
            "build CMakeFiles/app.dir/main.cc.obj: CXX_COMPILER main.cc\n",
            "  DEFINES = -DFOO\n",
            "  FLAGS = -Os\n",
            "\n",
            "build app.elf: LINKER\n",
        ));
        let pattern = RulePattern::for_object("main").context("compile pattern")?;
        let block = locate_rule_block(&doc, &pattern).context("expected a block")?;
        ensure!(block == (3..6), "unexpected block range {block:?}");
        Ok(())
    }

    #[test]
    fn locate_rule_block_runs_to_end_of_document() -> Result<()> {
        let doc = lines(concat!(
            "build CMakeFiles/app.dir/main.cc.obj: CXX_COMPILER\n",
            "  FLAGS = -Os\n",
            "  INCLUDES = -Iinclude",
        ));
        let pattern = RulePattern::for_object("main").context("compile pattern")?;
        let block = locate_rule_block(&doc, &pattern).context("expected a block")?;
        ensure!(block == (0..3), "unexpected block range {block:?}");
        Ok(())
    }

    #[test]
    fn locate_rule_block_honours_only_the_first_match() -> Result<()> {
        let doc = lines(concat!(
            "build CMakeFiles/a.dir/main.cc.obj: CXX_COMPILER\n",
            "  DEFINES = -DFIRST\n",
            "\n",
            "build CMakeFiles/b.dir/main.cc.obj: CXX_COMPILER\n",
            "  DEFINES = -DSECOND\n",
            "\n",
        ));
        let pattern = RulePattern::for_object("main").context("compile pattern")?;
        let block = locate_rule_block(&doc, &pattern).context("expected a block")?;
        ensure!(block == (0..2), "scan must stop at the first block");
        Ok(())
    }

    #[test]
    fn locate_rule_block_returns_none_without_a_match() -> Result<()> {
        let doc = lines("build zephyr/kernel.a: AR\n\n");
        let pattern = RulePattern::for_object("main").context("compile pattern")?;
        ensure!(
            locate_rule_block(&doc, &pattern).is_none(),
            "no block expected"
        );
        Ok(())
    }

    #[rstest]
    #[case("\n", true)]
    #[case("\r\n", true)]
    #[case("  \n", false)]
    #[case("build app: phony\n", false)]
    fn is_blank_matches_terminator_only_lines(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_blank(line), expected, "unexpected result for {line:?}");
    }

    #[test]
    fn load_reports_missing_input() {
        let result = load(Utf8Path::new("does/not/exist/build.ninja"));
        assert!(matches!(result, Err(GraphError::MissingInput { .. })));
    }

    #[test]
    fn load_preserves_line_terminators() -> Result<()> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let path = temp.path().join("build.ninja");
        std::fs::write(&path, "build a: phony\r\n\nno newline")
            .context("write graph fixture")?;
        let utf8 = Utf8PathBuf::from_path_buf(path).map_err(|p| {
            anyhow::anyhow!("temp path {} is not valid UTF-8", p.display())
        })?;
        let loaded = load(&utf8)?;
        ensure!(
            loaded == vec!["build a: phony\r\n", "\n", "no newline"],
            "unexpected lines {loaded:?}"
        );
        Ok(())
    }
}
