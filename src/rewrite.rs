//! Build-graph dependency rewriting.
//!
//! Replaces every occurrence of one library token with another across the
//! graph's lines, except inside the first rule block matched by the skip
//! pattern. Skipped lines are echoed to the transcript and dropped from the
//! rewritten output; substitutions outside the block are tallied for the
//! end-of-run report.

use crate::graph::{self, RulePattern};
use std::io::{self, Write};

/// Counts accumulated by a single substitution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionTally {
    /// Token occurrences replaced outside the skip block.
    pub occurrences: usize,
    /// Distinct lines changed outside the skip block.
    pub lines_changed: usize,
}

impl SubstitutionTally {
    /// Report whether the pass replaced anything.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.occurrences > 0
    }
}

/// Outcome of a substitution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Lines destined for the output file, skip block excluded.
    pub lines: Vec<String>,
    /// Substitution counts outside the skip block.
    pub tally: SubstitutionTally,
}

/// Replace `old` with `new` across `lines`, honouring the skip block.
///
/// The first line matching `skip` opens the skip window; it and every line
/// up to and including the next blank line are echoed to `transcript` and
/// excluded from the result entirely. Later matches of the pattern are
/// ordinary lines. An empty `old` token matches nothing.
///
/// # Errors
///
/// Returns an error when writing to `transcript` fails.
pub fn scan_and_substitute<W: Write>(
    lines: &[String],
    old: &str,
    new: &str,
    skip: &RulePattern,
    transcript: &mut W,
) -> io::Result<Rewrite> {
    let mut rewritten = Vec::with_capacity(lines.len());
    let mut tally = SubstitutionTally::default();
    let mut in_skip_block = false;
    let mut skip_block_seen = false;

    for line in lines {
        if in_skip_block {
            echo_line(transcript, line)?;
            if graph::is_blank(line) {
                writeln!(transcript, "-- Done skipping application block")?;
                in_skip_block = false;
            }
            continue;
        }
        if !skip_block_seen && skip.is_match(line) {
            echo_line(transcript, line)?;
            in_skip_block = true;
            skip_block_seen = true;
            continue;
        }
        if old.is_empty() {
            rewritten.push(line.clone());
            continue;
        }
        let replaced = line.replace(old, new);
        if replaced == *line {
            rewritten.push(replaced);
        } else {
            tally.occurrences += line.matches(old).count();
            tally.lines_changed += 1;
            rewritten.push(replaced);
        }
    }

    Ok(Rewrite {
        lines: rewritten,
        tally,
    })
}

/// Echo a skipped line to the transcript, terminator included.
fn echo_line<W: Write>(transcript: &mut W, line: &str) -> io::Result<()> {
    transcript.write_all(line.as_bytes())?;
    if !line.ends_with('\n') {
        writeln!(transcript)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result, ensure};
    use rstest::rstest;

    fn lines(raw: &str) -> Vec<String> {
        raw.split_inclusive('\n').map(str::to_owned).collect()
    }

    fn skip_pattern() -> Result<RulePattern> {
        RulePattern::for_object("main.cc").context("compile skip pattern")
    }

    fn run(doc: &[String], old: &str, new: &str) -> Result<(Rewrite, String)> {
        let mut transcript = Vec::new();
        let rewrite = scan_and_substitute(doc, old, new, &skip_pattern()?, &mut transcript)
            .context("substitution pass")?;
        let transcript = String::from_utf8(transcript).context("transcript is UTF-8")?;
        Ok((rewrite, transcript))
    }

    #[test]
    fn replaces_and_tallies_occurrences() -> Result<()> {
        let doc = lines(concat!(
            "build app.elf: LINKER libold.a libold.a\n",
            "build other.elf: LINKER libold.a\n",
            "build clean.elf: LINKER libc.a\n",
        ));
        let (rewrite, _) = run(&doc, "libold.a", "libnew.a")?;
        ensure!(
            rewrite.tally
                == SubstitutionTally {
                    occurrences: 3,
                    lines_changed: 2,
                },
            "unexpected tally {:?}",
            rewrite.tally
        );
        ensure!(
            rewrite.lines
                == vec![
                    "build app.elf: LINKER libnew.a libnew.a\n",
                    "build other.elf: LINKER libnew.a\n",
                    "build clean.elf: LINKER libc.a\n",
                ],
            "unexpected lines {:?}",
            rewrite.lines
        );
        Ok(())
    }

    #[test]
    fn identical_tokens_count_nothing() -> Result<()> {
        let doc = lines("build app.elf: LINKER libold.a\n");
        let (rewrite, _) = run(&doc, "libold.a", "libold.a")?;
        ensure!(!rewrite.tally.changed(), "tally must stay zero");
        ensure!(rewrite.lines == doc, "lines must be untouched");
        Ok(())
    }

    #[test]
    fn empty_old_token_matches_nothing() -> Result<()> {
        let doc = lines("build app.elf: LINKER libold.a\n");
        let (rewrite, _) = run(&doc, "", "libnew.a")?;
        ensure!(!rewrite.tally.changed(), "tally must stay zero");
        ensure!(rewrite.lines == doc, "lines must be untouched");
        Ok(())
    }

    #[test]
    fn skip_block_lines_are_dropped_and_uncounted() -> Result<()> {
        let doc = lines(concat!(
            "build app.elf: LINKER libold.a\n",
            "build CMakeFiles/app.dir/main.cc.obj: CXX_COMPILER libold.a\n",
            "  FLAGS = -Os libold.a\n",
            "\n",
            "build other.elf: LINKER libold.a\n",
        ));
        let (rewrite, transcript) = run(&doc, "libold.a", "libnew.a")?;
        ensure!(
            rewrite.tally
                == SubstitutionTally {
                    occurrences: 2,
                    lines_changed: 2,
                },
            "skip-block occurrences must not count, got {:?}",
            rewrite.tally
        );
        ensure!(
            rewrite.lines
                == vec![
                    "build app.elf: LINKER libnew.a\n",
                    "build other.elf: LINKER libnew.a\n",
                ],
            "skip-block lines must be excluded, got {:?}",
            rewrite.lines
        );
        ensure!(
            transcript.contains("build CMakeFiles/app.dir/main.cc.obj"),
            "skipped rule line must be echoed"
        );
        ensure!(
            transcript.contains("-- Done skipping application block"),
            "transcript must note the end of the block"
        );
        Ok(())
    }

    #[test]
    fn later_pattern_matches_are_ordinary_lines() -> Result<()> {
        let doc = lines(concat!(
            "build CMakeFiles/a.dir/main.cc.obj: CXX_COMPILER libold.a\n",
            "\n",
            "build CMakeFiles/b.dir/main.cc.obj: CXX_COMPILER libold.a\n",
        ));
        let (rewrite, _) = run(&doc, "libold.a", "libnew.a")?;
        ensure!(
            rewrite.lines == vec!["build CMakeFiles/b.dir/main.cc.obj: CXX_COMPILER libnew.a\n"],
            "only the first block is skipped, got {:?}",
            rewrite.lines
        );
        ensure!(
            rewrite.tally
                == SubstitutionTally {
                    occurrences: 1,
                    lines_changed: 1,
                },
            "unexpected tally {:?}",
            rewrite.tally
        );
        Ok(())
    }

    #[test]
    fn skip_block_may_run_to_end_of_document() -> Result<()> {
        let doc = lines(concat!(
            "build app.elf: LINKER libold.a\n",
            "build CMakeFiles/app.dir/main.cc.obj: CXX_COMPILER\n",
            "  FLAGS = -Os",
        ));
        let (rewrite, transcript) = run(&doc, "libold.a", "libnew.a")?;
        ensure!(
            rewrite.lines == vec!["build app.elf: LINKER libnew.a\n"],
            "trailing block lines must be excluded, got {:?}",
            rewrite.lines
        );
        ensure!(
            transcript.contains("  FLAGS = -Os"),
            "trailing block lines must still be echoed"
        );
        Ok(())
    }

    #[rstest]
    #[case("\n")]
    #[case("\r\n")]
    fn skip_block_consumes_its_terminating_blank_line(#[case] blank: &str) -> Result<()> {
        let doc: Vec<String> = vec![
            "build CMakeFiles/app.dir/main.cc.obj: CXX_COMPILER\n".to_owned(),
            blank.to_owned(),
            "build app.elf: LINKER\n".to_owned(),
        ];
        let (rewrite, _) = run(&doc, "libold.a", "libnew.a")?;
        ensure!(
            rewrite.lines == vec!["build app.elf: LINKER\n"],
            "the blank line belongs to the skipped block, got {:?}",
            rewrite.lines
        );
        Ok(())
    }
}
