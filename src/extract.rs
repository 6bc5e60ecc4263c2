//! Flag extraction from a build-graph rule block.
//!
//! Pulls the `DEFINES`, `FLAGS`, and `INCLUDES` attribute lines out of the
//! rule block for the designated entry-point object and normalises their
//! tokens for rendering as GN configuration blocks.

use crate::graph::{self, DEFINES_MARKER, FLAGS_MARKER, INCLUDES_MARKER, RulePattern};

/// Prefix carried by preprocessor-definition tokens.
const DEFINE_PREFIX: &str = "-D";
/// Prefix carried by include-directory tokens.
const INCLUDE_PREFIX: &str = "-I";
/// Flags remapping build-machine paths; never portable, always dropped.
const MACRO_PREFIX_MAP: &str = "-fmacro-prefix-map";
/// System-include tokens are toolchain-internal and dropped.
const SYSTEM_INCLUDE: &str = "isystem";

/// Compiler settings recovered for the application's entry-point object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppFlags {
    /// Preprocessor definitions with the `-D` prefix stripped.
    pub defines: Vec<String>,
    /// Compiler flags, argument tokens merged into their owning flag.
    pub flags: Vec<String>,
    /// Include directories with the `-I` prefix and trailing `/.` stripped.
    pub includes: Vec<String>,
}

impl AppFlags {
    /// Extract settings from the first rule block matching `pattern`.
    ///
    /// When no line matches, all three lists stay empty and the caller
    /// still renders well-formed (empty) configuration blocks.
    #[must_use]
    pub fn from_graph(lines: &[String], pattern: &RulePattern) -> Self {
        let Some(block) = graph::locate_rule_block(lines, pattern) else {
            return Self::default();
        };
        let mut extracted = Self::default();
        for line in lines.get(block).unwrap_or(&[]) {
            if line.contains(DEFINES_MARKER) {
                extracted.defines = parse_defines(line);
            }
            if line.contains(FLAGS_MARKER) {
                extracted.flags = parse_flags(line);
            }
            if line.contains(INCLUDES_MARKER) {
                extracted.includes = parse_includes(line);
            }
        }
        extracted
    }
}

/// Values on an attribute line: every whitespace-delimited token after the
/// marker name and the `=` sign.
fn attribute_values(line: &str) -> impl Iterator<Item = &str> {
    line.split_whitespace().skip(2)
}

fn parse_defines(line: &str) -> Vec<String> {
    attribute_values(line)
        .map(|token| token.strip_prefix(DEFINE_PREFIX).unwrap_or(token).to_owned())
        .collect()
}

fn parse_flags(line: &str) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    for token in attribute_values(line) {
        if !token.starts_with('-') {
            // A bare token is the argument of the flag before it. With no
            // preceding kept flag it has no owner and is dropped.
            if let Some(owner) = flags.last_mut() {
                owner.push(' ');
                owner.push_str(token);
            }
        } else if !token.contains(MACRO_PREFIX_MAP) {
            flags.push(token.to_owned());
        }
    }
    flags
}

fn parse_includes(line: &str) -> Vec<String> {
    attribute_values(line)
        .filter(|token| token.starts_with('-') && !token.contains(SYSTEM_INCLUDE))
        .map(|token| {
            let dir = token.strip_prefix(INCLUDE_PREFIX).unwrap_or(token);
            dir.strip_suffix("/.").unwrap_or(dir).to_owned()
        })
        .collect()
}
