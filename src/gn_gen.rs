//! GN configuration generator.
//!
//! This module converts an [`crate::extract::AppFlags`] into the
//! `config(...)` block syntax expected by the GN build system. Blocks are
//! emitted in the fixed order includes, defines, flags so the output is
//! deterministic.

use crate::extract::AppFlags;
use std::fmt::{self, Display, Formatter, Write};

/// Generate the GN configuration text for `app`.
///
/// Empty token lists still produce well-formed blocks, so an extraction
/// that found no rule block renders three empty configs rather than an
/// empty file.
///
/// # Panics
///
/// Panics if writing to the output string fails (which is unexpected under
/// normal conditions).
#[must_use]
pub fn generate(app: &AppFlags) -> String {
    let mut out = String::new();
    let blocks = [
        ConfigBlock {
            name: "public_includes",
            field: "include_dirs",
            values: &app.includes,
        },
        ConfigBlock {
            name: "defines",
            field: "defines",
            values: &app.defines,
        },
        ConfigBlock {
            name: "flags",
            field: "cflags_c",
            values: &app.flags,
        },
    ];
    for block in blocks {
        write!(out, "{block}").expect("write GN config block");
    }
    out
}

/// Wrapper struct to display one named, list-valued configuration block.
struct ConfigBlock<'a> {
    name: &'static str,
    field: &'static str,
    values: &'a [String],
}

impl Display for ConfigBlock<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "config(\"{}\") {{", self.name)?;
        writeln!(f, "  {} = [", self.field)?;
        for value in self.values {
            writeln!(f, "    \"{value}\",")?;
        }
        writeln!(f, "  ]")?;
        writeln!(f, "}}")?;
        writeln!(f)
    }
}
