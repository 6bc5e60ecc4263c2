//! CLI parsing helpers for clap value parsers.

/// Parse and range-check the `--jobs` value.
pub(super) fn parse_jobs(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("{s} is not a valid number"))?;
    if (1..=super::MAX_JOBS).contains(&value) {
        Ok(value)
    } else {
        Err(format!("jobs must be between 1 and {}", super::MAX_JOBS))
    }
}

/// Reject empty or whitespace-only library tokens.
pub(super) fn parse_token(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err(String::from("library token must not be empty"))
    } else {
        Ok(s.to_owned())
    }
}
