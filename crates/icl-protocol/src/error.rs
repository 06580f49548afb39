use std::fmt;

use serde::Deserialize;

/// Severity levels an ICL error can carry, ordered least to most severe.
///
/// The ordering lets callers compare against a threshold, e.g. "fail the
/// call only at severity >= ERROR".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Maps an ICL catalogue `level` string to a [`Severity`].
    ///
    /// Case-insensitive; `"fatal"` maps to [`Severity::Critical`], anything
    /// else (including severities one might expect to be meaningful, like
    /// `"warning"`) maps to [`Severity::Info`]. This mirrors the source's
    /// two-entry mapping table exactly — it is not a richer classifier.
    pub fn from_icl_level(level: &str) -> Severity {
        if level.eq_ignore_ascii_case("fatal") {
            Severity::Critical
        } else {
            Severity::Info
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// One row of the ICL error-catalogue JSON database: `{"number", "text",
/// "level"}`. The database itself is `{"errors": [IclErrorEntry, ...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct IclErrorEntry {
    pub number: i64,
    pub text: String,
    pub level: String,
}

/// An ICL error string was not formatted as `"[E];<code>;<message>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedErrorString {
    pub raw: String,
    pub part_count: usize,
}

impl fmt::Display for MalformedErrorString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed ICL error string '{}': expected 3 ';'-separated parts, got {}",
            self.raw, self.part_count
        )
    }
}

impl std::error::Error for MalformedErrorString {}

/// Splits a raw ICL error string into its `(code, message)` parts.
///
/// The wire format is `"[E];<code>;<message>"` — exactly three `;`-separated
/// parts. The first part (`"[E]"`) is discarded; the code must parse as an
/// integer (it may be negative).
pub fn parse_error_string(raw: &str) -> Result<(i64, String), MalformedErrorString> {
    let parts: Vec<&str> = raw.split(';').collect();
    if parts.len() != 3 {
        return Err(MalformedErrorString {
            raw: raw.to_owned(),
            part_count: parts.len(),
        });
    }

    let code: i64 = parts[1].trim().parse().map_err(|_| MalformedErrorString {
        raw: raw.to_owned(),
        part_count: parts.len(),
    })?;

    Ok((code, parts[2].to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Error);
        assert!(Severity::Warning < Severity::Critical);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn fatal_maps_to_critical_case_insensitive() {
        assert_eq!(Severity::from_icl_level("fatal"), Severity::Critical);
        assert_eq!(Severity::from_icl_level("FATAL"), Severity::Critical);
        assert_eq!(Severity::from_icl_level("Fatal"), Severity::Critical);
    }

    #[test]
    fn anything_else_maps_to_info() {
        assert_eq!(Severity::from_icl_level("warning"), Severity::Info);
        assert_eq!(Severity::from_icl_level(""), Severity::Info);
        assert_eq!(Severity::from_icl_level("critical"), Severity::Info);
    }

    #[test]
    fn parses_well_formed_error_string() {
        let (code, message) = parse_error_string("[E];-1;ICL error: no parser found").unwrap();
        assert_eq!(code, -1);
        assert_eq!(message, "ICL error: no parser found");
    }

    #[test]
    fn rejects_wrong_part_count() {
        assert!(parse_error_string("[E];-1").is_err());
        assert!(parse_error_string("[E];-1;too;many;parts").is_err());
        assert!(parse_error_string("no semicolons here").is_err());
    }
}
