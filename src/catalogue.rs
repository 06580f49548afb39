//! Error catalogue: translates the ICL's `"[E];<code>;<message>"` wire
//! strings into structured, severity-tagged errors, backed by a JSON
//! database of known codes.

use std::collections::HashMap;

use icl_protocol::{parse_error_string, IclErrorEntry, Severity};

use crate::error::{Error, Result};

/// One catalogued ICL error, independent of any particular wire occurrence.
#[derive(Debug, Clone)]
pub struct CatalogueEntry {
    pub code: i64,
    pub text: String,
    pub severity: Severity,
}

/// A resolved ICL error: the catalogued (or synthesized) entry plus the raw
/// wire string it came from.
#[derive(Debug, Clone)]
pub struct ResolvedError {
    pub code: i64,
    pub message: String,
    pub severity: Severity,
}

/// Maps ICL error codes to `{text, level}`, loaded from the vendor's JSON
/// database (`{"errors": [{"number", "text", "level"}, ...]}`).
#[derive(Debug, Default)]
pub struct ErrorCatalogue {
    by_code: HashMap<i64, CatalogueEntry>,
}

impl ErrorCatalogue {
    /// An empty catalogue: every error resolves to a synthetic CRITICAL
    /// entry carrying its raw text. Useful when no database file is
    /// available (e.g. in tests).
    pub fn empty() -> Self {
        ErrorCatalogue {
            by_code: HashMap::new(),
        }
    }

    /// Parses a pre-loaded JSON database document.
    pub fn from_json(text: &str) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct Database {
            errors: Vec<IclErrorEntry>,
        }
        let db: Database = serde_json::from_str(text)?;
        let by_code = db
            .errors
            .into_iter()
            .map(|entry| {
                let severity = Severity::from_icl_level(&entry.level);
                (
                    entry.number,
                    CatalogueEntry {
                        code: entry.number,
                        text: entry.text,
                        severity,
                    },
                )
            })
            .collect();
        Ok(ErrorCatalogue { by_code })
    }

    /// Loads the database from disk.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::CatalogueLoad {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Resolves a raw ICL error string (`"[E];<code>;<message>"`) into a
    /// structured error. Unknown codes become a synthetic `CRITICAL` error
    /// preserving the raw wire text.
    pub fn error_from(&self, raw: &str) -> Result<ResolvedError> {
        let (code, wire_message) = parse_error_string(raw)?;
        match self.by_code.get(&code) {
            Some(entry) => Ok(ResolvedError {
                code,
                message: entry.text.clone(),
                severity: entry.severity,
            }),
            None => Ok(ResolvedError {
                code,
                message: wire_message,
                severity: Severity::Critical,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_db() -> &'static str {
        r#"{"errors": [
            {"number": -1, "text": "ICL error: no parser found", "level": "fatal"},
            {"number": 42, "text": "device busy", "level": "warning"}
        ]}"#
    }

    #[test]
    fn round_trips_catalogued_errors() {
        let catalogue = ErrorCatalogue::from_json(sample_db()).unwrap();
        let resolved = catalogue
            .error_from("[E];-1;ICL error: no parser found")
            .unwrap();
        assert_eq!(resolved.code, -1);
        assert_eq!(resolved.message, "ICL error: no parser found");
        assert_eq!(resolved.severity, Severity::Critical);

        let resolved = catalogue.error_from("[E];42;device busy").unwrap();
        assert_eq!(resolved.severity, Severity::Info);
    }

    #[test]
    fn unknown_code_is_synthetic_critical() {
        let catalogue = ErrorCatalogue::empty();
        let resolved = catalogue.error_from("[E];999;mystery failure").unwrap();
        assert_eq!(resolved.code, 999);
        assert_eq!(resolved.message, "mystery failure");
        assert_eq!(resolved.severity, Severity::Critical);
    }

    #[test]
    fn malformed_string_is_rejected() {
        let catalogue = ErrorCatalogue::empty();
        assert!(catalogue.error_from("not a valid error string").is_err());
    }
}
