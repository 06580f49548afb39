use serde::Deserialize;
use serde_json::{Map, Value};

/// A reply from the ICL, correlated to a [`crate::Command`] by `id`.
///
/// Deserialized from `{"id": N, "command": "<name>", "results": {...},
/// "errors": [...]}`. Both `results` and `errors` default to empty when the
/// ICL omits them.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Response {
    pub id: u64,
    pub command: String,
    #[serde(default = "default_results")]
    pub results: Value,
    #[serde(default)]
    pub errors: Vec<String>,
}

fn default_results() -> Value {
    Value::Object(Map::new())
}

impl Response {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Parse from the raw JSON text of an ICL text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_response() {
        let text = r#"{"id":1,"command":"ccd_open","results":{},"errors":[]}"#;
        let response = Response::from_json(text).unwrap();
        assert_eq!(response.id, 1);
        assert_eq!(response.command, "ccd_open");
        assert!(!response.has_errors());
    }

    #[test]
    fn tolerates_missing_results_and_errors() {
        let text = r#"{"id":7,"command":"icl_shutdown"}"#;
        let response = Response::from_json(text).unwrap();
        assert_eq!(response.id, 7);
        assert!(response.results.is_object());
        assert!(response.errors.is_empty());
    }

    #[test]
    fn parses_error_list() {
        let text = r#"{"id":2,"command":"ccd_open","results":{},"errors":["[E];-1;ICL error: no parser found"]}"#;
        let response = Response::from_json(text).unwrap();
        assert!(response.has_errors());
        assert_eq!(response.errors[0], "[E];-1;ICL error: no parser found");
    }
}
