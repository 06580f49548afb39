use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Process-wide, thread-safe counter backing [`Command::new`]'s `id` field.
///
/// Shared by every `Command` constructed anywhere in the process, mirroring
/// the source's module-level `itertools::count(start=1)` counter: ids are
/// never reused, regardless of how many `Transport`s are open concurrently.
static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// A request sent to the ICL over the JSON control plane.
///
/// Serializes to `{"id": N, "command": "<name>", "parameters": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: u64,
    pub command: String,
    pub parameters: Value,
}

impl Command {
    /// Builds a command with a freshly minted, process-unique, monotonically
    /// increasing id.
    pub fn new(command: impl Into<String>, parameters: Value) -> Self {
        let id = NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed);
        Command {
            id,
            command: command.into(),
            parameters,
        }
    }

    /// Builds a command with no parameters, e.g. `icl_info`.
    pub fn bare(command: impl Into<String>) -> Self {
        Command::new(command, Value::Object(serde_json::Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let a = Command::bare("icl_info");
        let b = Command::bare("icl_info");
        let c = Command::bare("icl_info");
        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn serializes_to_expected_shape() {
        let cmd = Command::new("ccd_open", serde_json::json!({"index": 0}));
        let value: Value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["command"], "ccd_open");
        assert_eq!(value["parameters"]["index"], 0);
        assert!(value["id"].as_u64().unwrap() >= 1);
    }
}
