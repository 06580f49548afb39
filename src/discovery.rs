//! Device discovery: `<class>_discover` then `<class>_list`, tolerating the
//! two divergent list-response shapes the ICL is known to produce.

use std::time::Duration;

use icl_protocol::Command;
use serde_json::Value;
use tracing::{debug, info};

use crate::catalogue::ErrorCatalogue;
use crate::command_exec::execute_command;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// One device as reported by `<class>_list`, before a typed handle exists.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub index: u32,
    pub device_type: String,
}

/// Runs `<class>_discover` followed by `<class>_list` and returns the
/// descriptors found. `strict` controls whether a zero count fails the call
/// with [`Error::NoDevicesFound`] or simply yields an empty list.
pub async fn discover(
    transport: &Transport,
    catalogue: &ErrorCatalogue,
    class: &'static str,
    strict: bool,
    timeout: Duration,
) -> Result<Vec<DeviceDescriptor>> {
    let discover_cmd = Command::bare(format!("{class}_discover"));
    let discover_resp = execute_command(transport, catalogue, discover_cmd, timeout).await?;
    let count = discover_resp
        .results
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    if count == 0 {
        if strict {
            return Err(Error::NoDevicesFound(class));
        }
        info!(class, "discovery found no devices");
        return Ok(Vec::new());
    }
    info!(class, count, "discovery found devices");

    let list_cmd = Command::bare(format!("{class}_list"));
    let list_resp = execute_command(transport, catalogue, list_cmd, timeout).await?;
    Ok(parse_device_list(class, &list_resp.results))
}

/// Parses `<class>_list`'s `results`, preferring the canonical
/// list-of-structured-objects shape and falling back to the legacy
/// object-of-semicolon-joined-strings shape.
fn parse_device_list(class: &str, results: &Value) -> Vec<DeviceDescriptor> {
    if let Some(list) = results.as_array() {
        debug!(class, "parsed device list via structured list-of-objects path");
        return list
            .iter()
            .filter_map(|entry| {
                let index = entry.get("index")?.as_u64()? as u32;
                let device_type = entry.get("deviceType")?.as_str()?.to_owned();
                Some(DeviceDescriptor { index, device_type })
            })
            .collect();
    }

    if let Some(list) = results.get("list").and_then(Value::as_array) {
        debug!(class, "parsed device list via nested 'list' array");
        return list
            .iter()
            .filter_map(|entry| {
                let index = entry.get("index")?.as_u64()? as u32;
                let device_type = entry.get("deviceType")?.as_str()?.to_owned();
                Some(DeviceDescriptor { index, device_type })
            })
            .collect();
    }

    if let Some(obj) = results.as_object() {
        debug!(class, "parsed device list via object-of-strings fallback path");
        let mut descriptors: Vec<DeviceDescriptor> = obj
            .iter()
            .filter_map(|(key, value)| {
                let raw = value.as_str()?;
                let index: u32 = key.parse().ok()?;
                let device_type = raw.split(';').next().unwrap_or("unknown").to_owned();
                Some(DeviceDescriptor { index, device_type })
            })
            .collect();
        descriptors.sort_by_key(|d| d.index);
        return descriptors;
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_structured_list() {
        let results = json!([
            {"index": 0, "deviceType": "Synapse"},
            {"index": 1, "deviceType": "iHR320"},
        ]);
        let descriptors = parse_device_list("ccd", &results);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].index, 0);
        assert_eq!(descriptors[0].device_type, "Synapse");
        assert_eq!(descriptors[1].device_type, "iHR320");
    }

    #[test]
    fn falls_back_to_object_of_strings() {
        let results = json!({
            "0": "Synapse;serial123",
            "1": "iHR320;serial456",
        });
        let descriptors = parse_device_list("mono", &results);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].index, 0);
        assert_eq!(descriptors[0].device_type, "Synapse");
        assert_eq!(descriptors[1].index, 1);
    }

    #[test]
    fn neither_shape_yields_empty() {
        let results = json!("unexpected scalar");
        assert!(parse_device_list("ccd", &results).is_empty());
    }
}
