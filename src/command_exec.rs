//! Shared command-dispatch helper used by every device handle and by
//! discovery: send a [`Command`], await its [`Response`], and turn a
//! non-empty `errors` array into a typed failure via the error catalogue.

use std::time::Duration;

use icl_protocol::{Command, Response, Severity};
use tracing::warn;

use crate::catalogue::ErrorCatalogue;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Sends `command`, waits for its response, and fails the call if the
/// highest-severity resolved error is ≥ ERROR. Every error on the response
/// is resolved and logged; only the worst one is consulted for the
/// pass/fail decision, since a response can carry a harmless warning ahead
/// of the fatal error that actually explains the failure.
pub async fn execute_command(
    transport: &Transport,
    catalogue: &ErrorCatalogue,
    command: Command,
    timeout: Duration,
) -> Result<Response> {
    let name = command.command.clone();
    let response = transport.request_with_response(command, timeout).await?;

    if response.errors.is_empty() {
        return Ok(response);
    }

    let mut resolved = Vec::with_capacity(response.errors.len());
    for raw in &response.errors {
        let entry = catalogue.error_from(raw)?;
        warn!(
            command = %name,
            code = entry.code,
            message = %entry.message,
            severity = %entry.severity,
            "ICL error on response"
        );
        resolved.push(entry);
    }

    let primary = resolved
        .into_iter()
        .max_by_key(|e| e.severity)
        .expect("response.errors was checked non-empty above");

    if primary.severity >= Severity::Error {
        Err(Error::Icl {
            command: name,
            code: primary.code,
            message: primary.message,
            severity: primary.severity,
        })
    } else {
        Ok(response)
    }
}
