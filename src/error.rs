//! Error taxonomy for the ICL client.
//!
//! One [`Error`] variant per failure kind the transport, supervisor, error
//! catalogue, discovery, and device layers can raise, mirroring the
//! `thiserror`-based `SessionError`/`UplinkError` enums this crate is built
//! from — each variant carries enough context (command name, id, cause) to
//! both log and match on.

use std::time::Duration;

use icl_protocol::Severity;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport already open")]
    AlreadyOpen,

    #[error("transport not open")]
    NotOpen,

    #[error("invalid ICL uri '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("failed to connect to ICL at {uri}: {source}")]
    ConnectFailed {
        uri: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("failed to send command '{command}' (id {id}): {source}")]
    SendFailed {
        id: u64,
        command: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("request '{command}' (id {id}) timed out after {timeout:?}")]
    Timeout {
        id: u64,
        command: String,
        timeout: Duration,
    },

    #[error("request '{command}' (id {id}) was cancelled")]
    Cancelled { id: u64, command: String },

    #[error("binary callback already registered")]
    CallbackAlreadyRegistered,

    #[error("connection closed while awaiting response to '{command}' (id {id})")]
    Closed { id: u64, command: String },

    #[error("received a WebSocket message of an unrecognised class")]
    ProtocolError,

    #[error("ICL reported an error executing '{command}': [{code}] {message} ({severity})")]
    Icl {
        command: String,
        code: i64,
        message: String,
        severity: Severity,
    },

    #[error(transparent)]
    MalformedErrorString(#[from] icl_protocol::MalformedErrorString),

    #[error("no {0} devices found")]
    NoDevicesFound(&'static str),

    #[error("failed to load error catalogue from {path}: {source}")]
    CatalogueLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse error catalogue: {0}")]
    CatalogueParse(#[from] serde_json::Error),

    #[error("token {token} for device {device_index} is not present in the cached configuration")]
    UnknownToken { device_index: u32, token: i32 },

    #[error("failed to spawn ICL process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("ICL process did not terminate after stop()")]
    ShutdownFailed,

    #[error("device manager already started")]
    AlreadyStarted,

    #[error("invalid device state transition on device {device_index}: {reason}")]
    InvalidState { device_index: u32, reason: String },

    #[error("validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
