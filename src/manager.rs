//! Device manager: the process-wide composition root for Supervisor +
//! Transport + error catalogue + discovery.

use std::sync::Arc;
use std::time::Duration;

use icl_protocol::Command;
use serde_json::json;
use tracing::{info, warn};

use crate::catalogue::ErrorCatalogue;
use crate::command_exec::execute_command;
use crate::device::ccd::Ccd;
use crate::device::mono::Monochromator;
use crate::discovery::discover;
use crate::error::{Error, Result};
use crate::supervisor::Supervisor;
use crate::transport::{Transport, DEFAULT_TIMEOUT};

/// Constructor parameters for a [`DeviceManager`]. No file or environment
/// parsing lives here — callers build this struct directly; loading it from
/// a config file is an application concern outside this crate.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub websocket_ip: String,
    pub websocket_port: u16,
    pub start_icl: bool,
    pub enable_binary_messages: bool,
    pub request_timeout: Duration,
    pub long_operation_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            websocket_ip: "127.0.0.1".to_owned(),
            websocket_port: 25010,
            start_icl: true,
            enable_binary_messages: true,
            request_timeout: DEFAULT_TIMEOUT,
            long_operation_timeout: crate::transport::LONG_OPERATION_TIMEOUT,
        }
    }
}

impl ManagerConfig {
    pub fn websocket_uri(&self) -> String {
        format!("ws://{}:{}", self.websocket_ip, self.websocket_port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagerState {
    Stopped,
    Started,
}

/// The process-wide singleton composing Supervisor + Transport + error
/// catalogue + discovery into one lifecycle. Not a language-level static —
/// callers construct it once and pass it around; tests construct a fresh
/// one per test.
pub struct DeviceManager {
    config: ManagerConfig,
    transport: Arc<Transport>,
    supervisor: Supervisor,
    catalogue: Arc<ErrorCatalogue>,
    state: tokio::sync::Mutex<ManagerState>,
    ccds: tokio::sync::RwLock<Vec<Arc<Ccd>>>,
    monos: tokio::sync::RwLock<Vec<Arc<Monochromator>>>,
}

impl DeviceManager {
    pub fn new(config: ManagerConfig, catalogue: ErrorCatalogue) -> Self {
        DeviceManager {
            config,
            transport: Arc::new(Transport::new()),
            supervisor: Supervisor::new(),
            catalogue: Arc::new(catalogue),
            state: tokio::sync::Mutex::new(ManagerState::Stopped),
            ccds: tokio::sync::RwLock::new(Vec::new()),
            monos: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    /// `start()`/`stop()` are mutually exclusive: the lock held across the
    /// whole sequence guarantees a concurrent caller sees one complete
    /// before the other begins.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state == ManagerState::Started {
            return Err(Error::AlreadyStarted);
        }

        if self.config.start_icl {
            self.supervisor.start().await?;
        }

        self.transport.open(&self.config.websocket_uri()).await?;
        self.transport.register_binary_callback(|frame| {
            tracing::debug!(
                magic = frame.magic(),
                message_type = frame.message_type(),
                element_count = frame.element_count(),
                "diagnostic binary frame"
            );
        })?;

        let info_cmd = Command::bare("icl_info");
        let info_resp =
            execute_command(&self.transport, &self.catalogue, info_cmd, self.config.request_timeout)
                .await?;
        info!(results = %info_resp.results, "connected to ICL");

        if self.config.enable_binary_messages {
            let bin_mode_cmd = Command::new("icl_binMode", json!({ "mode": "all" }));
            execute_command(&self.transport, &self.catalogue, bin_mode_cmd, self.config.request_timeout)
                .await?;
        }

        self.run_discovery().await?;

        *state = ManagerState::Started;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != ManagerState::Started {
            return Ok(());
        }

        let shutdown_cmd = Command::bare("icl_shutdown");
        match self
            .transport
            .request_with_response(shutdown_cmd, self.config.request_timeout)
            .await
        {
            Ok(_) => {}
            Err(Error::Timeout { .. } | Error::Closed { .. }) => {}
            Err(e) => warn!(error = %e, "unexpected error during icl_shutdown"),
        }

        self.transport.close().await?;
        self.supervisor.stop().await?;

        self.ccds.write().await.clear();
        self.monos.write().await.clear();
        *state = ManagerState::Stopped;
        Ok(())
    }

    /// Re-runs discovery, atomically replacing the handle lists.
    pub async fn run_discovery(&self) -> Result<()> {
        let ccd_descriptors = discover(&self.transport, &self.catalogue, "ccd", false, self.config.request_timeout).await?;
        let mono_descriptors =
            discover(&self.transport, &self.catalogue, "mono", false, self.config.request_timeout).await?;

        let ccds = ccd_descriptors
            .into_iter()
            .map(|d| Arc::new(Ccd::new(d.index, Arc::clone(&self.transport), Arc::clone(&self.catalogue))))
            .collect();
        let monos = mono_descriptors
            .into_iter()
            .map(|d| {
                Arc::new(Monochromator::new(
                    d.index,
                    Arc::clone(&self.transport),
                    Arc::clone(&self.catalogue),
                ))
            })
            .collect();

        *self.ccds.write().await = ccds;
        *self.monos.write().await = monos;
        Ok(())
    }

    pub async fn ccds(&self) -> Vec<Arc<Ccd>> {
        self.ccds.read().await.clone()
    }

    pub async fn monochromators(&self) -> Vec<Arc<Monochromator>> {
        self.monos.read().await.clone()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}
