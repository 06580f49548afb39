//! ICL process supervisor: spawns and terminates the vendor ICL executable.
//!
//! Only meaningful on Windows, where the ICL ships as a standalone `.exe`;
//! on every other platform the supervisor is inert and the library assumes
//! the ICL (or a fake server, in tests) is already reachable. The
//! spawn-retry loop is grounded on the teacher pack's `spawn_with_retry`
//! (`atomize-hq-codex-wrapper`'s process launcher), applied here to the
//! ICL's own transient "file busy" failures rather than a subprocess tool.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

#[cfg(windows)]
const ICL_PATH: &str = r"C:\Program Files\HORIBA Scientific\SDK\icl.exe";
#[cfg(windows)]
const ICL_PROCESS_NAME: &str = "icl.exe";

const MAX_SPAWN_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(2);
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// Manages the lifecycle of the ICL child process.
pub struct Supervisor {
    #[cfg(windows)]
    child: std::sync::Mutex<Option<tokio::process::Child>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Supervisor {
            #[cfg(windows)]
            child: std::sync::Mutex::new(None),
        }
    }

    /// Starts the ICL if it is not already running. Idempotent: a process
    /// already visible by name is left alone.
    #[cfg(windows)]
    pub async fn start(&self) -> Result<()> {
        if Self::is_running().await {
            debug!("ICL already running, not spawning a new instance");
            return Ok(());
        }

        let child = spawn_with_retry(ICL_PATH).await?;
        *self.child.lock().unwrap() = Some(child);
        info!(path = ICL_PATH, "spawned ICL process");
        Ok(())
    }

    #[cfg(not(windows))]
    pub async fn start(&self) -> Result<()> {
        debug!("ICL supervisor is inert on this platform; assuming an external ICL is reachable");
        Ok(())
    }

    /// Stops the ICL. Callers should issue `icl_shutdown` over the transport
    /// before calling this, so the ICL gets a chance to flush settings.
    #[cfg(windows)]
    pub async fn stop(&self) -> Result<()> {
        let child = self.child.lock().unwrap().take();
        let Some(mut child) = child else {
            return Ok(());
        };

        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(Ok(_)) => {
                info!("ICL process exited gracefully");
                return Ok(());
            }
            Ok(Err(e)) => warn!(error = %e, "error waiting on ICL process"),
            Err(_) => warn!("ICL did not exit within the grace period, terminating"),
        }

        if child.kill().await.is_err() || Self::is_running().await {
            return Err(Error::ShutdownFailed);
        }
        Ok(())
    }

    #[cfg(not(windows))]
    pub async fn stop(&self) -> Result<()> {
        Ok(())
    }

    #[cfg(windows)]
    async fn is_running() -> bool {
        let mut system = sysinfo::System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        system
            .processes()
            .values()
            .any(|process| process.name().to_string_lossy().eq_ignore_ascii_case(ICL_PROCESS_NAME))
    }
}

#[cfg(windows)]
async fn spawn_with_retry(path: &str) -> Result<tokio::process::Child> {
    let mut backoff = INITIAL_BACKOFF;
    for attempt in 0..MAX_SPAWN_ATTEMPTS {
        match tokio::process::Command::new(path).spawn() {
            Ok(child) => return Ok(child),
            Err(source) => {
                let transient = matches!(source.kind(), std::io::ErrorKind::ExecutableFileBusy)
                    || source.raw_os_error() == Some(32);
                if transient && attempt + 1 < MAX_SPAWN_ATTEMPTS {
                    warn!(attempt, error = %source, "ICL spawn busy, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
                    continue;
                }
                return Err(Error::SpawnFailed(source));
            }
        }
    }
    unreachable!("spawn_with_retry should return before exhausting MAX_SPAWN_ATTEMPTS")
}
