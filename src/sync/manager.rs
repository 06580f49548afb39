//! Blocking façade over [`crate::manager::DeviceManager`].

use std::sync::Arc;

use crate::catalogue::ErrorCatalogue;
use crate::manager::{DeviceManager, ManagerConfig};
use crate::sync::device::{SyncCcd, SyncMonochromator};
use crate::sync::Runtime;
use crate::error::Result;

/// A blocking handle to the device manager. Every public method runs the
/// corresponding async `DeviceManager` operation on a dedicated background
/// thread and blocks the caller until it completes.
pub struct SyncDeviceManager {
    runtime: Runtime,
    manager: Arc<DeviceManager>,
}

impl SyncDeviceManager {
    pub fn new(config: ManagerConfig, catalogue: ErrorCatalogue) -> Self {
        let runtime = Runtime::spawn();
        let manager = Arc::new(DeviceManager::new(config, catalogue));
        SyncDeviceManager { runtime, manager }
    }

    pub fn start(&self) -> Result<()> {
        let manager = Arc::clone(&self.manager);
        self.runtime.handle().run(move || async move { manager.start().await })
    }

    pub fn stop(&self) -> Result<()> {
        let manager = Arc::clone(&self.manager);
        self.runtime.handle().run(move || async move { manager.stop().await })
    }

    pub fn ccds(&self) -> Vec<SyncCcd> {
        let manager = Arc::clone(&self.manager);
        let handles = self.runtime.handle().run(move || async move { manager.ccds().await });
        handles
            .into_iter()
            .map(|ccd| SyncCcd::new(ccd, self.runtime.handle()))
            .collect()
    }

    pub fn monochromators(&self) -> Vec<SyncMonochromator> {
        let manager = Arc::clone(&self.manager);
        let handles = self
            .runtime
            .handle()
            .run(move || async move { manager.monochromators().await });
        handles
            .into_iter()
            .map(|mono| SyncMonochromator::new(mono, self.runtime.handle()))
            .collect()
    }
}
