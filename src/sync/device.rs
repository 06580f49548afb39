//! Blocking wrappers over [`crate::device::ccd::Ccd`] and
//! [`crate::device::mono::Monochromator`].
//!
//! Only the common device contract plus a representative slice of each
//! class's command vocabulary is duplicated here — the rest are, like their
//! async counterparts, pure syntactic shells over `RuntimeHandle::run` and
//! are not enumerated one by one.

use std::sync::Arc;

use crate::device::ccd::Ccd;
use crate::device::mono::Monochromator;
use crate::device::Device;
use crate::error::Result;
use crate::sync::RuntimeHandle;

pub struct SyncCcd {
    inner: Arc<Ccd>,
    runtime: RuntimeHandle,
}

impl SyncCcd {
    pub(crate) fn new(inner: Arc<Ccd>, runtime: RuntimeHandle) -> Self {
        SyncCcd { inner, runtime }
    }

    pub fn index(&self) -> u32 {
        self.inner.index()
    }

    pub fn open(&self) -> Result<()> {
        use crate::device::Device;
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.open().await })
    }

    pub fn close(&self) -> Result<()> {
        use crate::device::Device;
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.close().await })
    }

    pub fn is_open(&self) -> Result<bool> {
        use crate::device::Device;
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.is_open().await })
    }

    pub fn is_busy(&self) -> Result<bool> {
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.is_busy().await })
    }

    pub fn get_temperature(&self) -> Result<f64> {
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.get_temperature().await })
    }

    pub fn set_exposure_time(&self, value: u32) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.set_exposure_time(value).await })
    }

    pub fn get_exposure_time(&self) -> Result<u32> {
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.get_exposure_time().await })
    }
}

pub struct SyncMonochromator {
    inner: Arc<Monochromator>,
    runtime: RuntimeHandle,
}

impl SyncMonochromator {
    pub(crate) fn new(inner: Arc<Monochromator>, runtime: RuntimeHandle) -> Self {
        SyncMonochromator { inner, runtime }
    }

    pub fn index(&self) -> u32 {
        self.inner.index()
    }

    pub fn open(&self) -> Result<()> {
        use crate::device::Device;
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.open().await })
    }

    pub fn close(&self) -> Result<()> {
        use crate::device::Device;
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.close().await })
    }

    pub fn is_open(&self) -> Result<bool> {
        use crate::device::Device;
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.is_open().await })
    }

    pub fn is_busy(&self) -> Result<bool> {
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.is_busy().await })
    }

    pub fn home(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.home().await })
    }

    pub fn get_current_wavelength(&self) -> Result<f64> {
        let inner = Arc::clone(&self.inner);
        self.runtime.run(move || async move { inner.get_current_wavelength().await })
    }

    pub fn move_to_target_wavelength(&self, nanometers: f64) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.runtime
            .run(move || async move { inner.move_to_target_wavelength(nanometers).await })
    }
}
