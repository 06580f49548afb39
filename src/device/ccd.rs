//! CCD device handle: `Closed -> Open -> Configured -> Acquiring ->
//! Configured` (plus `Acquiring -> Aborted -> Configured`), bound to the
//! shared [`Transport`] and error catalogue.

use std::sync::{Arc, Mutex};

use icl_protocol::Command;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::catalogue::ErrorCatalogue;
use crate::command_exec::execute_command;
use crate::device::config::Configuration;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::transport::{Transport, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcdState {
    Closed,
    Open,
    Configured,
    Acquiring,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionFormat {
    Spectra,
    Image,
    Crop,
    FastKinetics,
}

impl AcquisitionFormat {
    fn wire(self) -> &'static str {
        match self {
            AcquisitionFormat::Spectra => "SPECTRA",
            AcquisitionFormat::Image => "IMAGE",
            AcquisitionFormat::Crop => "CROP",
            AcquisitionFormat::FastKinetics => "FAST_KINETICS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XAxisConversion {
    None,
    FromCcdFirmware,
    FromIclSettingsIni,
}

impl XAxisConversion {
    fn wire(self) -> &'static str {
        match self {
            XAxisConversion::None => "NONE",
            XAxisConversion::FromCcdFirmware => "FROM_CCD_FIRMWARE",
            XAxisConversion::FromIclSettingsIni => "FROM_ICL_SETTINGS_INI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    Never,
    FirstOnly,
    BetweenOnly,
    Each,
    Unknown,
}

impl CleanMode {
    fn wire(self) -> &'static str {
        match self {
            CleanMode::Never => "NEVER",
            CleanMode::FirstOnly => "FIRST_ONLY",
            CleanMode::BetweenOnly => "BETWEEN_ONLY",
            CleanMode::Each => "EACH",
            CleanMode::Unknown => "UNKNOWN",
        }
    }
}

/// A single region of interest. Indexed from 1; origin is non-negative,
/// size and binning must be strictly positive.
#[derive(Debug, Clone, Copy)]
pub struct RegionOfInterest {
    pub index: u32,
    pub origin_x: u32,
    pub origin_y: u32,
    pub size_x: u32,
    pub size_y: u32,
    pub bin_x: u32,
    pub bin_y: u32,
}

impl RegionOfInterest {
    pub fn new(
        index: u32,
        origin_x: u32,
        origin_y: u32,
        size_x: u32,
        size_y: u32,
        bin_x: u32,
        bin_y: u32,
    ) -> Result<Self> {
        if index == 0 {
            return Err(Error::Validation("ROI index is 1-based".into()));
        }
        if size_x == 0 || size_y == 0 || bin_x == 0 || bin_y == 0 {
            return Err(Error::Validation(
                "ROI size and binning must be strictly positive".into(),
            ));
        }
        Ok(RegionOfInterest {
            index,
            origin_x,
            origin_y,
            size_x,
            size_y,
            bin_x,
            bin_y,
        })
    }
}

/// A 4-tuple trigger-input or signal-output descriptor. When `enabled` is
/// false, `address`/`event`/`signal_type` are canonically `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSignal {
    pub enabled: bool,
    pub address: i32,
    pub event: i32,
    pub signal_type: i32,
}

impl TriggerSignal {
    pub fn disabled() -> Self {
        TriggerSignal {
            enabled: false,
            address: -1,
            event: -1,
            signal_type: -1,
        }
    }

    pub fn enabled(address: i32, event: i32, signal_type: i32) -> Self {
        TriggerSignal {
            enabled: true,
            address,
            event,
            signal_type,
        }
    }
}

/// One ROI's worth of acquisition data: origin/size/binning, timestamp, and
/// either a spectrum (`xy`) or an image (`x`/`y`).
#[derive(Debug, Clone, Deserialize)]
pub struct RoiData {
    #[serde(rename = "originX")]
    pub origin_x: u32,
    #[serde(rename = "originY")]
    pub origin_y: u32,
    #[serde(rename = "sizeX")]
    pub size_x: u32,
    #[serde(rename = "sizeY")]
    pub size_y: u32,
    #[serde(rename = "binX", default = "one")]
    pub bin_x: u32,
    #[serde(rename = "binY", default = "one")]
    pub bin_y: u32,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(rename = "xyData", default)]
    pub xy_data: Option<Vec<f64>>,
    #[serde(rename = "xData", default)]
    pub x_data: Option<Vec<f64>>,
    #[serde(rename = "yData", default)]
    pub y_data: Option<Vec<f64>>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcquisitionFrame {
    #[serde(default)]
    pub rois: Vec<RoiData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcquisitionData {
    #[serde(rename = "acquisition", default)]
    pub acquisitions: Vec<AcquisitionFrame>,
}

/// A handle to one CCD, bound to the shared transport and error catalogue.
pub struct Ccd {
    index: u32,
    transport: Arc<Transport>,
    catalogue: Arc<ErrorCatalogue>,
    state: Mutex<CcdState>,
    configuration: tokio::sync::Mutex<Option<Configuration>>,
}

impl Ccd {
    pub(crate) fn new(index: u32, transport: Arc<Transport>, catalogue: Arc<ErrorCatalogue>) -> Self {
        Ccd {
            index,
            transport,
            catalogue,
            state: Mutex::new(CcdState::Closed),
            configuration: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> CcdState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: CcdState) {
        *self.state.lock().unwrap() = state;
    }

    async fn exec(&self, command: &str, parameters: Value) -> Result<Value> {
        let cmd = Command::new(command, parameters);
        let response = execute_command(&self.transport, &self.catalogue, cmd, DEFAULT_TIMEOUT).await?;
        Ok(response.results)
    }

    /// Populates the configuration cache if absent. Safe to call more than
    /// once; subsequent calls are no-ops unless `force` is set.
    pub async fn refresh_configuration(&self, force: bool) -> Result<()> {
        let mut cached = self.configuration.lock().await;
        if cached.is_some() && !force {
            return Ok(());
        }
        let results = self.exec("ccd_getConfig", json!({ "index": self.index })).await?;
        let config: Configuration = serde_json::from_value(results)?;
        *cached = Some(config);
        Ok(())
    }

    pub async fn configuration(&self) -> Option<Configuration> {
        self.configuration.lock().await.clone()
    }

    // -- Common device contract --------------------------------------

    pub async fn is_busy(&self) -> Result<bool> {
        let results = self.exec("ccd_getAcquisitionBusy", json!({ "index": self.index })).await?;
        Ok(results.get("isBusy").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn get_acquisition_busy(&self) -> Result<bool> {
        self.is_busy().await
    }

    pub async fn get_acquisition_ready(&self) -> Result<bool> {
        let results = self.exec("ccd_getAcquisitionReady", json!({ "index": self.index })).await?;
        Ok(results.get("ready").and_then(Value::as_bool).unwrap_or(false))
    }

    // -- Thermal / geometry -------------------------------------------

    pub async fn get_temperature(&self) -> Result<f64> {
        let results = self.exec("ccd_getChipTemperature", json!({ "index": self.index })).await?;
        results
            .get("temperature")
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::Validation("missing temperature in response".into()))
    }

    pub async fn get_chip_size(&self) -> Result<(u32, u32)> {
        let results = self.exec("ccd_getChipSize", json!({ "index": self.index })).await?;
        let width = results.get("x").and_then(Value::as_u64).unwrap_or(0) as u32;
        let height = results.get("y").and_then(Value::as_u64).unwrap_or(0) as u32;
        Ok((width, height))
    }

    // -- Gain / speed ---------------------------------------------------

    pub async fn set_gain(&self, token: i32) -> Result<()> {
        if let Some(cfg) = self.configuration().await {
            if !cfg.has_gain_token(token) {
                return Err(Error::UnknownToken {
                    device_index: self.index,
                    token,
                });
            }
        }
        self.exec("ccd_setGain", json!({ "index": self.index, "gain": token })).await?;
        Ok(())
    }

    pub async fn get_gain(&self) -> Result<i32> {
        let results = self.exec("ccd_getGain", json!({ "index": self.index })).await?;
        Ok(results.get("gain").and_then(Value::as_i64).unwrap_or(0) as i32)
    }

    pub async fn set_speed(&self, token: i32) -> Result<()> {
        if let Some(cfg) = self.configuration().await {
            if !cfg.has_speed_token(token) {
                return Err(Error::UnknownToken {
                    device_index: self.index,
                    token,
                });
            }
        }
        self.exec("ccd_setSpeed", json!({ "index": self.index, "speed": token })).await?;
        Ok(())
    }

    pub async fn get_speed(&self) -> Result<i32> {
        let results = self.exec("ccd_getSpeed", json!({ "index": self.index })).await?;
        Ok(results.get("speed").and_then(Value::as_i64).unwrap_or(0) as i32)
    }

    // -- Exposure / timer resolution --------------------------------------

    pub async fn set_exposure_time(&self, value: u32) -> Result<()> {
        self.exec(
            "ccd_setExposureTime",
            json!({ "index": self.index, "time": value }),
        )
        .await?;
        Ok(())
    }

    pub async fn get_exposure_time(&self) -> Result<u32> {
        let results = self.exec("ccd_getExposureTime", json!({ "index": self.index })).await?;
        Ok(results.get("time").and_then(Value::as_u64).unwrap_or(0) as u32)
    }

    pub async fn set_timer_resolution(&self, microseconds: u32) -> Result<()> {
        if microseconds != 1 && microseconds != 1000 {
            return Err(Error::Validation(
                "timer resolution must be 1 or 1000 microseconds".into(),
            ));
        }
        self.exec(
            "ccd_setTimerResolution",
            json!({ "index": self.index, "resolutionSEC": microseconds }),
        )
        .await?;
        Ok(())
    }

    pub async fn get_timer_resolution(&self) -> Result<u32> {
        let results = self
            .exec("ccd_getTimerResolution", json!({ "index": self.index }))
            .await?;
        Ok(results.get("resolutionSEC").and_then(Value::as_u64).unwrap_or(1000) as u32)
    }

    // -- Acquisition format / ROI ------------------------------------------

    pub async fn set_acquisition_format(&self, format: AcquisitionFormat, roi_count: u32) -> Result<()> {
        self.exec(
            "ccd_setAcqFormat",
            json!({ "index": self.index, "numRois": roi_count, "format": format.wire() }),
        )
        .await?;
        self.set_state(CcdState::Configured);
        Ok(())
    }

    pub async fn set_region_of_interest(&self, roi: RegionOfInterest) -> Result<()> {
        self.exec(
            "ccd_setRoi",
            json!({
                "index": self.index,
                "roiIndex": roi.index,
                "xOrigin": roi.origin_x,
                "yOrigin": roi.origin_y,
                "xSize": roi.size_x,
                "ySize": roi.size_y,
                "xBin": roi.bin_x,
                "yBin": roi.bin_y,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_x_axis_conversion(&self, conversion: XAxisConversion) -> Result<()> {
        self.exec(
            "ccd_setXAxisConversionType",
            json!({ "index": self.index, "type": conversion.wire() }),
        )
        .await?;
        Ok(())
    }

    // -- Acquisition / clean counts ----------------------------------------

    pub async fn set_acquisition_count(&self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(Error::Validation("acquisition count must be positive".into()));
        }
        self.exec(
            "ccd_setAcqCount",
            json!({ "index": self.index, "count": count }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_clean_count(&self, count: u32, mode: CleanMode) -> Result<()> {
        self.exec(
            "ccd_setCleanCount",
            json!({ "index": self.index, "count": count, "mode": mode.wire() }),
        )
        .await?;
        Ok(())
    }

    // -- Trigger / signal ---------------------------------------------------

    pub async fn set_trigger_input(&self, trigger: TriggerSignal) -> Result<()> {
        if trigger.enabled {
            if let Some(cfg) = self.configuration().await {
                if !cfg.accepts_trigger(trigger.address, trigger.event, trigger.signal_type) {
                    return Err(Error::UnknownToken {
                        device_index: self.index,
                        token: trigger.address,
                    });
                }
            }
        }
        self.exec(
            "ccd_setTriggerIn",
            json!({
                "index": self.index,
                "enable": trigger.enabled,
                "address": trigger.address,
                "event": trigger.event,
                "signalType": trigger.signal_type,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_signal_output(&self, signal: TriggerSignal) -> Result<()> {
        if signal.enabled {
            if let Some(cfg) = self.configuration().await {
                if !cfg.accepts_signal(signal.address, signal.event, signal.signal_type) {
                    return Err(Error::UnknownToken {
                        device_index: self.index,
                        token: signal.address,
                    });
                }
            }
        }
        self.exec(
            "ccd_setSignalOut",
            json!({
                "index": self.index,
                "enable": signal.enabled,
                "address": signal.address,
                "event": signal.event,
                "signalType": signal.signal_type,
            }),
        )
        .await?;
        Ok(())
    }

    // -- Acquisition lifecycle -----------------------------------------------

    pub async fn set_acquisition_start(&self, open_shutter: bool) -> Result<()> {
        if !self.get_acquisition_ready().await? {
            return Err(Error::InvalidState {
                device_index: self.index,
                reason: "acquisition not ready".into(),
            });
        }
        self.exec(
            "ccd_setAcquisitionStart",
            json!({ "index": self.index, "openShutter": open_shutter }),
        )
        .await?;
        self.set_state(CcdState::Acquiring);
        Ok(())
    }

    pub async fn set_acquisition_abort(&self, reset_port: bool) -> Result<()> {
        if self.state() != CcdState::Acquiring {
            return Ok(());
        }
        self.exec(
            "ccd_setAcquisitionAbort",
            json!({ "index": self.index, "resetPort": reset_port }),
        )
        .await?;
        self.set_state(CcdState::Aborted);
        Ok(())
    }

    pub async fn get_acquisition_data(&self) -> Result<AcquisitionData> {
        let results = self.exec("ccd_getAcquisitionData", json!({ "index": self.index })).await?;
        let data: AcquisitionData = serde_json::from_value(results)?;
        if self.state() == CcdState::Acquiring || self.state() == CcdState::Aborted {
            self.set_state(CcdState::Configured);
        }
        Ok(data)
    }

    pub async fn restart(&self) -> Result<()> {
        self.exec("ccd_restart", json!({ "index": self.index })).await?;
        info!(index = self.index, "ccd restarted");
        Ok(())
    }
}

impl Device for Ccd {
    fn index(&self) -> u32 {
        self.index
    }

    async fn open(&self) -> Result<()> {
        self.exec("ccd_open", json!({ "index": self.index })).await?;
        self.refresh_configuration(false).await.ok();
        self.set_state(CcdState::Open);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.exec("ccd_close", json!({ "index": self.index })).await?;
        self.set_state(CcdState::Closed);
        Ok(())
    }

    async fn is_open(&self) -> Result<bool> {
        let results = self.exec("ccd_isOpen", json!({ "index": self.index })).await?;
        Ok(results.get("open").and_then(Value::as_bool).unwrap_or(false))
    }
}
