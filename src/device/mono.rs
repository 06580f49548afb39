//! Monochromator device handle: `Closed -> Open -> Homing -> Idle -> Moving
//! -> Idle`, bound to the shared [`Transport`] and error catalogue.

use std::sync::{Arc, Mutex};

use icl_protocol::Command;
use serde_json::{json, Value};
use tracing::info;

use crate::catalogue::ErrorCatalogue;
use crate::command_exec::execute_command;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::transport::{Transport, DEFAULT_TIMEOUT, LONG_OPERATION_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonoState {
    Closed,
    Open,
    Homing,
    Idle,
    Moving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GratingPosition {
    First,
    Second,
    Third,
}

impl GratingPosition {
    fn wire(self) -> &'static str {
        match self {
            GratingPosition::First => "FIRST",
            GratingPosition::Second => "SECOND",
            GratingPosition::Third => "THIRD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterWheel {
    First,
    Second,
}

impl FilterWheel {
    fn wire(self) -> &'static str {
        match self {
            FilterWheel::First => "FIRST",
            FilterWheel::Second => "SECOND",
        }
    }
}

/// Filter-wheel positions as named in the source (site-specific in
/// practice; kept literal per the open-question decision).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPosition {
    Red,
    Green,
    Blue,
    Yellow,
}

impl FilterPosition {
    fn wire(self) -> &'static str {
        match self {
            FilterPosition::Red => "RED",
            FilterPosition::Green => "GREEN",
            FilterPosition::Blue => "BLUE",
            FilterPosition::Yellow => "YELLOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    Entrance,
    Exit,
}

impl Mirror {
    fn wire(self) -> &'static str {
        match self {
            Mirror::Entrance => "FIRST",
            Mirror::Exit => "SECOND",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorPosition {
    Axial,
    Lateral,
}

impl MirrorPosition {
    fn wire(self) -> &'static str {
        match self {
            MirrorPosition::Axial => "AXIAL",
            MirrorPosition::Lateral => "LATERAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slit {
    A,
    B,
    C,
    D,
}

impl Slit {
    fn wire(self) -> &'static str {
        match self {
            Slit::A => "A",
            Slit::B => "B",
            Slit::C => "C",
            Slit::D => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutter {
    First,
    Second,
}

impl Shutter {
    fn wire(self) -> &'static str {
        match self {
            Shutter::First => "FIRST",
            Shutter::Second => "SECOND",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterPosition {
    Opened,
    Closed,
}

impl ShutterPosition {
    fn wire(self) -> &'static str {
        match self {
            ShutterPosition::Opened => "OPENED",
            ShutterPosition::Closed => "CLOSED",
        }
    }
}

/// A handle to one monochromator, bound to the shared transport and error
/// catalogue.
pub struct Monochromator {
    index: u32,
    transport: Arc<Transport>,
    catalogue: Arc<ErrorCatalogue>,
    state: Mutex<MonoState>,
    homed: Mutex<bool>,
}

impl Monochromator {
    pub(crate) fn new(index: u32, transport: Arc<Transport>, catalogue: Arc<ErrorCatalogue>) -> Self {
        Monochromator {
            index,
            transport,
            catalogue,
            state: Mutex::new(MonoState::Closed),
            homed: Mutex::new(false),
        }
    }

    pub fn state(&self) -> MonoState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: MonoState) {
        *self.state.lock().unwrap() = state;
    }

    async fn exec(&self, command: &str, parameters: Value) -> Result<Value> {
        let cmd = Command::new(command, parameters);
        let response = execute_command(&self.transport, &self.catalogue, cmd, DEFAULT_TIMEOUT).await?;
        Ok(response.results)
    }

    async fn exec_long(&self, command: &str, parameters: Value) -> Result<Value> {
        let cmd = Command::new(command, parameters);
        let response =
            execute_command(&self.transport, &self.catalogue, cmd, LONG_OPERATION_TIMEOUT).await?;
        Ok(response.results)
    }

    /// Polls the ICL for motion status. `Homing`/`Moving` are exited back to
    /// `Idle` here, the first time a poll reports the motion has finished.
    pub async fn is_busy(&self) -> Result<bool> {
        let results = self.exec("mono_isBusy", json!({ "index": self.index })).await?;
        let busy = results.get("busy").and_then(Value::as_bool).unwrap_or(false);
        if !busy {
            let mut state = self.state.lock().unwrap();
            if matches!(*state, MonoState::Homing | MonoState::Moving) {
                *state = MonoState::Idle;
            }
        }
        Ok(busy)
    }

    /// Required before trusting grating/mirror/slit positions. Fire-and-
    /// forget at the wire level; transitions to `Homing` and the caller
    /// polls `is_busy()` for completion.
    pub async fn home(&self) -> Result<()> {
        self.exec_long("mono_init", json!({ "index": self.index })).await?;
        self.set_state(MonoState::Homing);
        *self.homed.lock().unwrap() = true;
        Ok(())
    }

    fn require_homed(&self) -> Result<()> {
        if *self.homed.lock().unwrap() {
            Ok(())
        } else {
            Err(Error::InvalidState {
                device_index: self.index,
                reason: "position reads/writes are unreliable before homing".into(),
            })
        }
    }

    pub async fn get_current_wavelength(&self) -> Result<f64> {
        let results = self.exec("mono_getPosition", json!({ "index": self.index })).await?;
        results
            .get("wavelength")
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::Validation("missing wavelength in response".into()))
    }

    /// Asynchronous at the hardware level: returns once the ICL accepts the
    /// move, not once the physical motion completes. Poll `is_busy()`.
    pub async fn move_to_target_wavelength(&self, nanometers: f64) -> Result<()> {
        self.require_homed()?;
        self.exec_long(
            "mono_setPosition",
            json!({ "index": self.index, "wavelength": nanometers }),
        )
        .await?;
        self.set_state(MonoState::Moving);
        Ok(())
    }

    /// Rewrites the current position's label. May de-calibrate the
    /// instrument if used incorrectly.
    pub async fn calibrate_wavelength(&self, nanometers: f64) -> Result<()> {
        self.exec(
            "mono_calibratePosition",
            json!({ "index": self.index, "wavelength": nanometers }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_grating(&self, position: GratingPosition) -> Result<()> {
        self.require_homed()?;
        self.exec_long(
            "mono_moveGrating",
            json!({ "index": self.index, "position": position.wire() }),
        )
        .await?;
        self.set_state(MonoState::Moving);
        Ok(())
    }

    pub async fn get_grating(&self) -> Result<String> {
        self.require_homed()?;
        let results = self.exec("mono_getGratingPosition", json!({ "index": self.index })).await?;
        Ok(results
            .get("position")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_owned())
    }

    pub async fn set_filter_wheel(&self, wheel: FilterWheel, position: FilterPosition) -> Result<()> {
        self.exec_long(
            "mono_moveFilterWheel",
            json!({ "index": self.index, "wheel": wheel.wire(), "position": position.wire() }),
        )
        .await?;
        self.set_state(MonoState::Moving);
        Ok(())
    }

    pub async fn set_mirror(&self, mirror: Mirror, position: MirrorPosition) -> Result<()> {
        self.exec_long(
            "mono_moveMirror",
            json!({ "index": self.index, "mirror": mirror.wire(), "position": position.wire() }),
        )
        .await?;
        self.set_state(MonoState::Moving);
        Ok(())
    }

    pub async fn set_slit_mm(&self, slit: Slit, millimeters: f64) -> Result<()> {
        self.exec_long(
            "mono_moveSlitMM",
            json!({ "index": self.index, "slit": slit.wire(), "position": millimeters }),
        )
        .await?;
        self.set_state(MonoState::Moving);
        Ok(())
    }

    pub async fn set_slit_step(&self, slit: Slit, step: i32) -> Result<()> {
        self.exec_long(
            "mono_moveSlitStep",
            json!({ "index": self.index, "slit": slit.wire(), "position": step }),
        )
        .await?;
        self.set_state(MonoState::Moving);
        Ok(())
    }

    /// Returns a plain integer step count — the canonical choice recorded
    /// in the open-questions decision, not the enum form seen in some
    /// source revisions.
    pub async fn get_slit_step_position(&self, slit: Slit) -> Result<i32> {
        let results = self
            .exec("mono_getSlitStepPosition", json!({ "index": self.index, "slit": slit.wire() }))
            .await?;
        Ok(results.get("position").and_then(Value::as_i64).unwrap_or(0) as i32)
    }

    pub async fn set_shutter(&self, shutter: Shutter, position: ShutterPosition) -> Result<()> {
        self.exec(
            "mono_shutterOpen",
            json!({ "index": self.index, "shutter": shutter.wire(), "position": position.wire() }),
        )
        .await?;
        Ok(())
    }
}

impl Device for Monochromator {
    fn index(&self) -> u32 {
        self.index
    }

    async fn open(&self) -> Result<()> {
        self.exec("mono_open", json!({ "index": self.index })).await?;
        self.set_state(MonoState::Open);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.exec("mono_close", json!({ "index": self.index })).await?;
        self.set_state(MonoState::Closed);
        info!(index = self.index, "monochromator closed");
        Ok(())
    }

    async fn is_open(&self) -> Result<bool> {
        let results = self.exec("mono_isOpen", json!({ "index": self.index })).await?;
        Ok(results.get("open").and_then(Value::as_bool).unwrap_or(false))
    }
}
