//! Cached CCD configuration: the static shape of one sensor (dimensions,
//! available gain/speed tokens, trigger/signal descriptors), fetched once on
//! first `open()` and used to validate later `set_trigger_input`/
//! `set_signal_output` calls without a round trip.

use serde::Deserialize;

/// One entry of a trigger-input or signal-output descriptor table.
///
/// `events` and `signal_types` are opaque integer tokens, like `token`
/// itself — the disabled sentinel for all three is `-1` on the wire, which
/// only makes sense if every field in the 4-tuple is integer-typed.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalDescriptor {
    pub token: i32,
    pub events: Vec<i32>,
    pub signal_types: Vec<i32>,
}

/// The CCD's static configuration, as reported by the ICL.
///
/// Tokens (gain, speed, trigger/signal addresses) are opaque integers —
/// this type never interprets their values, only checks membership.
#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    pub chip_width: u32,
    pub chip_height: u32,
    pub gain_tokens: Vec<i32>,
    pub speed_tokens: Vec<i32>,
    pub trigger_inputs: Vec<SignalDescriptor>,
    pub signal_outputs: Vec<SignalDescriptor>,
}

impl Configuration {
    pub fn has_gain_token(&self, token: i32) -> bool {
        self.gain_tokens.contains(&token)
    }

    pub fn has_speed_token(&self, token: i32) -> bool {
        self.speed_tokens.contains(&token)
    }

    /// True if `address` names a configured trigger input and `event`/
    /// `signal_type` are both accepted for it.
    pub fn accepts_trigger(&self, address: i32, event: i32, signal_type: i32) -> bool {
        self.trigger_inputs.iter().any(|d| {
            d.token == address
                && d.events.contains(&event)
                && d.signal_types.contains(&signal_type)
        })
    }

    /// True if `address` names a configured signal output and `event`/
    /// `signal_type` are both accepted for it.
    pub fn accepts_signal(&self, address: i32, event: i32, signal_type: i32) -> bool {
        self.signal_outputs.iter().any(|d| {
            d.token == address
                && d.events.contains(&event)
                && d.signal_types.contains(&signal_type)
        })
    }
}
