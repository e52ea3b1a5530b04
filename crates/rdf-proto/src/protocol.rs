use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RdfError, Result};
use crate::frequency::Frequency;
use crate::sync::ChannelState;

pub const MSG_RX_BEGIN: &str = "kRxBegin";
pub const MSG_RX_END: &str = "kRxEnd";
pub const MSG_STATION_STATE_UPDATE: &str = "kStationStateUpdate";
pub const MSG_STATION_STATES: &str = "kStationStates";
pub const MSG_GET_STATION_STATES: &str = "kGetStationStates";

/// Every backend message: `{"type": "...", "value": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub value: Value,
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self> {
        let env: Envelope = serde_json::from_str(text)?;
        Ok(env)
    }

    /// Decode into a known message.  `Ok(None)` for types we do not handle.
    pub fn decode(&self) -> Result<Option<BackendMessage>> {
        let msg = match self.msg_type.as_str() {
            MSG_RX_BEGIN => BackendMessage::RxBegin(serde_json::from_value(self.value.clone())?),
            MSG_RX_END => BackendMessage::RxEnd(serde_json::from_value(self.value.clone())?),
            MSG_STATION_STATE_UPDATE => BackendMessage::StationStateUpdate(serde_json::from_value(self.value.clone())?),
            MSG_STATION_STATES => BackendMessage::StationStates(serde_json::from_value(self.value.clone())?),
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RxValue {
    pub callsign: String,
}

/// `kStationStateUpdate` value.  Frequency is in Hz.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationStateValue {
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub rx: bool,
    #[serde(default)]
    pub tx: bool,
}

impl StationStateValue {
    /// Callsign, with an empty string treated as absent.
    pub fn callsign(&self) -> Option<&str> {
        self.callsign.as_deref().filter(|cs| !cs.is_empty())
    }

    pub fn channel_state(&self) -> ChannelState {
        let frequency = self.frequency.map(Frequency::from_hz).unwrap_or(Frequency::REDUNDANT);
        ChannelState::new(frequency, self.rx, self.tx)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationStatesValue {
    pub stations: Vec<Envelope>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    RxBegin(RxValue),
    RxEnd(RxValue),
    StationStateUpdate(StationStateValue),
    StationStates(StationStatesValue),
}

/// Messages we send to the backend.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum BackendCommand {
    #[serde(rename = "kGetStationStates")]
    GetStationStates,
}

impl BackendCommand {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(RdfError::from)
    }
}
