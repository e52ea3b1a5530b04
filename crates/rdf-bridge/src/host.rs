/// In-memory stand-in for the radar client: ground-to-air channels, radar
/// targets and controllers that HTTP clients can push and inspect.
use rdf_proto::config::ChannelConfig;
use rdf_proto::frequency::Frequency;
use rdf_proto::host::{ChannelHost, Controller, GroundToAirChannel, RadarTarget, TrafficHost};
use rdf_proto::GeoPosition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// One channel as the host stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    /// MHz
    pub frequency: f64,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub atis: bool,
    #[serde(default)]
    pub rx: bool,
    #[serde(default)]
    pub tx: bool,
}

impl From<&ChannelConfig> for ChannelInfo {
    fn from(c: &ChannelConfig) -> Self {
        Self {
            name: c.name.clone(),
            frequency: c.frequency,
            primary: c.primary,
            atis: c.atis,
            rx: c.rx,
            tx: c.tx,
        }
    }
}

impl ChannelInfo {
    fn key(&self) -> (&str, Frequency) {
        (&self.name, Frequency::from_mhz(self.frequency))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetUpdate {
    pub lat: f64,
    pub lon: f64,
    /// feet
    #[serde(default)]
    pub altitude: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControllerUpdate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Default)]
struct Tables {
    channels: Vec<ChannelInfo>,
    targets: HashMap<String, RadarTarget>,
    controllers: HashMap<String, Controller>,
}

#[derive(Clone, Default)]
pub struct MemoryHost {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryHost {
    pub fn new(channels: &[ChannelConfig]) -> Self {
        let host = Self::default();
        host.replace_channels(channels.iter().map(ChannelInfo::from).collect());
        host
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn channel_list(&self) -> Vec<ChannelInfo> {
        self.read().channels.clone()
    }

    pub fn replace_channels(&self, channels: Vec<ChannelInfo>) {
        debug!("host channels replaced, {} entries", channels.len());
        self.write().channels = channels;
    }

    /// Host-side toggle, as the controller clicking the channel would.
    /// Returns the new channel state, `None` if no such channel exists.
    pub fn set_channel(&self, name: &str, frequency: Frequency, rx: Option<bool>, tx: Option<bool>) -> Option<ChannelInfo> {
        let mut tables = self.write();
        let chnl = tables.channels.iter_mut().find(|c| c.key() == (name, frequency))?;
        if let Some(rx) = rx {
            chnl.rx = rx;
        }
        if let Some(tx) = tx {
            chnl.tx = tx;
        }
        Some(chnl.clone())
    }

    pub fn put_target(&self, callsign: &str, update: TargetUpdate) {
        self.write().targets.insert(
            callsign.to_string(),
            RadarTarget {
                position: GeoPosition::new(update.lat, update.lon),
                pressure_altitude: update.altitude,
            },
        );
    }

    pub fn remove_target(&self, callsign: &str) -> bool {
        self.write().targets.remove(callsign).is_some()
    }

    pub fn put_controller(&self, callsign: &str, update: ControllerUpdate) {
        self.write().controllers.insert(
            callsign.to_string(),
            Controller {
                position: GeoPosition::new(update.lat, update.lon),
            },
        );
    }

    pub fn remove_controller(&self, callsign: &str) -> bool {
        self.write().controllers.remove(callsign).is_some()
    }
}

/// Handle addressing a channel by its unique (name, frequency) pair.  Every
/// accessor looks the channel up again; a channel that has gone away reads as
/// all-off and ignores toggles.
pub struct MemoryChannel {
    host: MemoryHost,
    name: String,
    frequency: Frequency,
    mhz: f64,
}

impl MemoryChannel {
    fn with<R>(&self, default: R, f: impl FnOnce(&ChannelInfo) -> R) -> R {
        let tables = self.host.read();
        tables
            .channels
            .iter()
            .find(|c| c.key() == (self.name.as_str(), self.frequency))
            .map(f)
            .unwrap_or(default)
    }

    fn with_mut(&self, f: impl FnOnce(&mut ChannelInfo)) {
        let mut tables = self.host.write();
        if let Some(chnl) = tables
            .channels
            .iter_mut()
            .find(|c| c.key() == (self.name.as_str(), self.frequency))
        {
            f(chnl);
        }
    }
}

impl GroundToAirChannel for MemoryChannel {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn frequency_mhz(&self) -> f64 {
        self.mhz
    }

    fn is_primary(&self) -> bool {
        self.with(false, |c| c.primary)
    }

    fn is_atis(&self) -> bool {
        self.with(false, |c| c.atis)
    }

    fn is_receive_on(&self) -> bool {
        self.with(false, |c| c.rx)
    }

    fn is_transmit_on(&self) -> bool {
        self.with(false, |c| c.tx)
    }

    fn toggle_receive(&self) {
        self.with_mut(|c| c.rx = !c.rx);
    }

    fn toggle_transmit(&self) {
        self.with_mut(|c| c.tx = !c.tx);
    }
}

impl ChannelHost for MemoryHost {
    type Channel = MemoryChannel;

    fn channels(&self) -> Vec<MemoryChannel> {
        self.read()
            .channels
            .iter()
            .map(|c| MemoryChannel {
                host: self.clone(),
                name: c.name.clone(),
                frequency: Frequency::from_mhz(c.frequency),
                mhz: c.frequency,
            })
            .collect()
    }
}

impl TrafficHost for MemoryHost {
    fn radar_target(&self, callsign: &str) -> Option<RadarTarget> {
        self.read().targets.get(callsign).copied()
    }

    fn controller(&self, callsign: &str) -> Option<Controller> {
        self.read().controllers.get(callsign).copied()
    }
}
