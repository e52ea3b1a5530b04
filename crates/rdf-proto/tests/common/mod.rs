#![allow(dead_code)]

use rdf_proto::draw::DrawPositionGenerator;
use rdf_proto::frequency::Frequency;
use rdf_proto::host::{ChannelHost, Controller, GroundToAirChannel, RadarTarget, TrafficHost};
use rdf_proto::settings::SettingsStore;
use rdf_proto::sync::ChannelSync;
use rdf_proto::tracker::TransmissionTracker;
use rdf_proto::GeoPosition;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct Chan {
    pub name: String,
    pub mhz: f64,
    pub primary: bool,
    pub atis: bool,
    pub rx: bool,
    pub tx: bool,
    pub toggles: u32,
}

pub fn chan(name: &str, mhz: f64) -> Chan {
    Chan {
        name: name.to_string(),
        mhz,
        ..Chan::default()
    }
}

impl Chan {
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn atis(mut self) -> Self {
        self.atis = true;
        self
    }

    pub fn on(mut self) -> Self {
        self.rx = true;
        self.tx = true;
        self
    }
}

/// Channels, targets and controllers behind one shared table.
#[derive(Clone, Default)]
pub struct SimHost {
    channels: Arc<Mutex<Vec<Chan>>>,
    targets: Arc<Mutex<HashMap<String, RadarTarget>>>,
    controllers: Arc<Mutex<HashMap<String, Controller>>>,
}

impl SimHost {
    pub fn with_channels(channels: Vec<Chan>) -> Self {
        let host = Self::default();
        *host.channels.lock().unwrap() = channels;
        host
    }

    pub fn channel(&self, index: usize) -> Chan {
        self.channels.lock().unwrap()[index].clone()
    }

    pub fn toggles(&self) -> u32 {
        self.channels.lock().unwrap().iter().map(|c| c.toggles).sum()
    }

    pub fn aircraft(&self, callsign: &str, lat: f64, lon: f64, altitude: i32) {
        self.targets.lock().unwrap().insert(
            callsign.to_string(),
            RadarTarget {
                position: GeoPosition::new(lat, lon),
                pressure_altitude: altitude,
            },
        );
    }

    pub fn atc(&self, callsign: &str, lat: f64, lon: f64) {
        self.controllers.lock().unwrap().insert(
            callsign.to_string(),
            Controller {
                position: GeoPosition::new(lat, lon),
            },
        );
    }
}

pub struct SimChannel {
    table: Arc<Mutex<Vec<Chan>>>,
    pub index: usize,
}

impl SimChannel {
    fn with<R>(&self, f: impl FnOnce(&mut Chan) -> R) -> R {
        f(&mut self.table.lock().unwrap()[self.index])
    }
}

impl GroundToAirChannel for SimChannel {
    fn name(&self) -> String {
        self.with(|c| c.name.clone())
    }
    fn frequency_mhz(&self) -> f64 {
        self.with(|c| c.mhz)
    }
    fn is_primary(&self) -> bool {
        self.with(|c| c.primary)
    }
    fn is_atis(&self) -> bool {
        self.with(|c| c.atis)
    }
    fn is_receive_on(&self) -> bool {
        self.with(|c| c.rx)
    }
    fn is_transmit_on(&self) -> bool {
        self.with(|c| c.tx)
    }
    fn toggle_receive(&self) {
        self.with(|c| {
            c.rx = !c.rx;
            c.toggles += 1;
        })
    }
    fn toggle_transmit(&self) {
        self.with(|c| {
            c.tx = !c.tx;
            c.toggles += 1;
        })
    }
}

impl ChannelHost for SimHost {
    type Channel = SimChannel;

    fn channels(&self) -> Vec<SimChannel> {
        let len = self.channels.lock().unwrap().len();
        (0..len)
            .map(|index| SimChannel {
                table: Arc::clone(&self.channels),
                index,
            })
            .collect()
    }
}

impl TrafficHost for SimHost {
    fn radar_target(&self, callsign: &str) -> Option<RadarTarget> {
        self.targets.lock().unwrap().get(callsign).copied()
    }
    fn controller(&self, callsign: &str) -> Option<Controller> {
        self.controllers.lock().unwrap().get(callsign).copied()
    }
}

pub fn mhz(v: f64) -> Frequency {
    Frequency::from_mhz(v)
}

pub fn sync_for(host: &SimHost) -> ChannelSync<SimHost> {
    ChannelSync::new(Arc::new(host.clone()))
}

pub fn tracker_for(host: &SimHost, settings: Arc<SettingsStore>) -> TransmissionTracker {
    TransmissionTracker::new(Arc::new(host.clone()), settings, DrawPositionGenerator::seeded(42))
}
