/// Who is transmitting right now, and who was transmitting last.
///
/// `current` holds callsigns with an open transmission and a drawable
/// position.  `previous` is a wholesale copy of `current`, refreshed so that a
/// UI can keep showing the last known transmitters after everyone has gone
/// quiet.  Both maps sit behind one mutex so the copy is atomic with respect to
/// readers.
///
/// The two writers differ on purpose:
///
/// * begin/end events refresh `previous` only while `current` is non-empty, so
///   history survives the moment the last transmitter ends.
/// * bulk presence lists are authoritative: `previous` always follows
///   `current`, and an empty list clears `current` without touching
///   `previous`.
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::draw::{DrawPosition, DrawPositionGenerator};
use crate::host::TrafficHost;
use crate::settings::SettingsStore;

pub type TransmissionMap = BTreeMap<String, DrawPosition>;

#[derive(Default)]
struct Records {
    current: TransmissionMap,
    previous: TransmissionMap,
}

pub struct TransmissionTracker {
    records: Mutex<Records>,
    generator: DrawPositionGenerator,
    traffic: Arc<dyn TrafficHost>,
    settings: Arc<SettingsStore>,
}

impl TransmissionTracker {
    pub fn new(traffic: Arc<dyn TrafficHost>, settings: Arc<SettingsStore>, generator: DrawPositionGenerator) -> Self {
        Self {
            records: Mutex::new(Records::default()),
            generator,
            traffic,
            settings,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn position_for(&self, callsign: &str) -> DrawPosition {
        let settings = self.settings.active_settings();
        self.generator.generate(self.traffic.as_ref(), &settings, callsign)
    }

    pub fn on_begin(&self, callsign: &str) {
        self.on_begin_or_end(callsign, false);
    }

    pub fn on_end(&self, callsign: &str) {
        self.on_begin_or_end(callsign, true);
    }

    /// Event-driven update.  A duplicate begin and an end for an untracked
    /// callsign are both no-ops.
    pub fn on_begin_or_end(&self, callsign: &str, is_end: bool) {
        let mut rec = self.lock();
        if rec.current.contains_key(callsign) {
            if is_end {
                rec.current.remove(callsign);
                debug!("{} stopped transmitting", callsign);
            }
        } else if !is_end {
            let dp = self.position_for(callsign);
            if dp.is_drawable() {
                debug!("{} transmitting, radius {}", callsign, dp.radius);
                rec.current.insert(callsign.to_string(), dp);
            } else {
                trace!("{} transmitting but not drawable", callsign);
            }
        }
        if !rec.current.is_empty() {
            rec.previous = rec.current.clone();
        }
    }

    /// Replace the tracked set with a `:`-separated presence list.
    pub fn on_bulk_update(&self, raw: &str) {
        let mut rec = self.lock();
        if raw.is_empty() {
            rec.current.clear();
            return;
        }

        let mut incoming: Vec<&str> = raw.split(':').map(str::trim).filter(|s| !s.is_empty()).collect();
        rec.current.retain(|cs, _| {
            let keep = incoming.iter().any(|c| c == cs);
            incoming.retain(|c| c != cs);
            keep
        });
        for cs in incoming {
            if rec.current.contains_key(cs) {
                continue;
            }
            let dp = self.position_for(cs);
            if dp.is_drawable() {
                rec.current.insert(cs.to_string(), dp);
            }
        }
        rec.previous = rec.current.clone();
    }

    /// Drawable transmitters.  With `freeze` asserted and nobody transmitting,
    /// the last known set is returned instead.
    pub fn query(&self, freeze: bool) -> TransmissionMap {
        let rec = self.lock();
        if rec.current.is_empty() && freeze {
            rec.previous.clone()
        } else {
            rec.current.clone()
        }
    }

    /// Whether `callsign` is in the last known transmitter set.
    pub fn is_recent(&self, callsign: &str) -> bool {
        self.lock().previous.contains_key(callsign)
    }

    pub fn clear(&self) {
        let mut rec = self.lock();
        rec.current.clear();
        rec.previous.clear();
        debug!("transmission records cleared");
    }
}
