/// Where (and whether) to draw a transmission indicator for a callsign.
///
/// Radar targets are drawn at a randomly displaced position so the indicator
/// approximates a direction finder instead of pinpointing the aircraft.  The
/// displacement grows with the precision that applies at the target's
/// altitude.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::trace;

use crate::geo::{add_offset, GeoPosition};
use crate::host::TrafficHost;
use crate::settings::DrawSettings;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawPosition {
    pub position: GeoPosition,
    /// 0 means "do not draw".
    pub radius: f64,
}

impl DrawPosition {
    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn is_drawable(&self) -> bool {
        self.radius > 0.0
    }
}

/// Radius and jitter offset for a target at `altitude` (already past the
/// low-altitude gate).
pub fn radius_and_offset(settings: &DrawSettings, altitude: i32) -> (f64, f64) {
    let mut radius = settings.circle_radius as f64;
    let mut offset = settings.circle_precision as f64;

    if settings.circle_threshold >= 0 && (settings.low_precision > 0 || settings.circle_precision > 0) {
        offset = if settings.high_precision > 0 && settings.high_altitude > settings.low_altitude {
            let low = settings.low_altitude as f64;
            let span = settings.high_altitude as f64 - low;
            let delta = settings.high_precision as f64 - settings.low_precision as f64;
            settings.low_precision as f64 + (altitude as f64 - low) * delta / span
        } else if settings.low_precision > 0 {
            settings.low_precision as f64
        } else {
            settings.circle_precision as f64
        };
        radius = offset;
    }
    (radius, offset)
}

/// Random displacement for `offset`: `(bearing_deg, distance)`.  Distance is
/// half-normal scaled so that ~99.7% of draws fall within `offset`.
pub fn jitter<R: Rng>(rng: &mut R, offset: f64) -> (f64, f64) {
    let n: f64 = rng.sample(StandardNormal);
    let distance = n.abs() / 3.0 * offset;
    let bearing = rng.gen_range(0.0..360.0);
    (bearing, distance)
}

pub struct DrawPositionGenerator {
    rng: Mutex<StdRng>,
}

impl Default for DrawPositionGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl DrawPositionGenerator {
    pub fn new(rng: StdRng) -> Self {
        Self { rng: Mutex::new(rng) }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn generate(&self, traffic: &dyn TrafficHost, settings: &DrawSettings, callsign: &str) -> DrawPosition {
        let mut target = traffic.radar_target(callsign);
        let controller = traffic.controller(callsign);

        // suffix-qualified controller callsign aliasing an aircraft
        if target.is_none() && controller.is_some() {
            if let Some(stripped) = strip_suffix_letter(callsign) {
                target = traffic.radar_target(stripped);
            }
        }

        if let Some(target) = target {
            if target.pressure_altitude < settings.low_altitude {
                trace!("{} below low altitude ({} < {})", callsign, target.pressure_altitude, settings.low_altitude);
                return DrawPosition::hidden();
            }
            let (radius, offset) = radius_and_offset(settings, target.pressure_altitude);
            let mut position = target.position;
            if offset > 0.0 {
                let (bearing, distance) = {
                    let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                    jitter(&mut *rng, offset)
                };
                position = add_offset(position, bearing, distance);
            }
            return DrawPosition { position, radius };
        }

        match controller {
            Some(ctrl) if settings.draw_controller => DrawPosition {
                position: ctrl.position,
                radius: settings.circle_radius as f64,
            },
            _ => DrawPosition::hidden(),
        }
    }
}

fn strip_suffix_letter(callsign: &str) -> Option<&str> {
    let last = callsign.chars().last()?;
    if last.is_ascii_uppercase() {
        Some(&callsign[..callsign.len() - last.len_utf8()])
    } else {
        None
    }
}
