/// Capabilities the core needs from the host simulation.
///
/// The simulation owns its channels, radar targets and controllers.  The core
/// never keeps any of them beyond one call: every resolution enumerates the
/// collection again because the host may mutate it in between.
use crate::frequency::Frequency;
use crate::geo::GeoPosition;

/// A live ground-to-air channel handle.  Only valid for the duration of the
/// call that obtained it.
pub trait GroundToAirChannel {
    /// Channel callsign.  Not unique; name + frequency is.
    fn name(&self) -> String;
    /// Frequency as the host stores it (MHz).
    fn frequency_mhz(&self) -> f64;
    fn is_primary(&self) -> bool;
    fn is_atis(&self) -> bool;
    fn is_receive_on(&self) -> bool;
    fn is_transmit_on(&self) -> bool;
    fn toggle_receive(&self);
    fn toggle_transmit(&self);

    fn frequency(&self) -> Frequency {
        Frequency::from_mhz(self.frequency_mhz())
    }
}

/// Enumerable ground-to-air channel collection.
pub trait ChannelHost: Send + Sync {
    type Channel: GroundToAirChannel;

    /// Fresh snapshot of handles in the host's enumeration order.
    fn channels(&self) -> Vec<Self::Channel>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarTarget {
    pub position: GeoPosition,
    /// Pressure altitude in feet.
    pub pressure_altitude: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controller {
    pub position: GeoPosition,
}

/// Lookup of aircraft and controllers by callsign.
pub trait TrafficHost: Send + Sync {
    fn radar_target(&self, callsign: &str) -> Option<RadarTarget>;
    fn controller(&self, callsign: &str) -> Option<Controller>;
}
