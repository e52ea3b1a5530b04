mod common;

use common::{tracker_for, SimHost};
use rdf_proto::draw::{radius_and_offset, DrawPositionGenerator};
use rdf_proto::geo::add_offset;
use rdf_proto::settings::{DrawSettings, SettingsStore, GLOBAL_SURFACE};
use rdf_proto::GeoPosition;
use std::sync::Arc;

fn traffic() -> SimHost {
    let host = SimHost::default();
    host.aircraft("DLH123", 50.03, 8.57, 12_000);
    host.aircraft("BAW45", 50.10, 8.60, 35_000);
    host.aircraft("GND1", 50.04, 8.55, 300);
    host.atc("EDDF_TWR", 50.03, 8.56);
    host
}

#[test]
fn test_two_begins_leave_one_entry() {
    let host = traffic();
    let tracker = tracker_for(&host, Arc::new(SettingsStore::new()));
    tracker.on_begin("DLH123");
    tracker.on_begin("DLH123");
    assert_eq!(tracker.query(false).len(), 1);
}

#[test]
fn test_previous_keeps_last_snapshot() {
    let host = traffic();
    let tracker = tracker_for(&host, Arc::new(SettingsStore::new()));
    tracker.on_begin("DLH123");
    tracker.on_end("DLH123");
    assert!(tracker.query(false).is_empty());
    assert!(tracker.query(true).contains_key("DLH123"));
    assert!(tracker.is_recent("DLH123"));
}

#[test]
fn test_empty_bulk_clears_current() {
    let host = traffic();
    let tracker = tracker_for(&host, Arc::new(SettingsStore::new()));
    tracker.on_bulk_update("DLH123:BAW45");
    assert_eq!(tracker.query(false).len(), 2);
    tracker.on_bulk_update("");
    assert!(tracker.query(false).is_empty());
}

#[test]
fn test_bulk_tokens_trimmed_and_deduplicated() {
    let host = traffic();
    let tracker = tracker_for(&host, Arc::new(SettingsStore::new()));
    tracker.on_bulk_update("DLH123, DLH123 ,,BAW45");
    let now = tracker.query(false);
    assert_eq!(now.keys().collect::<Vec<_>>(), vec!["BAW45", "DLH123"]);
    assert!(tracker.is_recent("BAW45"));

    tracker.on_bulk_update(" BAW45 :");
    assert_eq!(tracker.query(false).keys().collect::<Vec<_>>(), vec!["BAW45"]);
}

#[test]
fn test_low_altitude_hides_target() {
    let host = traffic();
    let settings = Arc::new(SettingsStore::new());
    settings.update(GLOBAL_SURFACE, |s| s.low_altitude = 1000);
    let tracker = tracker_for(&host, settings);
    tracker.on_begin("GND1");
    tracker.on_begin("DLH123");
    let now = tracker.query(false);
    assert!(!now.contains_key("GND1"));
    assert!(now.contains_key("DLH123"));
}

#[test]
fn test_fixed_mode_ignores_altitude_bands() {
    let settings = DrawSettings {
        circle_threshold: -1,
        circle_radius: 15,
        circle_precision: 3,
        low_altitude: 0,
        high_altitude: 40_000,
        low_precision: 10,
        high_precision: 50,
        ..DrawSettings::default()
    };
    assert_eq!(radius_and_offset(&settings, 1_000), (15.0, 3.0));
    assert_eq!(radius_and_offset(&settings, 39_000), (15.0, 3.0));
}

#[test]
fn test_controller_drawn_only_when_enabled() {
    let host = traffic();
    let generator = DrawPositionGenerator::seeded(7);
    let mut settings = DrawSettings::default();
    assert!(!generator.generate(&host, &settings, "EDDF_TWR").is_drawable());

    settings.draw_controller = true;
    let dp = generator.generate(&host, &settings, "EDDF_TWR");
    assert_eq!(dp.radius, settings.circle_radius as f64);
    assert_eq!(dp.position, GeoPosition::new(50.03, 8.56));
}

#[test]
fn test_add_offset_below_threshold_is_exact() {
    let p = GeoPosition::new(50.033_333, 8.570_556);
    let moved = add_offset(p, 123.0, 1e-7);
    assert_eq!(moved.lat.to_bits(), p.lat.to_bits());
    assert_eq!(moved.lon.to_bits(), p.lon.to_bits());
}

#[test]
fn test_active_surface_drives_generation() {
    let host = traffic();
    let settings = Arc::new(SettingsStore::new());
    settings.update(2, |s| s.low_altitude = 20_000);
    let tracker = tracker_for(&host, Arc::clone(&settings));

    tracker.on_begin("DLH123");
    assert!(tracker.query(false).contains_key("DLH123"));

    tracker.clear();
    settings.set_active(2);
    tracker.on_begin("DLH123");
    tracker.on_begin("BAW45");
    let now = tracker.query(false);
    assert!(!now.contains_key("DLH123"));
    assert!(now.contains_key("BAW45"));
}
