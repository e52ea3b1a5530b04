/// `.RDF` text commands.
///
/// ```text
/// .RDF RELOAD | REFRESH | ON | OFF
/// .RDF STYLE <name>
/// .RDF RGB <r:g:b> | CTRGB <r:g:b>
/// .RDF RADIUS <n> | THRESHOLD <n> | CONTROLLER <n>
/// .RDF ALTITUDE L<n> | ALTITUDE H<n>
/// .RDF PRECISION L<n> | PRECISION H<n> | PRECISION <n>
/// ```
///
/// Matching is case-insensitive.  RELOAD and REFRESH touch the connection and
/// are carried out by the runtime; every other command edits one surface's draw
/// settings and persists the new value through that surface's settings source.
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, trace, warn};

use crate::settings::{
    Rgb, SettingsSource, SettingsStore, SETTING_CIRCLE_RADIUS, SETTING_CONCURRENT_RGB, SETTING_DRAW_CONTROLLERS,
    SETTING_HIGH_ALTITUDE, SETTING_HIGH_PRECISION, SETTING_LOW_ALTITUDE, SETTING_LOW_PRECISION, SETTING_PRECISION,
    SETTING_RGB, SETTING_STYLE, SETTING_THRESHOLD,
};
use crate::style::StyleManager;
use crate::NOTICE_TARGET;

/// Low altitude written by `.RDF OFF`; nothing flies that high.
pub const OFF_ALTITUDE: i32 = 999_999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reload,
    Refresh,
    Style(String),
    On,
    Off,
    Rgb(String),
    ConcurrentRgb(String),
    Radius(i32),
    Threshold(i32),
    LowAltitude(i32),
    HighAltitude(i32),
    LowPrecision(i32),
    HighPrecision(i32),
    Precision(i32),
    Controller(i32),
}

fn command_regex() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"(?i)^\.RDF\s+([A-Z]+)(?:\s+(\S+))?$").expect("valid command regex"))
}

/// `L<n>` / `H<n>` / `<n>` qualifier on ALTITUDE and PRECISION.
fn split_band(arg: &str) -> (Option<char>, &str) {
    match arg.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some(band @ ('L' | 'H')) => (Some(band), &arg[1..]),
        _ => (None, arg),
    }
}

impl Command {
    /// `None` for anything that is not a well-formed `.RDF` command.
    pub fn parse(line: &str) -> Option<Command> {
        let caps = command_regex().captures(line.trim())?;
        let verb = caps[1].to_ascii_uppercase();
        let arg = caps.get(2).map(|m| m.as_str());
        let int = |s: &str| s.parse::<i32>().ok();

        let cmd = match (verb.as_str(), arg) {
            ("RELOAD", None) => Command::Reload,
            ("REFRESH", None) => Command::Refresh,
            ("ON", None) => Command::On,
            ("OFF", None) => Command::Off,
            ("STYLE", Some(name)) => Command::Style(name.to_ascii_uppercase()),
            ("RGB", Some(rgb)) => Command::Rgb(rgb.to_string()),
            ("CTRGB", Some(rgb)) => Command::ConcurrentRgb(rgb.to_string()),
            ("RADIUS", Some(n)) => Command::Radius(int(n)?),
            ("THRESHOLD", Some(n)) => Command::Threshold(int(n)?),
            ("CONTROLLER", Some(n)) => Command::Controller(int(n)?),
            ("ALTITUDE", Some(a)) => match split_band(a) {
                (Some('L'), n) => Command::LowAltitude(int(n)?),
                (Some('H'), n) => Command::HighAltitude(int(n)?),
                _ => return None,
            },
            ("PRECISION", Some(a)) => match split_band(a) {
                (Some('L'), n) => Command::LowPrecision(int(n)?),
                (Some('H'), n) => Command::HighPrecision(int(n)?),
                (_, n) => Command::Precision(int(n)?),
            },
            _ => return None,
        };
        Some(cmd)
    }

    /// RELOAD and REFRESH need the runtime; everything else is a settings edit.
    pub fn is_settings(&self) -> bool {
        !matches!(self, Command::Reload | Command::Refresh)
    }
}

/// What a settings command writes into the store and its source.
pub struct CommandTarget<'a> {
    pub store: &'a SettingsStore,
    pub surface: i32,
    pub source: &'a dyn SettingsSource,
    pub styles: &'a StyleManager,
}

impl CommandTarget<'_> {
    fn save(&self, key: &str, description: &str, value: impl ToString) {
        let value = value.to_string();
        self.source.set(key, description, &value);
        info!(target: NOTICE_TARGET, "{}: {}", description, value);
    }

    /// Apply a settings command.  Returns whether it was handled; RELOAD and
    /// REFRESH, out-of-range values and colours that change nothing are not.
    pub fn apply(&self, cmd: &Command) -> bool {
        trace!("surface {} command {:?}", self.surface, cmd);
        match cmd {
            Command::Reload | Command::Refresh => false,
            Command::Style(name) => {
                let Some(style) = self.styles.get(name) else {
                    warn!("Invalid style name");
                    return true;
                };
                let faults = self.store.update(self.surface, |ds| style.apply_to(ds));
                for fault in faults {
                    warn!("{}", fault);
                }
                self.save(SETTING_STYLE, "Style", &style.name);
                info!(target: NOTICE_TARGET, "RDF Style changed to {}", style.name);
                true
            }
            Command::On | Command::Off => {
                let altitude = if *cmd == Command::On { 0 } else { OFF_ALTITUDE };
                self.store.update(self.surface, |ds| ds.low_altitude = altitude);
                self.save(SETTING_LOW_ALTITUDE, "Altitude (low)", altitude);
                true
            }
            Command::Rgb(raw) | Command::ConcurrentRgb(raw) => {
                let concurrent = matches!(cmd, Command::ConcurrentRgb(_));
                let Ok(color) = raw.parse::<Rgb>() else {
                    warn!("invalid colour {:?}", raw);
                    return false;
                };
                let changed = self.store.update(self.surface, |ds| {
                    let slot = if concurrent {
                        &mut ds.rdf_concurrent_color
                    } else {
                        &mut ds.rdf_color
                    };
                    std::mem::replace(slot, color) != color
                });
                if !changed {
                    return false;
                }
                if concurrent {
                    self.save(SETTING_CONCURRENT_RGB, "Concurrent RGB", raw);
                } else {
                    self.save(SETTING_RGB, "RGB", raw);
                }
                true
            }
            Command::Radius(n) => self.set_int(*n, *n > 0, SETTING_CIRCLE_RADIUS, "Radius", |ds, v| ds.circle_radius = v),
            Command::Threshold(n) => self.set_int(*n, true, SETTING_THRESHOLD, "Threshold", |ds, v| ds.circle_threshold = v),
            Command::LowAltitude(n) => {
                self.set_int(*n, true, SETTING_LOW_ALTITUDE, "Altitude (low)", |ds, v| ds.low_altitude = v)
            }
            Command::HighAltitude(n) => {
                self.set_int(*n, true, SETTING_HIGH_ALTITUDE, "Altitude (high)", |ds, v| ds.high_altitude = v)
            }
            Command::LowPrecision(n) => {
                self.set_int(*n, *n >= 0, SETTING_LOW_PRECISION, "Precision (low)", |ds, v| ds.low_precision = v)
            }
            Command::HighPrecision(n) => {
                self.set_int(*n, *n >= 0, SETTING_HIGH_PRECISION, "Precision (high)", |ds, v| ds.high_precision = v)
            }
            Command::Precision(n) => {
                self.set_int(*n, *n >= 0, SETTING_PRECISION, "Precision", |ds, v| ds.circle_precision = v)
            }
            Command::Controller(n) => {
                self.set_int(*n, true, SETTING_DRAW_CONTROLLERS, "Draw controllers", |ds, v| ds.draw_controller = v != 0)
            }
        }
    }

    fn set_int(
        &self,
        value: i32,
        accepted: bool,
        key: &str,
        description: &str,
        write: impl FnOnce(&mut crate::settings::DrawSettings, i32),
    ) -> bool {
        if !accepted {
            return false;
        }
        self.store.update(self.surface, |ds| write(ds, value));
        self.save(key, description, value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DrawSettings, GLOBAL_SURFACE};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<HashMap<String, String>>);

    impl SettingsSource for Recorder {
        fn get(&self, key: &str) -> Option<String> {
            self.0.lock().unwrap().get(key).cloned()
        }
        fn set(&self, key: &str, _description: &str, value: &str) {
            self.0.lock().unwrap().insert(key.to_string(), value.to_string());
        }
    }

    fn styles() -> (tempfile::TempDir, StyleManager) {
        let dir = tempfile::tempdir().unwrap();
        let mgr = StyleManager::new(dir.path().join("RDFStyles.json"));
        (dir, mgr)
    }

    #[test]
    fn test_parse_grammar() {
        assert_eq!(Command::parse(".RDF RELOAD"), Some(Command::Reload));
        assert_eq!(Command::parse(".rdf refresh"), Some(Command::Refresh));
        assert_eq!(Command::parse(".Rdf style ring"), Some(Command::Style("RING".into())));
        assert_eq!(Command::parse(".RDF RGB 1:2:3"), Some(Command::Rgb("1:2:3".into())));
        assert_eq!(Command::parse(".RDF ctrgb 1:2:3"), Some(Command::ConcurrentRgb("1:2:3".into())));
        assert_eq!(Command::parse(".RDF RADIUS 25"), Some(Command::Radius(25)));
        assert_eq!(Command::parse(".RDF THRESHOLD -1"), Some(Command::Threshold(-1)));
        assert_eq!(Command::parse(".RDF ALTITUDE L1000"), Some(Command::LowAltitude(1000)));
        assert_eq!(Command::parse(".RDF altitude h20000"), Some(Command::HighAltitude(20000)));
        assert_eq!(Command::parse(".RDF PRECISION L5"), Some(Command::LowPrecision(5)));
        assert_eq!(Command::parse(".RDF PRECISION H50"), Some(Command::HighPrecision(50)));
        assert_eq!(Command::parse(".RDF PRECISION 8"), Some(Command::Precision(8)));
        assert_eq!(Command::parse(".RDF CONTROLLER 1"), Some(Command::Controller(1)));
        assert_eq!(Command::parse(".RDF OFF"), Some(Command::Off));
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(Command::parse(".RDF"), None);
        assert_eq!(Command::parse(".RDF FOO"), None);
        assert_eq!(Command::parse(".RDF RADIUS"), None);
        assert_eq!(Command::parse(".RDF RADIUS abc"), None);
        assert_eq!(Command::parse(".RDF ALTITUDE 100"), None);
        assert_eq!(Command::parse(".RDF RELOAD now"), None);
        assert_eq!(Command::parse(".XYZ RELOAD"), None);
    }

    #[test]
    fn test_settings_command_updates_and_persists() {
        let (_dir, styles) = styles();
        let store = SettingsStore::new();
        let source = Recorder::default();
        let target = CommandTarget {
            store: &store,
            surface: 2,
            source: &source,
            styles: &styles,
        };

        assert!(target.apply(&Command::Radius(30)));
        assert_eq!(store.get(2).circle_radius, 30);
        assert_eq!(store.get(GLOBAL_SURFACE).circle_radius, DrawSettings::default().circle_radius);
        assert_eq!(source.get(SETTING_CIRCLE_RADIUS).as_deref(), Some("30"));

        assert!(!target.apply(&Command::Radius(0)));
        assert_eq!(store.get(2).circle_radius, 30);
        assert!(!target.apply(&Command::Precision(-1)));

        assert!(target.apply(&Command::Controller(2)));
        assert!(store.get(2).draw_controller);
    }

    #[test]
    fn test_on_off() {
        let (_dir, styles) = styles();
        let store = SettingsStore::new();
        let source = Recorder::default();
        let target = CommandTarget {
            store: &store,
            surface: GLOBAL_SURFACE,
            source: &source,
            styles: &styles,
        };
        assert!(target.apply(&Command::Off));
        assert_eq!(store.get(GLOBAL_SURFACE).low_altitude, OFF_ALTITUDE);
        assert!(target.apply(&Command::On));
        assert_eq!(store.get(GLOBAL_SURFACE).low_altitude, 0);
        assert_eq!(source.get(SETTING_LOW_ALTITUDE).as_deref(), Some("0"));
    }

    #[test]
    fn test_unchanged_colour_not_handled() {
        let (_dir, styles) = styles();
        let store = SettingsStore::new();
        let source = Recorder::default();
        let target = CommandTarget {
            store: &store,
            surface: GLOBAL_SURFACE,
            source: &source,
            styles: &styles,
        };
        assert!(target.apply(&Command::Rgb("10:20:30".into())));
        assert!(!target.apply(&Command::Rgb("10:20:30".into())));
        assert!(!target.apply(&Command::ConcurrentRgb("300:0:0".into())));
        assert_eq!(store.get(GLOBAL_SURFACE).rdf_color, Rgb::new(10, 20, 30));
        assert_eq!(store.get(GLOBAL_SURFACE).rdf_concurrent_color, DrawSettings::default().rdf_concurrent_color);
    }

    #[test]
    fn test_style_command() {
        let (_dir, styles) = styles();
        let store = SettingsStore::new();
        let source = Recorder::default();
        let target = CommandTarget {
            store: &store,
            surface: 0,
            source: &source,
            styles: &styles,
        };
        let langen = styles.get("LANGEN").unwrap().clone();
        assert!(target.apply(&Command::Style("LANGEN".into())));
        assert_eq!(store.get(0).circle_threshold, langen.circle_threshold);
        assert_eq!(source.get(SETTING_STYLE), Some(langen.name));

        // unknown style is still consumed
        assert!(target.apply(&Command::Style("NOPE".into())));
        assert!(!target.apply(&Command::Reload));
    }
}
